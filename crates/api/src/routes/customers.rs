//! Customer CRUD, search and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{FitterId, PageRequest};
use domain::{
    CommandResult, ContactInfoUpdate, CustomerDetails, CustomerError, CustomerEvent,
    CustomerPageView, CustomerRepository, CustomerSearch, CustomerService, CustomerStatus,
    CustomerView, DomainError, FieldUpdate, IntegrityReport,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<R: CustomerRepository> {
    pub customer_service: CustomerService<R>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    pub name: String,
    pub email: Option<String>,
    pub horse_name: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
    pub phone_no: Option<String>,
    pub cell_no: Option<String>,
    pub bank_account_number: Option<String>,
    pub fitter_id: Option<i64>,
}

impl From<CreateCustomerRequest> for CustomerDetails {
    fn from(req: CreateCustomerRequest) -> Self {
        CustomerDetails {
            name: req.name,
            email: req.email,
            horse_name: req.horse_name,
            company: req.company,
            address: req.address,
            city: req.city,
            state: req.state,
            zipcode: req.zipcode,
            country: req.country,
            phone_no: req.phone_no,
            cell_no: req.cell_no,
            bank_account_number: req.bank_account_number,
            fitter_id: req.fitter_id.and_then(FitterId::from_raw),
        }
    }
}

/// Partial update body. A missing key keeps the field, `null` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub horse_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub zipcode: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub cell_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub bank_account_number: Option<Option<String>>,
}

/// Marks a key that was present in the body, whether `null` or a value.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateCustomerRequest> for ContactInfoUpdate {
    fn from(req: UpdateCustomerRequest) -> Self {
        ContactInfoUpdate {
            name: FieldUpdate::from(req.name),
            email: FieldUpdate::from(req.email),
            horse_name: FieldUpdate::from(req.horse_name),
            company: FieldUpdate::from(req.company),
            address: FieldUpdate::from(req.address),
            city: FieldUpdate::from(req.city),
            state: FieldUpdate::from(req.state),
            zipcode: FieldUpdate::from(req.zipcode),
            country: FieldUpdate::from(req.country),
            phone_no: FieldUpdate::from(req.phone_no),
            cell_no: FieldUpdate::from(req.cell_no),
            bank_account_number: FieldUpdate::from(req.bank_account_number),
        }
    }
}

/// Query string of `GET /customers`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCustomersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub id: Option<i64>,
    pub fitter_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
}

impl ListCustomersQuery {
    fn into_search(self) -> Result<CustomerSearch, ApiError> {
        let window = PageRequest::default();
        let mut search = CustomerSearch::new().page(
            self.page.unwrap_or(window.page),
            self.limit.unwrap_or(window.limit),
        );
        if let Some(fitter_id) = self.fitter_id {
            search.fitter_id = Some(parse_fitter(fitter_id)?);
        }
        search.id = self.id;
        search.name = self.name;
        search.email = self.email;
        search.country = self.country;
        search.city = self.city;
        search.search = self.search;
        Ok(search)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignFitterRequest {
    pub fitter_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CommandResponse {
    pub customer: CustomerView,
    pub events: Vec<CustomerEvent>,
}

impl From<CommandResult> for CommandResponse {
    fn from(result: CommandResult) -> Self {
        Self {
            customer: result.customer,
            events: result.events,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityResponse {
    pub customer_id: String,
    pub valid: bool,
    pub issues: Vec<String>,
}

impl From<IntegrityReport> for IntegrityResponse {
    fn from(report: IntegrityReport) -> Self {
        Self {
            valid: report.is_valid(),
            customer_id: report.customer_id,
            issues: report.issues,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEligibilityResponse {
    pub customer_id: String,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// -- Handlers --

/// POST /customers — register a new customer.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let result = state.customer_service.create_customer(req.into()).await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /customers — paginated universal search.
#[tracing::instrument(skip(state))]
pub async fn list<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<Json<CustomerPageView>, ApiError> {
    let search = query.into_search()?;
    let page = state.customer_service.search_customers(search).await?;
    Ok(Json(page))
}

/// GET /customers/{id} — load a live customer.
#[tracing::instrument(skip(state))]
pub async fn get<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerView>, ApiError> {
    let customer = state.customer_service.get_customer(&id).await?;
    Ok(Json(customer))
}

/// PATCH /customers/{id} — partial update of contact information.
#[tracing::instrument(skip(state, req))]
pub async fn update<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let result = state
        .customer_service
        .update_customer(&id, req.into())
        .await?;
    Ok(Json(result.into()))
}

/// DELETE /customers/{id} — soft-delete a customer.
#[tracing::instrument(skip(state))]
pub async fn delete<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, ApiError> {
    let result = state.customer_service.delete_customer(&id).await?;
    Ok(Json(result.into()))
}

/// PUT /customers/{id}/fitter — assign or reassign the fitter.
#[tracing::instrument(skip(state))]
pub async fn assign_fitter<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<AssignFitterRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let fitter_id = parse_fitter(req.fitter_id)?;
    let result = state.customer_service.assign_fitter(&id, fitter_id).await?;
    Ok(Json(result.into()))
}

/// DELETE /customers/{id}/fitter — remove the fitter assignment.
#[tracing::instrument(skip(state))]
pub async fn remove_fitter<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, ApiError> {
    let result = state.customer_service.remove_fitter(&id).await?;
    Ok(Json(result.into()))
}

/// PUT /customers/{id}/status — move the customer to another lifecycle state.
#[tracing::instrument(skip(state))]
pub async fn change_status<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let status: CustomerStatus = req.status.parse().map_err(DomainError::from)?;
    let result = state.customer_service.change_status(&id, status).await?;
    Ok(Json(result.into()))
}

/// GET /customers/{id}/integrity — data integrity report.
#[tracing::instrument(skip(state))]
pub async fn integrity<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<IntegrityResponse>, ApiError> {
    let report = state.customer_service.validate_data_integrity(&id).await?;
    Ok(Json(report.into()))
}

/// GET /customers/{id}/order-eligibility — whether orders may reference the customer.
#[tracing::instrument(skip(state))]
pub async fn order_eligibility<R: CustomerRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderEligibilityResponse>, ApiError> {
    let outcome = state.customer_service.ensure_order_eligible(&id).await;
    let response = match outcome {
        Ok(customer) => OrderEligibilityResponse {
            customer_id: customer.id.map(|id| id.to_string()).unwrap_or(id),
            eligible: true,
            reason: None,
        },
        Err(DomainError::Validation(
            err @ (CustomerError::Deleted { .. } | CustomerError::NotOrderEligible { .. }),
        )) => OrderEligibilityResponse {
            customer_id: id,
            eligible: false,
            reason: Some(err.to_string()),
        },
        Err(err) => return Err(err.into()),
    };
    Ok(Json(response))
}

fn parse_fitter(raw: i64) -> Result<FitterId, ApiError> {
    FitterId::from_raw(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid fitter id: {raw}")))
}
