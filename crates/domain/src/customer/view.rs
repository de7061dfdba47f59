//! Transport shapes returned by the customer service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Customer, CustomerStatus};

/// Flat, serializable view of a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: Option<i64>,
    pub name: String,
    pub display_name: String,
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
    pub status: CustomerStatus,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id().value(),
            name: customer.name().to_string(),
            display_name: customer.display_name(),
            email: customer.email().map(|e| e.to_string()),
            horse_name: customer.horse_name().map(String::from),
            company: customer.company().map(String::from),
            address: customer.address().map(String::from),
            city: customer.city().map(String::from),
            state: customer.state().map(String::from),
            zipcode: customer.zipcode().map(String::from),
            country: customer.country().map(String::from),
            phone_no: customer.phone_no().map(String::from),
            cell_no: customer.cell_no().map(String::from),
            bank_account_number: customer.bank_account_number().map(String::from),
            fitter_id: customer.fitter_id().map(|id| id.as_i64()),
            status: customer.status(),
            deleted: customer.is_deleted(),
            created_at: customer.created_at(),
            updated_at: customer.updated_at(),
        }
    }
}

/// A page of customer views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPageView {
    pub customers: Vec<CustomerView>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}
