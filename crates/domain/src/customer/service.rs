//! Customer service providing the use cases of the customer domain.

use std::time::Instant;

use common::FitterId;
use serde::Serialize;

use crate::error::DomainError;
use crate::event::DomainEvent;

use super::{
    ContactInfoUpdate, Customer, CustomerDetails, CustomerEvent, CustomerFilters, CustomerId,
    CustomerPageView, CustomerRepository, CustomerSearch, CustomerStatus, CustomerView, Email,
};

/// Result of a mutating use case.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The customer after the change.
    pub customer: CustomerView,

    /// Events produced by the change; empty when nothing happened.
    pub events: Vec<CustomerEvent>,
}

/// Outcome of [`CustomerService::validate_data_integrity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub customer_id: String,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Service orchestrating customer use cases over a [`CustomerRepository`].
///
/// Holds no query logic of its own: filtering lives in the repository.
pub struct CustomerService<R: CustomerRepository> {
    repository: R,
}

impl<R: CustomerRepository> CustomerService<R> {
    /// Creates a new customer service over the given repository.
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Registers a new customer.
    ///
    /// Rejects an email already used within the fitter's scope. Customers
    /// without a fitter share one scope of their own.
    #[tracing::instrument(skip(self, details), fields(name = %details.name))]
    pub async fn create_customer(
        &self,
        details: CustomerDetails,
    ) -> Result<CommandResult, DomainError> {
        let customer = Customer::create(CustomerId::generate(), details)?;

        if let Some(email) = customer.email() {
            self.ensure_email_available(email, customer.fitter_id(), customer.id()).await?;
        }

        let saved = self.repository.save(customer).await?;
        metrics::counter!("customers_created_total").increment(1);
        tracing::info!(customer_id = %saved.id(), "customer registered");

        let event = CustomerEvent::customer_registered(
            saved.id(),
            saved.name(),
            saved.fitter_id(),
            saved.created_at(),
        );
        Ok(CommandResult {
            customer: CustomerView::from(&saved),
            events: vec![event],
        })
    }

    /// Loads a live customer by its transport id.
    #[tracing::instrument(skip(self))]
    pub async fn get_customer(&self, id: &str) -> Result<CustomerView, DomainError> {
        let customer = self.load(id).await?;
        Ok(CustomerView::from(&customer))
    }

    /// Loads a customer by id even if it has been soft-deleted.
    #[tracing::instrument(skip(self))]
    pub async fn get_customer_including_deleted(
        &self,
        id: &str,
    ) -> Result<CustomerView, DomainError> {
        let customer = self.load_including_deleted(id).await?;
        Ok(CustomerView::from(&customer))
    }

    /// Applies a partial update of contact and descriptive fields.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_customer(
        &self,
        id: &str,
        update: ContactInfoUpdate,
    ) -> Result<CommandResult, DomainError> {
        let mut customer = self.load(id).await?;

        if let Some(new_email) = update.new_email() {
            let email = Email::parse(new_email)?;
            if customer.email() != Some(&email) {
                self.ensure_email_available(&email, customer.fitter_id(), customer.id()).await?;
            }
        }

        let events = customer.update_contact_info(update)?;
        self.persist(customer, events).await
    }

    /// Assigns a fitter to a customer.
    #[tracing::instrument(skip(self))]
    pub async fn assign_fitter(
        &self,
        id: &str,
        fitter_id: FitterId,
    ) -> Result<CommandResult, DomainError> {
        let mut customer = self.load(id).await?;

        if customer.fitter_id() != Some(fitter_id)
            && let Some(email) = customer.email()
        {
            self.ensure_email_available(email, Some(fitter_id), customer.id()).await?;
        }

        let events = customer.assign_fitter(fitter_id)?;
        self.persist(customer, events).await
    }

    /// Removes the fitter assignment from a customer.
    #[tracing::instrument(skip(self))]
    pub async fn remove_fitter(&self, id: &str) -> Result<CommandResult, DomainError> {
        let mut customer = self.load(id).await?;

        if customer.has_fitter()
            && let Some(email) = customer.email()
        {
            self.ensure_email_available(email, None, customer.id()).await?;
        }

        let events = customer.remove_fitter()?;
        self.persist(customer, events).await
    }

    /// Moves a customer to another lifecycle state.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: &str,
        status: CustomerStatus,
    ) -> Result<CommandResult, DomainError> {
        let mut customer = self.load(id).await?;
        let events = customer.change_status(status)?;
        self.persist(customer, events).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<CommandResult, DomainError> {
        self.change_status(id, CustomerStatus::Inactive).await
    }

    pub async fn reactivate(&self, id: &str) -> Result<CommandResult, DomainError> {
        self.change_status(id, CustomerStatus::Active).await
    }

    /// Soft-deletes a customer.
    #[tracing::instrument(skip(self))]
    pub async fn delete_customer(&self, id: &str) -> Result<CommandResult, DomainError> {
        let mut customer = self.load(id).await?;
        let events = customer.soft_delete();

        self.repository.delete(&customer.id()).await?;
        metrics::counter!("customers_deleted_total").increment(1);
        tracing::info!(customer_id = %customer.id(), "customer soft-deleted");

        Ok(CommandResult {
            customer: CustomerView::from(&customer),
            events,
        })
    }

    /// Lists customers matching a fixed set of filters.
    #[tracing::instrument(skip(self))]
    pub async fn list_customers(
        &self,
        filters: CustomerFilters,
    ) -> Result<Vec<CustomerView>, DomainError> {
        let customers = self.repository.find_all(&filters).await?;
        Ok(views(&customers))
    }

    /// Runs the universal search and returns one page with its total.
    #[tracing::instrument(skip(self))]
    pub async fn search_customers(
        &self,
        search: CustomerSearch,
    ) -> Result<CustomerPageView, DomainError> {
        let started = Instant::now();
        let window = search.page.normalized();
        let page = self.repository.find_all_paginated(&search).await?;
        metrics::histogram!("customer_search_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(CustomerPageView {
            customers: views(&page.customers),
            total: page.total,
            page: window.page,
            limit: window.limit,
        })
    }

    pub async fn active_customers(&self) -> Result<Vec<CustomerView>, DomainError> {
        Ok(views(&self.repository.find_active().await?))
    }

    pub async fn customers_for_fitter(
        &self,
        fitter_id: FitterId,
    ) -> Result<Vec<CustomerView>, DomainError> {
        Ok(views(&self.repository.find_by_fitter_id(fitter_id).await?))
    }

    pub async fn customers_without_fitter(&self) -> Result<Vec<CustomerView>, DomainError> {
        Ok(views(
            &self
                .repository
                .find_active_customers_without_fitter()
                .await?,
        ))
    }

    pub async fn customers_in_country(
        &self,
        country: &str,
    ) -> Result<Vec<CustomerView>, DomainError> {
        Ok(views(&self.repository.find_by_country(country).await?))
    }

    pub async fn customers_in_city(&self, city: &str) -> Result<Vec<CustomerView>, DomainError> {
        Ok(views(&self.repository.find_by_city(city).await?))
    }

    pub async fn count_by_fitter(&self, fitter_id: FitterId) -> Result<u64, DomainError> {
        Ok(self.repository.count_by_fitter_id(fitter_id).await?)
    }

    pub async fn count_active(&self) -> Result<u64, DomainError> {
        Ok(self.repository.count_active().await?)
    }

    /// Checks that a customer may be used for a new order.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_order_eligible(&self, id: &str) -> Result<CustomerView, DomainError> {
        let customer = self.load_including_deleted(id).await?;
        customer.validate_for_order()?;
        Ok(CustomerView::from(&customer))
    }

    /// Lightweight consistency check of a stored customer.
    #[tracing::instrument(skip(self))]
    pub async fn validate_data_integrity(&self, id: &str) -> Result<IntegrityReport, DomainError> {
        let customer = self.load_including_deleted(id).await?;

        let mut issues = Vec::new();
        if customer.name().trim().is_empty() {
            issues.push("name is empty".to_string());
        }

        if !issues.is_empty() {
            tracing::warn!(customer_id = %customer.id(), ?issues, "integrity check failed");
        }
        Ok(IntegrityReport {
            customer_id: customer.id().to_string(),
            issues,
        })
    }

    /// Imports a batch of customers in one call.
    ///
    /// Every entry is validated before anything is written.
    #[tracing::instrument(skip(self, batch), fields(count = batch.len()))]
    pub async fn import_customers(
        &self,
        batch: Vec<CustomerDetails>,
    ) -> Result<Vec<CustomerView>, DomainError> {
        let customers = batch
            .into_iter()
            .map(|details| Customer::create(CustomerId::generate(), details))
            .collect::<Result<Vec<_>, _>>()?;

        let created = self.repository.bulk_create(customers).await?;
        metrics::counter!("customers_created_total").increment(created.len() as u64);
        Ok(views(&created))
    }

    async fn load(&self, id: &str) -> Result<Customer, DomainError> {
        let customer_id = CustomerId::from_string(id)?;
        self.repository
            .find_by_id(&customer_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                id: customer_id.to_string(),
            })
    }

    async fn load_including_deleted(&self, id: &str) -> Result<Customer, DomainError> {
        let customer_id = CustomerId::from_string(id)?;
        self.repository
            .find_by_id_including_deleted(&customer_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                id: customer_id.to_string(),
            })
    }

    async fn ensure_email_available(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
        owner: CustomerId,
    ) -> Result<(), DomainError> {
        let existing = self
            .repository
            .find_by_email_in_fitter_scope(email, fitter_id)
            .await?;
        match existing {
            Some(other) if other.id() != owner => Err(email_conflict(email, fitter_id)),
            _ => Ok(()),
        }
    }

    /// Saves the customer unless the mutation was a no-op.
    async fn persist(
        &self,
        customer: Customer,
        events: Vec<CustomerEvent>,
    ) -> Result<CommandResult, DomainError> {
        if events.is_empty() {
            return Ok(CommandResult {
                customer: CustomerView::from(&customer),
                events,
            });
        }

        let saved = self.repository.save(customer).await?;
        for event in &events {
            tracing::debug!(
                customer_id = %saved.id(),
                event_type = event.event_type(),
                "customer changed"
            );
        }
        Ok(CommandResult {
            customer: CustomerView::from(&saved),
            events,
        })
    }
}

fn email_conflict(email: &Email, fitter_id: Option<FitterId>) -> DomainError {
    metrics::counter!("customer_email_conflicts_total").increment(1);
    tracing::warn!(%email, ?fitter_id, "email already in use");
    DomainError::EmailConflict {
        email: email.to_string(),
        fitter_id,
    }
}

fn views(customers: &[Customer]) -> Vec<CustomerView> {
    customers.iter().map(CustomerView::from).collect()
}
