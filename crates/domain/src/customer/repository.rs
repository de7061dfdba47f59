//! Storage-agnostic persistence contract for customers.

use async_trait::async_trait;
use common::{FitterId, PageRequest};
use thiserror::Error;

use super::{Customer, CustomerId, Email};

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The per-fitter email uniqueness constraint was violated.
    #[error("Email {email} is already used by another customer of fitter {}", fitter_label(.fitter_id))]
    EmailConflict {
        email: String,
        fitter_id: Option<FitterId>,
    },

    /// The row is soft-deleted and the write would resurrect it.
    #[error("Customer {0} is deleted and cannot be written")]
    Deleted(i64),

    /// No row exists for the given id.
    #[error("Customer {0} not found in store")]
    NotFound(i64),

    /// A stored row could not be turned back into a customer.
    #[error("Corrupt customer record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    /// Any other storage failure, passed through unchanged.
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

fn fitter_label(fitter_id: &Option<FitterId>) -> String {
    fitter_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

/// Filters for [`CustomerRepository::find_all`].
///
/// Present keys are combined with AND; absent keys impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilters {
    /// Exact fitter match.
    pub fitter_id: Option<FitterId>,
    /// Case-insensitive substring of the country.
    pub country: Option<String>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    /// `true` selects live customers, `false` soft-deleted ones.
    pub is_active: Option<bool>,
}

impl CustomerFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fitter_id(mut self, fitter_id: FitterId) -> Self {
        self.fitter_id = Some(fitter_id);
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}

/// Options for [`CustomerRepository::find_all_paginated`].
///
/// Field filters and the free-text `search` term narrow each other (AND).
/// A purely numeric `search` also matches the customer id exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerSearch {
    pub page: PageRequest,
    /// Exact id match.
    pub id: Option<i64>,
    /// Exact fitter match.
    pub fitter_id: Option<FitterId>,
    /// Case-insensitive substring filters.
    pub name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    /// Free-text term matched against name, email, city and country.
    pub search: Option<String>,
}

impl CustomerSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = PageRequest::new(page, limit);
        self
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn fitter_id(mut self, fitter_id: FitterId) -> Self {
        self.fitter_id = Some(fitter_id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// One page of search results and the total matching the same filters.
#[derive(Debug, Clone, Default)]
pub struct CustomerPage {
    pub customers: Vec<Customer>,
    pub total: u64,
}

/// Persistence operations needed by the customer aggregate.
///
/// Listings exclude soft-deleted customers and are ordered by name unless
/// stated otherwise. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Finds a live customer by id. Soft-deleted customers are not returned.
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Finds a customer by id regardless of soft deletion.
    ///
    /// Meant for audit and migration tooling.
    async fn find_by_id_including_deleted(
        &self,
        id: &CustomerId,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Finds a live customer by email, scoped to a fitter when one is given.
    async fn find_by_email(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Finds a live customer holding `email` within one uniqueness scope.
    ///
    /// Unlike [`CustomerRepository::find_by_email`], `None` selects the
    /// customers without a fitter rather than all fitters. This is the scope
    /// the store's email uniqueness constraint enforces.
    async fn find_by_email_in_fitter_scope(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Advisory existence check for the per-fitter email rule.
    ///
    /// Not transactional: a concurrent create may still win, in which case
    /// `save` reports [`RepositoryError::EmailConflict`].
    async fn exists_by_email(
        &self,
        email: &Email,
        fitter_id: Option<FitterId>,
    ) -> Result<bool, RepositoryError>;

    async fn find_by_fitter_id(&self, fitter_id: FitterId)
    -> Result<Vec<Customer>, RepositoryError>;

    /// Case-insensitive exact country match.
    async fn find_by_country(&self, country: &str) -> Result<Vec<Customer>, RepositoryError>;

    /// Case-insensitive exact city match.
    async fn find_by_city(&self, city: &str) -> Result<Vec<Customer>, RepositoryError>;

    async fn find_active(&self) -> Result<Vec<Customer>, RepositoryError>;

    async fn find_active_customers_without_fitter(
        &self,
    ) -> Result<Vec<Customer>, RepositoryError>;

    /// Lists customers matching every present filter. Without `is_active`,
    /// soft-deleted customers are included.
    async fn find_all(&self, filters: &CustomerFilters) -> Result<Vec<Customer>, RepositoryError>;

    /// Universal search with a page window and a total over the same filters.
    async fn find_all_paginated(
        &self,
        search: &CustomerSearch,
    ) -> Result<CustomerPage, RepositoryError>;

    /// Inserts or updates by identity and returns the stored customer.
    ///
    /// A customer with a numeric id whose row exists is updated; anything
    /// else is inserted and receives a store-assigned id.
    async fn save(&self, customer: Customer) -> Result<Customer, RepositoryError>;

    /// Soft-deletes a customer. Rows are never removed.
    async fn delete(&self, id: &CustomerId) -> Result<(), RepositoryError>;

    async fn count_by_fitter_id(&self, fitter_id: FitterId) -> Result<u64, RepositoryError>;

    async fn count_active(&self) -> Result<u64, RepositoryError>;

    /// Inserts all customers and returns them with their new ids, in input
    /// order.
    async fn bulk_create(
        &self,
        customers: Vec<Customer>,
    ) -> Result<Vec<Customer>, RepositoryError>;
}
