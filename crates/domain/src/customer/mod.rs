//! Customer aggregate and related types.

mod aggregate;
mod commands;
mod events;
pub mod repository;
mod service;
mod status;
mod value_objects;
mod view;

pub use aggregate::Customer;
pub use commands::{ContactInfoUpdate, CustomerDetails, FieldUpdate};
pub use events::{
    ContactInfoUpdatedData, CustomerDeletedData, CustomerEvent, CustomerRegisteredData,
    FitterAssignedData, FitterRemovedData, StatusChangedData,
};
pub use repository::{
    CustomerFilters, CustomerPage, CustomerRepository, CustomerSearch, RepositoryError,
};
pub use service::{CommandResult, CustomerService, IntegrityReport};
pub use status::CustomerStatus;
pub use value_objects::{CustomerId, Email};
pub use view::{CustomerPageView, CustomerView};

use thiserror::Error;

/// Business rule violations raised by value objects and the customer aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerError {
    /// Name is required.
    #[error("Customer name must not be empty")]
    EmptyName,

    /// Email failed syntactic validation.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Identifier is not a positive integer.
    #[error("Invalid customer id: {0}")]
    InvalidId(String),

    /// Unknown lifecycle status.
    #[error("Invalid customer status: {0}")]
    InvalidStatus(String),

    /// Operation is not allowed on a soft-deleted customer.
    #[error("Customer {id} has been deleted")]
    Deleted { id: CustomerId },

    /// Customer cannot be used for an order.
    #[error("Customer {id} cannot place orders: {reason}")]
    NotOrderEligible {
        id: CustomerId,
        reason: &'static str,
    },
}
