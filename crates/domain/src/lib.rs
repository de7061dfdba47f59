//! Domain layer for customer management.
//!
//! This crate provides:
//! - Value objects (`CustomerId`, `Email`, `CustomerStatus`)
//! - The `Customer` aggregate and the events its commands emit
//! - The `CustomerRepository` port that storage adapters implement
//! - `CustomerService`, which orchestrates the customer use cases

pub mod customer;
pub mod error;
pub mod event;

pub use customer::{
    CommandResult, ContactInfoUpdate, Customer, CustomerDetails, CustomerError, CustomerEvent,
    CustomerFilters, CustomerId, CustomerPage, CustomerPageView, CustomerRepository,
    CustomerSearch, CustomerService, CustomerStatus, CustomerView, Email, FieldUpdate,
    IntegrityReport, RepositoryError,
};
pub use error::DomainError;
pub use event::DomainEvent;
