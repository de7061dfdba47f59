//! Customer repository adapters.
//!
//! Provides the persisted record shape, the mapper between records and the
//! `Customer` aggregate, the compiled search predicates, and two
//! implementations of `CustomerRepository`: in-memory and PostgreSQL.

pub mod error;
pub mod mapper;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;

pub use error::{EMAIL_UNIQUE_CONSTRAINT, Result, StoreError};
pub use memory::InMemoryCustomerRepository;
pub use postgres::PostgresCustomerRepository;
pub use query::{CustomerQuery, SearchTerm};
pub use record::CustomerRecord;
