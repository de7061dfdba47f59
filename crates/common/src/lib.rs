//! Shared types used across the customer management crates.

pub mod paging;
pub mod types;

pub use paging::PageRequest;
pub use types::FitterId;
