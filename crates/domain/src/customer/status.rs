//! Customer lifecycle state machine.

use serde::{Deserialize, Serialize};

use super::CustomerError;

/// The lifecycle state of a customer.
///
/// ```text
/// Active ◄──► Inactive
///    │           │
///    └─────┬─────┘
///          ▼
///       Deleted (terminal)
/// ```
///
/// Deletion is a soft delete: the row is kept and only this state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl CustomerStatus {
    /// Returns true if the customer has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self, CustomerStatus::Deleted)
    }

    /// Returns true if the status may still change.
    pub fn can_transition(&self) -> bool {
        !self.is_deleted()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Inactive => "INACTIVE",
            CustomerStatus::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CustomerStatus {
    type Err = CustomerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(CustomerStatus::Active),
            "INACTIVE" => Ok(CustomerStatus::Inactive),
            "DELETED" => Ok(CustomerStatus::Deleted),
            _ => Err(CustomerError::InvalidStatus(s.to_string())),
        }
    }
}
