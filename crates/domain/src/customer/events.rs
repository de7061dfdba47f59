//! Customer domain events.

use chrono::{DateTime, Utc};
use common::FitterId;
use serde::{Deserialize, Serialize};

use crate::event::DomainEvent;

use super::{CustomerId, CustomerStatus};

/// Events emitted by customer mutations.
///
/// Mutating operations return the events they produced instead of buffering
/// them inside the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerEvent {
    /// Customer was registered and persisted.
    CustomerRegistered(CustomerRegisteredData),

    /// A fitter was assigned to the customer.
    FitterAssigned(FitterAssignedData),

    /// The fitter assignment was removed.
    FitterRemoved(FitterRemovedData),

    /// Customer moved between lifecycle states.
    StatusChanged(StatusChangedData),

    /// Descriptive or contact fields were updated.
    ContactInfoUpdated(ContactInfoUpdatedData),

    /// Customer was soft-deleted.
    CustomerDeleted(CustomerDeletedData),
}

impl DomainEvent for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerRegistered(_) => "CustomerRegistered",
            CustomerEvent::FitterAssigned(_) => "FitterAssigned",
            CustomerEvent::FitterRemoved(_) => "FitterRemoved",
            CustomerEvent::StatusChanged(_) => "StatusChanged",
            CustomerEvent::ContactInfoUpdated(_) => "ContactInfoUpdated",
            CustomerEvent::CustomerDeleted(_) => "CustomerDeleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRegisteredData {
    pub customer_id: CustomerId,
    pub name: String,
    pub fitter_id: Option<FitterId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitterAssignedData {
    pub customer_id: CustomerId,
    pub fitter_id: FitterId,
    /// Fitter that was replaced, if any.
    pub previous_fitter_id: Option<FitterId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitterRemovedData {
    pub customer_id: CustomerId,
    pub previous_fitter_id: Option<FitterId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub customer_id: CustomerId,
    pub from: CustomerStatus,
    pub to: CustomerStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfoUpdatedData {
    pub customer_id: CustomerId,
    /// Names of the fields whose value actually changed.
    pub changed_fields: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDeletedData {
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

// Convenience constructors
impl CustomerEvent {
    pub fn customer_registered(
        customer_id: CustomerId,
        name: impl Into<String>,
        fitter_id: Option<FitterId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        CustomerEvent::CustomerRegistered(CustomerRegisteredData {
            customer_id,
            name: name.into(),
            fitter_id,
            occurred_at,
        })
    }

    pub fn fitter_assigned(
        customer_id: CustomerId,
        fitter_id: FitterId,
        previous_fitter_id: Option<FitterId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        CustomerEvent::FitterAssigned(FitterAssignedData {
            customer_id,
            fitter_id,
            previous_fitter_id,
            occurred_at,
        })
    }

    pub fn fitter_removed(
        customer_id: CustomerId,
        previous_fitter_id: Option<FitterId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        CustomerEvent::FitterRemoved(FitterRemovedData {
            customer_id,
            previous_fitter_id,
            occurred_at,
        })
    }

    pub fn status_changed(
        customer_id: CustomerId,
        from: CustomerStatus,
        to: CustomerStatus,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        CustomerEvent::StatusChanged(StatusChangedData {
            customer_id,
            from,
            to,
            occurred_at,
        })
    }

    pub fn contact_info_updated(
        customer_id: CustomerId,
        changed_fields: Vec<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        CustomerEvent::ContactInfoUpdated(ContactInfoUpdatedData {
            customer_id,
            changed_fields,
            occurred_at,
        })
    }

    pub fn customer_deleted(customer_id: CustomerId, occurred_at: DateTime<Utc>) -> Self {
        CustomerEvent::CustomerDeleted(CustomerDeletedData {
            customer_id,
            occurred_at,
        })
    }
}
