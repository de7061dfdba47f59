//! Domain error types.

use common::FitterId;
use thiserror::Error;

use crate::customer::{CustomerError, RepositoryError};

/// Errors that can occur during customer use cases.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No live customer exists for the requested id.
    #[error("Customer not found: {id}")]
    NotFound { id: String },

    /// A value object or aggregate rule was violated.
    #[error("Validation failed: {0}")]
    Validation(#[from] CustomerError),

    /// Another customer of the same fitter already uses this email.
    #[error("Email {email} is already in use")]
    EmailConflict {
        email: String,
        fitter_id: Option<FitterId>,
    },

    /// Any other repository failure, propagated unchanged.
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::EmailConflict { email, fitter_id } => {
                DomainError::EmailConflict { email, fitter_id }
            }
            RepositoryError::NotFound(id) => DomainError::NotFound { id: id.to_string() },
            other => DomainError::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_level_conflict_maps_to_same_kind() {
        let err: DomainError = RepositoryError::EmailConflict {
            email: "a@b.com".into(),
            fitter_id: FitterId::from_raw(2),
        }
        .into();
        assert!(matches!(err, DomainError::EmailConflict { .. }));
    }

    #[test]
    fn storage_failure_passes_through() {
        let err: DomainError = RepositoryError::Storage("connection reset".into()).into();
        assert!(matches!(
            err,
            DomainError::Repository(RepositoryError::Storage(_))
        ));
    }
}
