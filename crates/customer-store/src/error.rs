use common::FitterId;
use domain::RepositoryError;
use thiserror::Error;

/// Name of the partial unique index backing per-fitter email uniqueness.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "customers_fitter_email_unique";

/// Errors that can occur inside the customer store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another live customer of the same fitter already uses this email.
    #[error("Email {email} is already in use for fitter {fitter_id:?}")]
    EmailConflict {
        email: String,
        fitter_id: Option<FitterId>,
    },

    /// The row is soft-deleted and may not be written again.
    #[error("Customer {0} is deleted")]
    Deleted(i64),

    /// No row exists for this id.
    #[error("Customer {0} not found")]
    NotFound(i64),

    /// A stored row failed domain validation on the way out.
    #[error("Corrupt customer record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Maps a write failure, turning a violation of the email index into
    /// [`StoreError::EmailConflict`].
    pub fn from_write(
        err: sqlx::Error,
        email: Option<&str>,
        fitter_id: Option<FitterId>,
    ) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT)
        {
            return StoreError::EmailConflict {
                email: email.unwrap_or_default().to_string(),
                fitter_id,
            };
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailConflict { email, fitter_id } => {
                RepositoryError::EmailConflict { email, fitter_id }
            }
            StoreError::Deleted(id) => RepositoryError::Deleted(id),
            StoreError::NotFound(id) => RepositoryError::NotFound(id),
            StoreError::CorruptRecord { id, reason } => {
                RepositoryError::CorruptRecord { id, reason }
            }
            other @ (StoreError::Database(_) | StoreError::Migration(_)) => {
                RepositoryError::Storage(Box::new(other))
            }
        }
    }
}

/// Result type for customer store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
