use common::Version;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An entity with the same identity is already stored.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// The stored version did not match the version the caller read.
    #[error(
        "Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be turned back into an entity.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        StoreError::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(
        entity: &'static str,
        id: impl ToString,
        expected: Version,
        actual: Version,
    ) -> Self {
        StoreError::ConcurrencyConflict {
            entity,
            id: id.to_string(),
            expected,
            actual,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
