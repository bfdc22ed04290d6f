use thiserror::Error;
use uuid::Uuid;

/// Local persistence failures during materialization or reads.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored row failed to decode: {0}")]
    Decode(String),

    #[error("entry not found: {0}")]
    EntryNotFound(Uuid),
}
