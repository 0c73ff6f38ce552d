//! Database-specific error types and conversions.

use fintrack_core::error::FintrackError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} already exists")]
    AlreadyExists { entity: String },
}

impl DbError {
    /// Classify a failed statement, recognising unique-index violations.
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") || message.contains("already exists") {
            Self::AlreadyExists {
                entity: entity.into(),
            }
        } else {
            Self::Query(message)
        }
    }
}

impl From<DbError> for FintrackError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FintrackError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => FintrackError::AlreadyExists { entity },
            other => FintrackError::Database(other.to_string()),
        }
    }
}
