//! Error types shared across the fintrack crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FintrackError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Database error: {0}")]
    Database(String),
}

impl FintrackError {
    /// Shorthand for a [`FintrackError::NotFound`] with owned fields.
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type FintrackResult<T> = Result<T, FintrackError>;
