//! Error types for the huddle engine.

use thiserror::Error;

/// The engine-wide error taxonomy.
///
/// Every variant except [`Infrastructure`](HuddleError::Infrastructure)
/// is a deterministic function of aggregate state and must not be
/// retried; `Infrastructure` failures are safe to retry with the same
/// inputs from a fresh load.
#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl HuddleError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Whether a caller may retry the failed operation verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

pub type HuddleResult<T> = Result<T, HuddleError>;
