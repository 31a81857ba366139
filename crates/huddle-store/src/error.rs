//! Store-specific error types and conversions.

use huddle_core::HuddleError;

/// Storage-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Group code already exists")]
    DuplicateCode { code: String },

    #[error("Concurrent modification of group {id}: expected version {expected}, found {found}")]
    VersionConflict {
        id: String,
        expected: u64,
        found: u64,
    },
}

impl From<StoreError> for HuddleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => HuddleError::NotFound { entity, id },
            StoreError::DuplicateCode { .. } => HuddleError::conflict("Group code already exists"),
            // Version conflicts are transient: a retry from a fresh
            // load observes the winning write.
            conflict @ StoreError::VersionConflict { .. } => {
                HuddleError::Infrastructure(conflict.to_string())
            }
        }
    }
}
