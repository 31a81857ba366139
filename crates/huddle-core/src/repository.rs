//! Trait definitions for the engine's external collaborators.
//!
//! All operations are async. Each repository call is required to be
//! atomic at single-aggregate granularity: `save` either persists the
//! whole aggregate or fails without partial effects, and a save racing
//! another writer on the same aggregate must fail rather than silently
//! overwrite (the `version` field carries the expected snapshot).

use uuid::Uuid;

use crate::error::HuddleResult;
use crate::models::group::Group;

/// Persistence interface for the Group aggregate.
pub trait GroupRepository: Send + Sync {
    /// Load an aggregate snapshot by id.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HuddleResult<Group>> + Send;

    /// Load an aggregate snapshot by its normalized join code.
    fn get_by_code(&self, code: &str) -> impl Future<Output = HuddleResult<Group>> + Send;

    /// Persist an aggregate. For an existing aggregate the stored
    /// version must equal `group.version`; on mismatch the save fails
    /// with a retryable infrastructure error and no state change. A
    /// version-0 snapshot is a first save; any later version whose
    /// record is gone was deleted and must fail rather than be
    /// re-created. Returns the stored aggregate with its version
    /// advanced.
    fn save(&self, group: Group) -> impl Future<Output = HuddleResult<Group>> + Send;

    /// Permanently remove an aggregate, pending requests included.
    /// The stored version must equal `expected_version`; on mismatch
    /// the delete fails with a retryable infrastructure error so the
    /// caller re-evaluates against a fresh snapshot.
    fn delete(
        &self,
        id: Uuid,
        expected_version: u64,
    ) -> impl Future<Output = HuddleResult<()>> + Send;

    /// All non-deleted groups, in unspecified order.
    fn list(&self) -> impl Future<Output = HuddleResult<Vec<Group>>> + Send;
}

/// Identity provider: confirms that a user identifier refers to an
/// existing user. The engine treats the identifier itself as opaque.
pub trait IdentityProvider: Send + Sync {
    fn exists(&self, user: Uuid) -> impl Future<Output = HuddleResult<bool>> + Send;
}
