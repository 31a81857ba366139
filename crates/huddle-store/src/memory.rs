//! In-memory backend for the persistence and identity traits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use huddle_core::HuddleResult;
use huddle_core::models::group::{Group, normalize_code};
use huddle_core::repository::{GroupRepository, IdentityProvider};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

/// In-memory [`GroupRepository`].
///
/// A single map guarded by one lock keeps every save atomic at
/// aggregate granularity. Writers racing on the same aggregate are
/// detected through the aggregate's `version` counter: the save only
/// succeeds when the caller's snapshot is still the stored one.
#[derive(Clone, Default)]
pub struct MemoryGroupStore {
    groups: Arc<RwLock<HashMap<Uuid, Group>>>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupRepository for MemoryGroupStore {
    async fn get_by_id(&self, id: Uuid) -> HuddleResult<Group> {
        let groups = self.groups.read().await;
        groups.get(&id).cloned().ok_or_else(|| {
            StoreError::NotFound {
                entity: "group".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn get_by_code(&self, code: &str) -> HuddleResult<Group> {
        let code = normalize_code(code);
        let groups = self.groups.read().await;
        groups
            .values()
            .find(|g| g.code == code)
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound {
                    entity: "group".into(),
                    id: code,
                }
                .into()
            })
    }

    async fn save(&self, mut group: Group) -> HuddleResult<Group> {
        let mut groups = self.groups.write().await;

        // The unique-code index: no two live groups share a code.
        if let Some(other) = groups
            .values()
            .find(|g| g.id != group.id && g.code == group.code)
        {
            debug!(group = %group.id, other = %other.id, code = %group.code, "duplicate code on save");
            return Err(StoreError::DuplicateCode {
                code: group.code.clone(),
            }
            .into());
        }

        match groups.get(&group.id) {
            Some(stored) if stored.version != group.version => {
                return Err(StoreError::VersionConflict {
                    id: group.id.to_string(),
                    expected: group.version,
                    found: stored.version,
                }
                .into());
            }
            Some(_) => {}
            // Only a version-0 snapshot is a legitimate first save; a
            // later version with no stored record means the aggregate
            // was deleted, and deletion is irrecoverable.
            None if group.version != 0 => {
                return Err(StoreError::NotFound {
                    entity: "group".into(),
                    id: group.id.to_string(),
                }
                .into());
            }
            None => {}
        }

        group.version += 1;
        group.updated_at = Utc::now();
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete(&self, id: Uuid, expected_version: u64) -> HuddleResult<()> {
        let mut groups = self.groups.write().await;
        match groups.get(&id) {
            None => Err(StoreError::NotFound {
                entity: "group".into(),
                id: id.to_string(),
            }
            .into()),
            Some(stored) if stored.version != expected_version => {
                Err(StoreError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                    found: stored.version,
                }
                .into())
            }
            Some(_) => {
                groups.remove(&id);
                Ok(())
            }
        }
    }

    async fn list(&self) -> HuddleResult<Vec<Group>> {
        let groups = self.groups.read().await;
        Ok(groups.values().cloned().collect())
    }
}

/// In-memory [`IdentityProvider`] backed by a set of known user ids.
#[derive(Clone, Default)]
pub struct MemoryIdentityDirectory {
    users: Arc<RwLock<HashSet<Uuid>>>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user id as existing.
    pub async fn register(&self, user: Uuid) {
        self.users.write().await.insert(user);
    }
}

impl IdentityProvider for MemoryIdentityDirectory {
    async fn exists(&self, user: Uuid) -> HuddleResult<bool> {
        Ok(self.users.read().await.contains(&user))
    }
}
