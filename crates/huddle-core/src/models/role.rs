//! Group roles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role a member may additionally hold within a group.
///
/// Plain membership carries no entry in the manager list; a user holds
/// at most one role at a time, which rules out the "admin and mod at
/// once" state by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Mod,
}

/// A `(user, role)` entry in a group's manager list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub user: Uuid,
    pub role: GroupRole,
}
