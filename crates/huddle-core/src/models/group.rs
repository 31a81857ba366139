//! The Group aggregate and its transition functions.
//!
//! The aggregate is immutable by convention: every mutation is a
//! transition function that takes `&self`, returns a fresh `Group`, and
//! runs the structural invariants as a post-condition. Authorization
//! (who may invoke a transition) is the service layer's concern; state
//! preconditions (who the transition may target) are checked here.
//!
//! All three lists — `managers`, `members`, `pending_requests` — are
//! ordered most-recently-added first. Front insertion is a contract,
//! not an accident: list order reflects recency of status change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HuddleError, HuddleResult};
use crate::models::role::{GroupRole, Manager};

/// Display-name length bounds (in characters).
pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 100;
/// Join-code length bounds (in characters, after normalization).
pub const CODE_MIN_LEN: usize = 3;
pub const CODE_MAX_LEN: usize = 30;
/// Maximum description length (in characters).
pub const DESCRIPTION_MAX_LEN: usize = 255;

/// A user's unapproved intent to join, tracked separately from
/// membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub user: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// The sole aggregate root: a group, its managers, its members, and
/// its pending join requests. Everything in here is updated atomically
/// together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    /// Human-entered join code, unique across groups, stored upper-cased.
    pub code: String,
    pub description: Option<String>,
    /// The user who created the group. Immutable after creation.
    pub creator: Uuid,
    /// Members additionally holding a role. Subset of `members`.
    pub managers: Vec<Manager>,
    /// Every user holding at least base membership, managers included.
    pub members: Vec<Uuid>,
    pub pending_requests: Vec<PendingRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped by the store on save.
    #[serde(default)]
    pub version: u64,
}

/// Input for group creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroup {
    pub requester: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

/// Patch for group metadata. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Normalize a join code: trim surrounding whitespace, upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_name(name: &str) -> HuddleResult<()> {
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(HuddleError::bad_request(format!(
            "Group name must be between {NAME_MIN_LEN} and {NAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_code(code: &str) -> HuddleResult<()> {
    let len = code.chars().count();
    if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&len) {
        return Err(HuddleError::bad_request(format!(
            "Group code must be between {CODE_MIN_LEN} and {CODE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> HuddleResult<()> {
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(HuddleError::bad_request(format!(
            "Group description must be at most {DESCRIPTION_MAX_LEN} characters"
        )));
    }
    Ok(())
}

impl Group {
    /// Create a new group. The requester becomes creator, sole admin,
    /// and sole member in one step.
    pub fn new(input: CreateGroup, now: DateTime<Utc>) -> HuddleResult<Self> {
        let name = input.name.trim().to_string();
        validate_name(&name)?;
        let code = normalize_code(&input.code);
        validate_code(&code)?;
        if let Some(description) = &input.description {
            validate_description(description)?;
        }

        let group = Self {
            id: Uuid::new_v4(),
            name,
            code,
            description: input.description,
            creator: input.requester,
            managers: vec![Manager {
                user: input.requester,
                role: GroupRole::Admin,
            }],
            members: vec![input.requester],
            pending_requests: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        Ok(group.finalized())
    }

    // -- queries ---------------------------------------------------------

    pub fn is_member(&self, user: Uuid) -> bool {
        self.members.contains(&user)
    }

    /// The role `user` holds, if any. Plain members hold `None`.
    pub fn role_of(&self, user: Uuid) -> Option<GroupRole> {
        self.managers
            .iter()
            .find(|m| m.user == user)
            .map(|m| m.role)
    }

    pub fn is_admin(&self, user: Uuid) -> bool {
        self.role_of(user) == Some(GroupRole::Admin)
    }

    /// Whether `user` holds Admin or Mod.
    pub fn is_manager(&self, user: Uuid) -> bool {
        self.role_of(user).is_some()
    }

    pub fn admin_count(&self) -> usize {
        self.managers
            .iter()
            .filter(|m| m.role == GroupRole::Admin)
            .count()
    }

    pub fn has_pending_request(&self, user: Uuid) -> bool {
        self.pending_requests.iter().any(|r| r.user == user)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    // -- directory transitions -------------------------------------------

    /// Apply a metadata patch. Uniqueness of a changed name/code against
    /// other groups is the caller's concern; field validity is checked
    /// here and a patched code is normalized.
    pub fn with_patch(&self, patch: UpdateGroup) -> HuddleResult<Self> {
        let mut group = self.clone();
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            validate_name(&name)?;
            group.name = name;
        }
        if let Some(code) = patch.code {
            let code = normalize_code(&code);
            validate_code(&code)?;
            group.code = code;
        }
        if let Some(description) = patch.description {
            validate_description(&description)?;
            group.description = Some(description);
        }
        Ok(group.finalized())
    }

    // -- join-workflow transitions ---------------------------------------

    /// Record a join request for `user`.
    pub fn with_join_request(&self, user: Uuid, at: DateTime<Utc>) -> HuddleResult<Self> {
        if self.is_member(user) {
            return Err(HuddleError::conflict(
                "You are already a member of this group",
            ));
        }
        if self.has_pending_request(user) {
            return Err(HuddleError::conflict("Join request already sent"));
        }
        let mut group = self.clone();
        group.pending_requests.insert(
            0,
            PendingRequest {
                user,
                requested_at: at,
            },
        );
        Ok(group.finalized())
    }

    /// Approve `target`'s pending request: the request is removed and
    /// the user becomes a member in the same step.
    pub fn with_approved_member(&self, target: Uuid) -> HuddleResult<Self> {
        if !self.has_pending_request(target) {
            return Err(HuddleError::bad_request("Join request not found"));
        }
        if self.is_member(target) {
            return Err(HuddleError::bad_request("User is already a member"));
        }
        let mut group = self.clone();
        group.pending_requests.retain(|r| r.user != target);
        group.members.insert(0, target);
        Ok(group.finalized())
    }

    /// Reject `target`'s pending request. Membership is untouched.
    pub fn with_rejected_request(&self, target: Uuid) -> HuddleResult<Self> {
        if !self.has_pending_request(target) {
            return Err(HuddleError::bad_request("Join request not found"));
        }
        let mut group = self.clone();
        group.pending_requests.retain(|r| r.user != target);
        Ok(group.finalized())
    }

    // -- membership transitions ------------------------------------------

    /// Voluntary departure of `user`. The last admin may not leave.
    pub fn after_leave(&self, user: Uuid) -> HuddleResult<Self> {
        if !self.is_member(user) {
            return Err(HuddleError::bad_request(
                "You are not a member of this group",
            ));
        }
        if self.is_admin(user) && self.admin_count() == 1 {
            return Err(HuddleError::bad_request(
                "You are the last admin, please assign another admin before leaving",
            ));
        }
        Ok(self.without_user(user))
    }

    /// Forced removal of `target`. The operator-side checks (role,
    /// self-kick, mod-targeting-admin) belong to the caller; the
    /// last-admin guard is structural and lives here.
    pub fn after_kick(&self, target: Uuid) -> HuddleResult<Self> {
        if !self.is_member(target) {
            return Err(HuddleError::bad_request(
                "Target user is not a member of this group",
            ));
        }
        if self.is_admin(target) && self.admin_count() == 1 {
            return Err(HuddleError::forbidden(
                "Cannot kick the last admin of the group",
            ));
        }
        Ok(self.without_user(target))
    }

    fn without_user(&self, user: Uuid) -> Self {
        let mut group = self.clone();
        group.members.retain(|m| *m != user);
        group.managers.retain(|m| m.user != user);
        group.finalized()
    }

    // -- role transitions ------------------------------------------------

    /// Promote `target` to admin. An existing Mod role is replaced, so
    /// the user never holds two manager entries.
    pub fn with_admin(&self, target: Uuid) -> HuddleResult<Self> {
        if !self.is_member(target) {
            return Err(HuddleError::bad_request("Target user is not a member"));
        }
        if self.is_admin(target) {
            return Err(HuddleError::bad_request("User is already an admin"));
        }
        let mut group = self.clone();
        group.managers.retain(|m| m.user != target);
        group.managers.insert(
            0,
            Manager {
                user: target,
                role: GroupRole::Admin,
            },
        );
        Ok(group.finalized())
    }

    /// Promote `target` to moderator. Only plain members qualify.
    pub fn with_mod(&self, target: Uuid) -> HuddleResult<Self> {
        if !self.is_member(target) {
            return Err(HuddleError::bad_request("Target user is not a member"));
        }
        if self.is_manager(target) {
            return Err(HuddleError::bad_request("User is already admin or moderator"));
        }
        let mut group = self.clone();
        group.managers.insert(
            0,
            Manager {
                user: target,
                role: GroupRole::Mod,
            },
        );
        Ok(group.finalized())
    }

    /// Strip `target`'s admin role; they remain a plain member.
    pub fn without_admin(&self, target: Uuid) -> HuddleResult<Self> {
        if !self.is_admin(target) {
            return Err(HuddleError::bad_request("Target user is not an admin"));
        }
        if self.admin_count() == 1 {
            return Err(HuddleError::bad_request(
                "Cannot demote the last admin of the group",
            ));
        }
        let mut group = self.clone();
        group.managers.retain(|m| m.user != target);
        Ok(group.finalized())
    }

    /// Strip `target`'s moderator role; they remain a plain member.
    pub fn without_mod(&self, target: Uuid) -> HuddleResult<Self> {
        if self.role_of(target) != Some(GroupRole::Mod) {
            return Err(HuddleError::bad_request("Target user is not a moderator"));
        }
        let mut group = self.clone();
        group.managers.retain(|m| m.user != target);
        Ok(group.finalized())
    }

    // -- invariants ------------------------------------------------------

    /// Post-condition for every transition. A violation here is a bug
    /// in a transition function, not a caller error.
    fn finalized(self) -> Self {
        debug_assert!(self.admin_count() >= 1, "group must keep at least one admin");
        debug_assert!(
            self.managers.iter().all(|m| self.members.contains(&m.user)),
            "managers must be a subset of members"
        );
        debug_assert!(
            {
                let mut users: Vec<Uuid> = self.managers.iter().map(|m| m.user).collect();
                users.sort();
                users.dedup();
                users.len() == self.managers.len()
            },
            "a user holds at most one manager entry"
        );
        debug_assert!(
            !self
                .pending_requests
                .iter()
                .any(|r| self.members.contains(&r.user)),
            "a member cannot also hold a pending request"
        );
        debug_assert!(
            {
                let mut users = self.members.clone();
                users.sort();
                users.dedup();
                users.len() == self.members.len()
            },
            "a user appears at most once in members"
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(creator: Uuid) -> Group {
        Group::new(
            CreateGroup {
                requester: creator,
                name: "Rust Study Circle".into(),
                code: "rust101".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn creator_is_admin_and_member() {
        let creator = Uuid::new_v4();
        let group = create(creator);
        assert_eq!(group.creator, creator);
        assert!(group.is_member(creator));
        assert_eq!(group.role_of(creator), Some(GroupRole::Admin));
        assert_eq!(group.code, "RUST101");
    }

    #[test]
    fn name_bounds_enforced() {
        let err = Group::new(
            CreateGroup {
                requester: Uuid::new_v4(),
                name: "ab".into(),
                code: "abc".into(),
                description: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, HuddleError::BadRequest { .. }));
    }

    #[test]
    fn join_request_is_front_inserted() {
        let group = create(Uuid::new_v4());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let group = group.with_join_request(first, Utc::now()).unwrap();
        let group = group.with_join_request(second, Utc::now()).unwrap();
        assert_eq!(group.pending_requests[0].user, second);
        assert_eq!(group.pending_requests[1].user, first);
    }

    #[test]
    fn duplicate_join_request_conflicts() {
        let group = create(Uuid::new_v4());
        let user = Uuid::new_v4();
        let group = group.with_join_request(user, Utc::now()).unwrap();
        let err = group.with_join_request(user, Utc::now()).unwrap_err();
        assert!(matches!(err, HuddleError::Conflict { .. }));
    }

    #[test]
    fn member_cannot_request_to_join() {
        let creator = Uuid::new_v4();
        let group = create(creator);
        let err = group.with_join_request(creator, Utc::now()).unwrap_err();
        assert!(matches!(err, HuddleError::Conflict { .. }));
    }

    #[test]
    fn approve_moves_request_to_membership() {
        let group = create(Uuid::new_v4());
        let user = Uuid::new_v4();
        let group = group.with_join_request(user, Utc::now()).unwrap();
        let group = group.with_approved_member(user).unwrap();
        assert!(group.is_member(user));
        assert!(group.pending_requests.is_empty());
        // Newest member sits at the front.
        assert_eq!(group.members[0], user);
    }

    #[test]
    fn reject_leaves_membership_untouched() {
        let group = create(Uuid::new_v4());
        let user = Uuid::new_v4();
        let group = group.with_join_request(user, Utc::now()).unwrap();
        let group = group.with_rejected_request(user).unwrap();
        assert!(!group.is_member(user));
        assert!(group.pending_requests.is_empty());
        // Second reject has nothing to remove.
        let err = group.with_rejected_request(user).unwrap_err();
        assert!(matches!(err, HuddleError::BadRequest { .. }));
    }

    #[test]
    fn last_admin_cannot_leave() {
        let creator = Uuid::new_v4();
        let group = create(creator);
        let err = group.after_leave(creator).unwrap_err();
        assert!(matches!(err, HuddleError::BadRequest { .. }));
    }

    #[test]
    fn admin_can_leave_once_another_admin_exists() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        let group = create(creator)
            .with_join_request(other, Utc::now())
            .unwrap()
            .with_approved_member(other)
            .unwrap()
            .with_admin(other)
            .unwrap();
        let group = group.after_leave(creator).unwrap();
        assert!(!group.is_member(creator));
        assert!(!group.is_manager(creator));
        assert_eq!(group.admin_count(), 1);
    }

    #[test]
    fn kicking_last_admin_is_forbidden() {
        let creator = Uuid::new_v4();
        let group = create(creator);
        let err = group.after_kick(creator).unwrap_err();
        assert!(matches!(err, HuddleError::Forbidden { .. }));
    }

    #[test]
    fn promote_mod_to_admin_replaces_the_role() {
        let creator = Uuid::new_v4();
        let user = Uuid::new_v4();
        let group = create(creator)
            .with_join_request(user, Utc::now())
            .unwrap()
            .with_approved_member(user)
            .unwrap()
            .with_mod(user)
            .unwrap();
        assert_eq!(group.role_of(user), Some(GroupRole::Mod));

        let group = group.with_admin(user).unwrap();
        assert_eq!(group.role_of(user), Some(GroupRole::Admin));
        assert_eq!(group.managers.iter().filter(|m| m.user == user).count(), 1);
    }

    #[test]
    fn demote_then_promote_round_trips_to_plain_member() {
        let creator = Uuid::new_v4();
        let user = Uuid::new_v4();
        let group = create(creator)
            .with_join_request(user, Utc::now())
            .unwrap()
            .with_approved_member(user)
            .unwrap();
        let promoted = group.with_admin(user).unwrap();
        let demoted = promoted.without_admin(user).unwrap();
        assert_eq!(demoted.role_of(user), None);
        assert!(demoted.is_member(user));
        assert_eq!(demoted.members, group.members);
    }

    #[test]
    fn cannot_demote_last_admin() {
        let creator = Uuid::new_v4();
        let group = create(creator);
        let err = group.without_admin(creator).unwrap_err();
        assert!(matches!(err, HuddleError::BadRequest { .. }));
    }

    #[test]
    fn mod_assignment_requires_plain_member() {
        let creator = Uuid::new_v4();
        let group = create(creator);
        // Creator is already an admin, so mod assignment must fail.
        let err = group.with_mod(creator).unwrap_err();
        assert!(matches!(err, HuddleError::BadRequest { .. }));
        // A stranger is not a member at all.
        let err = group.with_mod(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, HuddleError::BadRequest { .. }));
    }

    #[test]
    fn patch_normalizes_code() {
        let group = create(Uuid::new_v4());
        let group = group
            .with_patch(UpdateGroup {
                code: Some("  newCode42 ".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(group.code, "NEWCODE42");
    }
}
