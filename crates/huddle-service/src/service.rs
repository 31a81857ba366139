//! Group service — directory, join workflow, and role authority.

use chrono::Utc;
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::models::group::{CreateGroup, Group, PendingRequest, UpdateGroup, normalize_code};
use huddle_core::models::role::GroupRole;
use huddle_core::models::view::GroupView;
use huddle_core::repository::{GroupRepository, IdentityProvider};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GroupServiceConfig;

/// The group engine.
///
/// Generic over the repository and identity-provider implementations
/// so the engine carries no dependency on a concrete backend.
pub struct GroupService<R: GroupRepository, I: IdentityProvider> {
    repo: R,
    identity: I,
    config: GroupServiceConfig,
}

impl<R: GroupRepository, I: IdentityProvider> GroupService<R, I> {
    pub fn new(repo: R, identity: I, config: GroupServiceConfig) -> Self {
        Self {
            repo,
            identity,
            config,
        }
    }

    // -- group directory -------------------------------------------------

    /// Create a group. The requester becomes creator, admin, and
    /// member atomically.
    pub async fn create_group(&self, input: CreateGroup) -> HuddleResult<Group> {
        self.require_user(input.requester).await?;

        let code = normalize_code(&input.code);
        match self.timed(self.repo.get_by_code(&code)).await {
            Ok(_) => return Err(HuddleError::conflict("Group code already exists")),
            Err(HuddleError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let group = Group::new(input, Utc::now())?;
        let saved = self.timed(self.repo.save(group)).await?;
        info!(group = %saved.id, code = %saved.code, creator = %saved.creator, "group created");
        Ok(saved)
    }

    /// Update name, code, or description. Admin only; a changed name
    /// or code must not collide with another group's.
    pub async fn update_group(
        &self,
        requester: Uuid,
        group_id: Uuid,
        patch: UpdateGroup,
    ) -> HuddleResult<Group> {
        let mut attempts = 0;
        loop {
            let group = self.timed(self.repo.get_by_id(group_id)).await?;
            require_admin(&group, requester, "Only group admin can update group")?;

            let updated = group.with_patch(patch.clone())?;
            let name_changed = updated.name != group.name;
            let code_changed = updated.code != group.code;
            if name_changed || code_changed {
                let all = self.timed(self.repo.list()).await?;
                let collides = all.iter().any(|other| {
                    other.id != group_id
                        && ((name_changed && other.name == updated.name)
                            || (code_changed && other.code == updated.code))
                });
                if collides {
                    return Err(HuddleError::conflict("Group name or code already exists"));
                }
            }

            match self.timed(self.repo.save(updated)).await {
                Ok(saved) => return Ok(saved),
                Err(err) => self.check_retry(err, &mut attempts)?,
            }
        }
    }

    /// Permanently delete a group and its pending requests. Admin
    /// only. The delete carries the loaded snapshot's version, so an
    /// admin check made against a stale snapshot cannot take effect;
    /// a lost race re-runs the check against a fresh load.
    pub async fn delete_group(&self, requester: Uuid, group_id: Uuid) -> HuddleResult<Group> {
        let mut attempts = 0;
        loop {
            let group = self.timed(self.repo.get_by_id(group_id)).await?;
            require_admin(&group, requester, "Only group admin can delete group")?;

            match self.timed(self.repo.delete(group_id, group.version)).await {
                Ok(()) => {
                    info!(group = %group_id, requester = %requester, "group deleted");
                    return Ok(group);
                }
                Err(err) => self.check_retry(err, &mut attempts)?,
            }
        }
    }

    /// All groups, newest first.
    pub async fn list_groups(&self) -> HuddleResult<Vec<Group>> {
        let mut groups = self.timed(self.repo.list()).await?;
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    /// Role-scoped projection of a group for an optional viewer.
    pub async fn get_group_detail(
        &self,
        group_id: Uuid,
        viewer: Option<Uuid>,
    ) -> HuddleResult<GroupView> {
        let group = self.timed(self.repo.get_by_id(group_id)).await?;
        Ok(GroupView::render(&group, viewer))
    }

    // -- join workflow ---------------------------------------------------

    /// Submit a join request against a group's join code.
    pub async fn request_to_join(&self, user: Uuid, code: &str) -> HuddleResult<Group> {
        self.require_user(user).await?;
        let code = normalize_code(code);
        let group = self.timed(self.repo.get_by_code(&code)).await?;
        self.mutate(group.id, |g| g.with_join_request(user, Utc::now()))
            .await
    }

    /// Approve a pending request. Admin or Mod.
    pub async fn approve_request(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            require_manager(g, operator, "You are not allowed to approve requests")?;
            g.with_approved_member(target)
        })
        .await
    }

    /// Reject a pending request. Admin or Mod. Membership is untouched.
    pub async fn reject_request(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            require_manager(g, operator, "You are not allowed to reject requests")?;
            g.with_rejected_request(target)
        })
        .await
    }

    /// The pending queue, most recent first. Admin or Mod.
    pub async fn list_pending_requests(
        &self,
        requester: Uuid,
        group_id: Uuid,
    ) -> HuddleResult<Vec<PendingRequest>> {
        let group = self.timed(self.repo.get_by_id(group_id)).await?;
        require_manager(
            &group,
            requester,
            "You are not allowed to view pending requests",
        )?;
        Ok(group.pending_requests)
    }

    // -- role & membership authority -------------------------------------

    /// Voluntary departure. The last admin may not leave.
    pub async fn leave_group(&self, user: Uuid, group_id: Uuid) -> HuddleResult<Group> {
        self.mutate(group_id, |g| g.after_leave(user)).await
    }

    /// Remove another member. Admin or Mod; a Mod may not kick an
    /// admin, and nobody may kick the last admin.
    pub async fn kick_member(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            if operator == target {
                return Err(HuddleError::bad_request("You cannot kick yourself"));
            }
            let operator_role =
                require_manager(g, operator, "You are not allowed to kick members")?;
            if operator_role == GroupRole::Mod && g.is_admin(target) {
                return Err(HuddleError::forbidden("Moderator cannot kick an admin"));
            }
            g.after_kick(target)
        })
        .await
    }

    /// Promote a member to admin. Admin only.
    pub async fn assign_admin(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            require_admin(g, operator, "Only admin can assign admin")?;
            g.with_admin(target)
        })
        .await
    }

    /// Promote a plain member to moderator. Admin only.
    pub async fn assign_mod(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            require_admin(g, operator, "Only admin can assign moderator")?;
            g.with_mod(target)
        })
        .await
    }

    /// Strip another admin's role. Admin only; self-demotion is
    /// blocked regardless of admin count.
    pub async fn demote_admin(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            require_admin(g, operator, "Only admin can demote admin")?;
            if operator == target {
                return Err(HuddleError::bad_request("You cannot demote yourself"));
            }
            g.without_admin(target)
        })
        .await
    }

    /// Strip a moderator's role. Admin only.
    pub async fn remove_mod(
        &self,
        operator: Uuid,
        group_id: Uuid,
        target: Uuid,
    ) -> HuddleResult<Group> {
        self.mutate(group_id, |g| {
            require_admin(g, operator, "Only admin can remove moderator")?;
            g.without_mod(target)
        })
        .await
    }

    // -- internals -------------------------------------------------------

    /// One atomic read-modify-write unit: load a snapshot, apply the
    /// transition against that exact snapshot, save. A save losing the
    /// optimistic-concurrency race is retried from a fresh load;
    /// business-rule rejections surface immediately.
    async fn mutate<F>(&self, group_id: Uuid, apply: F) -> HuddleResult<Group>
    where
        F: Fn(&Group) -> HuddleResult<Group>,
    {
        let mut attempts = 0;
        loop {
            let snapshot = self.timed(self.repo.get_by_id(group_id)).await?;
            let updated = apply(&snapshot)?;
            match self.timed(self.repo.save(updated)).await {
                Ok(saved) => {
                    debug!(group = %group_id, version = saved.version, "group mutated");
                    return Ok(saved);
                }
                Err(err) => self.check_retry(err, &mut attempts)?,
            }
        }
    }

    /// Consume a failed save: absorb it when another attempt is still
    /// allowed, surface it otherwise.
    fn check_retry(&self, err: HuddleError, attempts: &mut u32) -> HuddleResult<()> {
        if err.is_retryable() && *attempts + 1 < self.config.max_save_attempts {
            *attempts += 1;
            debug!(attempts = *attempts, "retrying mutation after save conflict");
            Ok(())
        } else {
            Err(err)
        }
    }

    /// Bound a persistence call by the configured timeout.
    async fn timed<T>(&self, call: impl Future<Output = HuddleResult<T>>) -> HuddleResult<T> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(HuddleError::Infrastructure(
                "persistence call timed out".into(),
            )),
        }
    }

    async fn require_user(&self, user: Uuid) -> HuddleResult<()> {
        if self.identity.exists(user).await? {
            Ok(())
        } else {
            Err(HuddleError::not_found("user", user))
        }
    }
}

fn require_manager(group: &Group, user: Uuid, reason: &str) -> HuddleResult<GroupRole> {
    group
        .role_of(user)
        .ok_or_else(|| HuddleError::forbidden(reason))
}

fn require_admin(group: &Group, user: Uuid, reason: &str) -> HuddleResult<()> {
    if group.is_admin(user) {
        Ok(())
    } else {
        Err(HuddleError::forbidden(reason))
    }
}
