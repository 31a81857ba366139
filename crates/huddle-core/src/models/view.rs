//! Role-scoped projections of the Group aggregate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::group::{Group, PendingRequest};
use crate::models::role::{GroupRole, Manager};

/// Minimal projection shown to viewers outside the group.
///
/// Anonymous viewers see the join code (so the group can be shared by
/// link); authenticated non-members do not, and their view drops the
/// creation time as well.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub description: Option<String>,
    pub creator: Uuid,
    pub member_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Full projection minus the pending-request queue, shown to members
/// who are not admins. A Mod who is not an Admin receives this view
/// too; the pending queue stays admin-eyes-only in the detail view.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub creator: Uuid,
    pub managers: Vec<Manager>,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a given viewer is allowed to see of a group.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GroupView {
    /// Anonymous viewer or authenticated non-member.
    Summary(GroupSummary),
    /// Plain member or moderator: everything except pending requests.
    Member(GroupDetail),
    /// Admin: the full aggregate, pending requests included.
    Admin(AdminDetail),
}

/// The admin projection: [`GroupDetail`] plus the pending queue.
#[derive(Debug, Clone, Serialize)]
pub struct AdminDetail {
    #[serde(flatten)]
    pub detail: GroupDetail,
    pub pending_requests: Vec<PendingRequest>,
}

impl GroupView {
    /// Project `group` for `viewer`. Precedence: admin first, then
    /// member, then the minimal summary.
    pub fn render(group: &Group, viewer: Option<Uuid>) -> Self {
        match viewer {
            None => Self::Summary(GroupSummary {
                id: group.id,
                name: group.name.clone(),
                code: Some(group.code.clone()),
                description: group.description.clone(),
                creator: group.creator,
                member_count: group.member_count(),
                created_at: Some(group.created_at),
            }),
            Some(user) if group.role_of(user) == Some(GroupRole::Admin) => {
                Self::Admin(AdminDetail {
                    detail: detail_of(group),
                    pending_requests: group.pending_requests.clone(),
                })
            }
            Some(user) if group.is_member(user) => Self::Member(detail_of(group)),
            Some(_) => Self::Summary(GroupSummary {
                id: group.id,
                name: group.name.clone(),
                code: None,
                description: group.description.clone(),
                creator: group.creator,
                member_count: group.member_count(),
                created_at: None,
            }),
        }
    }
}

fn detail_of(group: &Group) -> GroupDetail {
    GroupDetail {
        id: group.id,
        name: group.name.clone(),
        code: group.code.clone(),
        description: group.description.clone(),
        creator: group.creator,
        managers: group.managers.clone(),
        members: group.members.clone(),
        created_at: group.created_at,
        updated_at: group.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::group::CreateGroup;

    fn group_with_pending() -> (Group, Uuid, Uuid, Uuid) {
        let admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        let pending = Uuid::new_v4();
        let group = Group::new(
            CreateGroup {
                requester: admin,
                name: "Observability Guild".into(),
                code: "obs".into(),
                description: Some("dashboards and oncall".into()),
            },
            Utc::now(),
        )
        .unwrap()
        .with_join_request(member, Utc::now())
        .unwrap()
        .with_approved_member(member)
        .unwrap()
        .with_join_request(pending, Utc::now())
        .unwrap();
        (group, admin, member, pending)
    }

    #[test]
    fn anonymous_sees_summary_with_code() {
        let (group, _, _, _) = group_with_pending();
        match GroupView::render(&group, None) {
            GroupView::Summary(s) => {
                assert_eq!(s.code.as_deref(), Some("OBS"));
                assert!(s.created_at.is_some());
                assert_eq!(s.member_count, 2);
            }
            other => panic!("expected summary view, got {other:?}"),
        }
    }

    #[test]
    fn outsider_summary_hides_code() {
        let (group, _, _, _) = group_with_pending();
        match GroupView::render(&group, Some(Uuid::new_v4())) {
            GroupView::Summary(s) => {
                assert!(s.code.is_none());
                assert!(s.created_at.is_none());
            }
            other => panic!("expected summary view, got {other:?}"),
        }
    }

    #[test]
    fn member_view_hides_pending_requests() {
        let (group, _, member, _) = group_with_pending();
        match GroupView::render(&group, Some(member)) {
            GroupView::Member(detail) => {
                assert_eq!(detail.members.len(), 2);
                let json = serde_json::to_value(GroupView::render(&group, Some(member))).unwrap();
                assert!(json.get("pending_requests").is_none());
            }
            other => panic!("expected member view, got {other:?}"),
        }
    }

    #[test]
    fn admin_sees_pending_requests() {
        let (group, admin, _, pending) = group_with_pending();
        match GroupView::render(&group, Some(admin)) {
            GroupView::Admin(detail) => {
                assert_eq!(detail.pending_requests.len(), 1);
                assert_eq!(detail.pending_requests[0].user, pending);
            }
            other => panic!("expected admin view, got {other:?}"),
        }
    }

    #[test]
    fn mod_receives_member_view() {
        let (group, _, member, _) = group_with_pending();
        let group = group.with_mod(member).unwrap();
        assert!(matches!(
            GroupView::render(&group, Some(member)),
            GroupView::Member(_)
        ));
    }
}
