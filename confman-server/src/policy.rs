//! Authorization policy
//!
//! Two gates, applied in order:
//! 1. Role gate: the route group's [`RoleSet`] must contain the caller's live
//!    role. Enforced by middleware before any handler runs.
//! 2. Ownership gate: resource-scoped actions go through [`can_act`], which
//!    looks the action up in one policy table. Passing the role gate never
//!    implies passing this one.

use confman_common::db::Role;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Caller identity, resolved from the live user record on every request
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

/// Roles admitted to a route group
#[derive(Debug, Clone, Copy)]
pub struct RoleSet {
    name: &'static str,
    roles: &'static [Role],
}

impl RoleSet {
    pub const ADMIN: RoleSet = RoleSet {
        name: "admin",
        roles: &[Role::Admin],
    };
    pub const CHAIR: RoleSet = RoleSet {
        name: "chair",
        roles: &[Role::Chair, Role::Admin],
    };
    pub const REVIEWER: RoleSet = RoleSet {
        name: "reviewer",
        roles: &[Role::Reviewer, Role::Admin, Role::Chair],
    };
    pub const AUTHENTICATED: RoleSet = RoleSet {
        name: "authenticated",
        roles: &Role::ALL,
    };

    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Resource-scoped operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateConference,
    DeleteConference,
    ViewConferenceSubmissions,
    AssignReviewer,
    DecideSubmission,
    ViewSubmissionReviews,
    ForceSubmissionStatus,
    CompleteReview,
}

/// Owner fields of the resource being acted on
#[derive(Debug, Clone, Copy)]
pub enum Resource {
    /// A conference, or anything scoped to one (its submissions)
    Conference { owner: Uuid },
    /// A review assignment
    Review { reviewer: Uuid },
}

/// Who may perform an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// The conference's creator, or any Admin
    ConferenceOwnerOrAdmin,
    /// Admins only
    AdminOnly,
    /// The assigned reviewer only; no override
    AssignedReviewer,
}

/// The policy table
fn rule_for(action: Action) -> Rule {
    match action {
        Action::UpdateConference
        | Action::DeleteConference
        | Action::ViewConferenceSubmissions
        | Action::AssignReviewer
        | Action::DecideSubmission
        | Action::ViewSubmissionReviews => Rule::ConferenceOwnerOrAdmin,
        Action::ForceSubmissionStatus => Rule::AdminOnly,
        Action::CompleteReview => Rule::AssignedReviewer,
    }
}

/// Evaluate the ownership gate
pub fn can_act(identity: &Identity, action: Action, resource: Resource) -> bool {
    match (rule_for(action), resource) {
        (Rule::ConferenceOwnerOrAdmin, Resource::Conference { owner }) => {
            identity.role == Role::Admin || identity.user_id == owner
        }
        (Rule::AdminOnly, _) => identity.role == Role::Admin,
        (Rule::AssignedReviewer, Resource::Review { reviewer }) => identity.user_id == reviewer,
        // Action applied to the wrong kind of resource
        _ => false,
    }
}

/// [`can_act`] as a handler guard: `Forbidden` on denial
pub fn authorize(identity: &Identity, action: Action, resource: Resource) -> ApiResult<()> {
    if can_act(identity, action, resource) {
        Ok(())
    } else {
        warn!(
            user_id = %identity.user_id,
            role = %identity.role,
            ?action,
            "Ownership check denied"
        );
        Err(ApiError::Forbidden(format!(
            "Not permitted to {} this resource",
            describe(action)
        )))
    }
}

fn describe(action: Action) -> &'static str {
    match action {
        Action::UpdateConference => "update",
        Action::DeleteConference => "delete",
        Action::ViewConferenceSubmissions | Action::ViewSubmissionReviews => "view",
        Action::AssignReviewer => "assign reviewers to",
        Action::DecideSubmission | Action::ForceSubmissionStatus => "change the status of",
        Action::CompleteReview => "complete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn test_role_sets() {
        assert!(RoleSet::CHAIR.allows(Role::Chair));
        assert!(RoleSet::CHAIR.allows(Role::Admin));
        assert!(!RoleSet::CHAIR.allows(Role::Reviewer));

        assert!(RoleSet::REVIEWER.allows(Role::Chair));
        assert!(!RoleSet::REVIEWER.allows(Role::Author));

        assert!(RoleSet::ADMIN.allows(Role::Admin));
        assert!(!RoleSet::ADMIN.allows(Role::Chair));

        for role in Role::ALL {
            assert!(RoleSet::AUTHENTICATED.allows(role));
        }
    }

    #[test]
    fn test_owner_chair_may_decide() {
        let chair = identity(Role::Chair);
        let resource = Resource::Conference { owner: chair.user_id };
        assert!(can_act(&chair, Action::DecideSubmission, resource));
        assert!(can_act(&chair, Action::AssignReviewer, resource));
    }

    #[test]
    fn test_other_chair_denied_despite_role() {
        let owner = identity(Role::Chair);
        let other = identity(Role::Chair);
        let resource = Resource::Conference { owner: owner.user_id };

        for action in [
            Action::UpdateConference,
            Action::DeleteConference,
            Action::ViewConferenceSubmissions,
            Action::AssignReviewer,
            Action::DecideSubmission,
            Action::ViewSubmissionReviews,
        ] {
            assert!(!can_act(&other, action, resource), "{:?}", action);
        }
        assert!(matches!(
            authorize(&other, Action::DecideSubmission, resource),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_overrides_conference_ownership() {
        let admin = identity(Role::Admin);
        let resource = Resource::Conference { owner: Uuid::new_v4() };
        assert!(can_act(&admin, Action::DecideSubmission, resource));
        assert!(can_act(&admin, Action::ForceSubmissionStatus, resource));
    }

    #[test]
    fn test_force_status_is_admin_only() {
        let chair = identity(Role::Chair);
        let resource = Resource::Conference { owner: chair.user_id };
        assert!(!can_act(&chair, Action::ForceSubmissionStatus, resource));
    }

    #[test]
    fn test_only_assigned_reviewer_completes() {
        let reviewer = identity(Role::Reviewer);
        let admin = identity(Role::Admin);
        let resource = Resource::Review { reviewer: reviewer.user_id };

        assert!(can_act(&reviewer, Action::CompleteReview, resource));
        // No admin override for scoring
        assert!(!can_act(&admin, Action::CompleteReview, resource));
    }

    #[test]
    fn test_mismatched_resource_denied() {
        let admin = identity(Role::Admin);
        assert!(!can_act(
            &admin,
            Action::DecideSubmission,
            Resource::Review { reviewer: admin.user_id }
        ));
        assert!(!can_act(
            &admin,
            Action::CompleteReview,
            Resource::Conference { owner: admin.user_id }
        ));
    }
}
