//! Organization-scoped project policy.
//!
//! Decisions fail closed: any membership lookup error counts as "not a member".
//! Membership is re-read on every check and never cached.

use crate::auth::Actor;
use crate::catalog::MembershipStore;
use std::sync::Arc;
use uuid::Uuid;

/// Capability being checked against an organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Access,
    Create,
    Update,
}

#[derive(Clone)]
pub struct ProjectPolicy {
    members: Arc<dyn MembershipStore>,
}

impl ProjectPolicy {
    pub fn new(members: Arc<dyn MembershipStore>) -> Self {
        ProjectPolicy { members }
    }

    pub async fn can_access(&self, organization_uuid: Uuid, actor: &Actor) -> bool {
        self.is_member(organization_uuid, actor).await
    }

    pub async fn can_create(&self, organization_uuid: Uuid, actor: &Actor) -> bool {
        actor.is_developer_or_more() && self.is_member(organization_uuid, actor).await
    }

    pub async fn can_update(&self, organization_uuid: Uuid, actor: &Actor) -> bool {
        actor.is_developer_or_more() && self.is_member(organization_uuid, actor).await
    }

    pub async fn allows(&self, action: Action, organization_uuid: Uuid, actor: &Actor) -> bool {
        match action {
            Action::Access => self.can_access(organization_uuid, actor).await,
            Action::Create => self.can_create(organization_uuid, actor).await,
            Action::Update => self.can_update(organization_uuid, actor).await,
        }
    }

    async fn is_member(&self, organization_uuid: Uuid, actor: &Actor) -> bool {
        match self.members.is_organization_member(organization_uuid, actor.uuid).await {
            Ok(is_member) => is_member,
            Err(error) => {
                tracing::debug!(%organization_uuid, user = %actor.uuid, %error, "membership lookup failed, denying");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::catalog::MockMembershipStore;
    use crate::error::AppError;
    use mockall::predicate::eq;

    fn policy_with(result: fn() -> Result<bool, AppError>, times: usize) -> ProjectPolicy {
        let mut members = MockMembershipStore::new();
        members
            .expect_is_organization_member()
            .times(times)
            .returning(move |_, _| result());
        ProjectPolicy::new(Arc::new(members))
    }

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    #[tokio::test]
    async fn access_follows_membership_only() {
        let org = Uuid::new_v4();

        assert!(policy_with(|| Ok(true), 1).can_access(org, &actor(Role::Viewer)).await);
        assert!(!policy_with(|| Ok(false), 1).can_access(org, &actor(Role::Owner)).await);
    }

    #[tokio::test]
    async fn lookup_errors_deny_every_action() {
        let org = Uuid::new_v4();
        let owner = actor(Role::Owner);
        let failing = policy_with(|| Err(AppError::NotFound("organization.error.notFound")), 3);

        assert!(!failing.can_access(org, &owner).await);
        assert!(!failing.can_create(org, &owner).await);
        assert!(!failing.can_update(org, &owner).await);
    }

    #[tokio::test]
    async fn create_and_update_need_developer_role_and_membership() {
        let org = Uuid::new_v4();
        let developer = actor(Role::Developer);

        let member = policy_with(|| Ok(true), 2);
        assert!(member.can_create(org, &developer).await);
        assert!(member.can_update(org, &developer).await);

        let outsider = policy_with(|| Ok(false), 2);
        assert!(!outsider.can_create(org, &developer).await);
        assert!(!outsider.can_update(org, &developer).await);
    }

    #[tokio::test]
    async fn viewer_is_denied_create_without_membership_lookup() {
        let org = Uuid::new_v4();
        let policy = policy_with(|| Ok(true), 0);

        assert!(!policy.can_create(org, &actor(Role::Viewer)).await);
        assert!(!policy.can_update(org, &actor(Role::Viewer)).await);
    }

    #[tokio::test]
    async fn membership_is_queried_for_the_given_org_and_actor() {
        let org = Uuid::new_v4();
        let who = actor(Role::Admin);
        let mut members = MockMembershipStore::new();
        members
            .expect_is_organization_member()
            .with(eq(org), eq(who.uuid))
            .times(1)
            .returning(|_, _| Ok(true));
        let policy = ProjectPolicy::new(Arc::new(members));

        assert!(policy.allows(Action::Update, org, &who).await);
    }
}
