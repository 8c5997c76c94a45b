//! Role and tenant authorization.
//!
//! Every gated operation goes through [`authorize`], which takes the acting
//! profile and an [`Action`] carrying its target.

use std::fmt;

use uuid::Uuid;

use crate::models::{Member, Role};

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub profile_id: Uuid,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub organization: Option<String>,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub external_uuid: Option<String>,
    pub cell_phone: Option<String>,
}

/// The profile an action is aimed at.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub profile_id: Uuid,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub organization: Option<&'a str>,
}

impl<'a> From<&'a Member> for Subject<'a> {
    fn from(member: &'a Member) -> Self {
        Subject {
            profile_id: member.id,
            role: member.role,
            team_id: member.team_id,
            organization: member.alma_internal_organization.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    AccessAdminPanel,
    RefreshCaches,
    ViewAlmaUuid,
    /// Read data scoped to an organization.
    ViewTenant { organization: Option<&'a str> },
    ManageApiKeys { organization: Option<&'a str> },
    ManageTeams { organization: Option<&'a str> },
    ViewTeam { team_id: Uuid, organization: Option<&'a str> },
    CreateUser { organization: Option<&'a str>, role: Role },
    ManageUser(Subject<'a>),
    ChangeRole { subject: Subject<'a>, new_role: Role },
    ViewAgent(Subject<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied(&'static str);

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for Denied {}

/// Which organizations a list query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    All,
    Only(String),
    /// A non-admin without an organization sees no tenant-scoped rows.
    Nothing,
}

impl TenantScope {
    /// `None` when the scope matches nothing; otherwise the organization to
    /// bind as the SQL filter (`Some(None)` is unfiltered).
    pub fn organization_filter(&self) -> Option<Option<&str>> {
        match self {
            TenantScope::All => Some(None),
            TenantScope::Only(org) => Some(Some(org)),
            TenantScope::Nothing => None,
        }
    }
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_director(&self) -> bool {
        self.role == Role::Director
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn tenant_scope(&self) -> TenantScope {
        if self.is_admin() {
            return TenantScope::All;
        }
        match self.organization.as_deref() {
            Some(org) if !org.is_empty() => TenantScope::Only(org.to_string()),
            _ => TenantScope::Nothing,
        }
    }

    /// Whether this actor may see rows belonging to `organization`.
    pub fn in_tenant(&self, organization: Option<&str>) -> bool {
        if self.is_admin() {
            return true;
        }
        match (self.organization.as_deref(), organization) {
            (Some(mine), Some(theirs)) => !mine.is_empty() && mine == theirs,
            _ => false,
        }
    }

    pub fn can_manage_user(&self, target: &Subject<'_>) -> bool {
        match self.role {
            Role::Admin | Role::Director => true,
            Role::Manager => {
                self.team_id.is_some()
                    && self.team_id == target.team_id
                    && target.role.is_director_assignable()
            }
            Role::User => false,
        }
    }

    pub fn can_change_role(&self, target: &Subject<'_>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Director => target.role.is_director_assignable(),
            _ => false,
        }
    }

    pub fn can_assign_role(&self, target: &Subject<'_>, new_role: Role) -> bool {
        self.can_change_role(target)
            && (self.is_admin() || new_role.is_director_assignable())
    }

    pub fn can(&self, action: Action<'_>) -> bool {
        authorize(self, action).is_ok()
    }

    pub fn require(&self, action: Action<'_>) -> Result<(), Denied> {
        authorize(self, action)
    }
}

pub fn authorize(actor: &Actor, action: Action<'_>) -> Result<(), Denied> {
    match action {
        Action::AccessAdminPanel | Action::RefreshCaches => {
            allow_if(actor.is_admin(), "This page is only accessible to administrators.")
        }
        Action::ViewAlmaUuid => {
            allow_if(actor.is_admin(), "Only administrators can view internal identifiers.")
        }
        Action::ViewTenant { organization } => allow_if(
            actor.in_tenant(organization),
            "You can only access data from your own organization.",
        ),
        Action::ManageApiKeys { organization } => {
            allow_if(
                actor.is_admin() || actor.is_director(),
                "This page is only accessible to directors and administrators.",
            )?;
            allow_if(
                actor.in_tenant(organization),
                "You can only manage API keys of your own organization.",
            )
        }
        Action::ManageTeams { organization } => {
            allow_if(
                actor.is_admin() || actor.is_director(),
                "Only directors and administrators can manage teams.",
            )?;
            allow_if(
                actor.in_tenant(organization),
                "You can only manage teams of your own organization.",
            )
        }
        Action::ViewTeam { team_id, organization } => {
            allow_if(
                actor.in_tenant(organization),
                "You can only view teams of your own organization.",
            )?;
            allow_if(
                actor.is_admin() || actor.is_director() || actor.team_id == Some(team_id),
                "You can only view your own team.",
            )
        }
        Action::CreateUser { organization, role } => {
            allow_if(
                actor.is_admin() || actor.is_director(),
                "Only directors and administrators can create users.",
            )?;
            allow_if(
                actor.in_tenant(organization),
                "You can only create users in your own organization.",
            )?;
            allow_if(
                actor.is_admin() || role.is_director_assignable(),
                "Directors can only create users with the User or Manager role.",
            )
        }
        Action::ManageUser(subject) => {
            if subject.profile_id == actor.profile_id {
                return Ok(());
            }
            allow_if(
                actor.in_tenant(subject.organization),
                "You can only manage users of your own organization.",
            )?;
            allow_if(
                actor.can_manage_user(&subject),
                "You don't have permission to manage this user.",
            )
        }
        Action::ChangeRole { subject, new_role } => {
            if subject.role == new_role {
                return Ok(());
            }
            allow_if(
                actor.in_tenant(subject.organization),
                "You can only manage users of your own organization.",
            )?;
            allow_if(
                actor.can_assign_role(&subject, new_role),
                "You don't have permission to set this role.",
            )
        }
        Action::ViewAgent(subject) => {
            if subject.profile_id == actor.profile_id {
                return Ok(());
            }
            allow_if(
                actor.in_tenant(subject.organization),
                "You can only view agents of your own organization.",
            )?;
            allow_if(
                actor.is_admin()
                    || actor.is_director()
                    || (actor.is_manager()
                        && actor.team_id.is_some()
                        && actor.team_id == subject.team_id),
                "You can only view agents of your own team.",
            )
        }
    }
}

fn allow_if(condition: bool, reason: &'static str) -> Result<(), Denied> {
    if condition { Ok(()) } else { Err(Denied(reason)) }
}

/// Which profiles appear in member lists for this actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Everyone,
    Tenant(String),
    Team(Uuid),
    OnlySelf(Uuid),
}

pub fn visible_members(actor: &Actor) -> Visibility {
    match actor.role {
        Role::Admin => Visibility::Everyone,
        Role::Director => match actor.tenant_scope() {
            TenantScope::Only(org) => Visibility::Tenant(org),
            _ => Visibility::OnlySelf(actor.profile_id),
        },
        Role::Manager => match actor.team_id {
            Some(team) => Visibility::Team(team),
            None => Visibility::OnlySelf(actor.profile_id),
        },
        Role::User => Visibility::OnlySelf(actor.profile_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG: &str = "0b6f8d4c-org-a";
    const OTHER_ORG: &str = "7c1e22aa-org-b";

    fn actor(role: Role, team_id: Option<Uuid>, organization: Option<&str>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            role,
            team_id,
            organization: organization.map(str::to_string),
            username: "actor".to_string(),
            display_name: "Actor".to_string(),
            email: "actor@example.com".to_string(),
            external_uuid: None,
            cell_phone: None,
        }
    }

    fn subject(role: Role, team_id: Option<Uuid>, organization: Option<&str>) -> Subject<'_> {
        Subject {
            profile_id: Uuid::new_v4(),
            role,
            team_id,
            organization,
        }
    }

    #[test]
    fn admin_and_director_manage_anyone() {
        let team = Some(Uuid::new_v4());
        for role in [Role::Admin, Role::Director] {
            let a = actor(role, None, Some(ORG));
            for target_role in Role::ALL {
                assert!(a.can_manage_user(&subject(target_role, team, Some(ORG))));
            }
        }
    }

    #[test]
    fn manager_manages_only_own_team_users_and_managers() {
        let team = Some(Uuid::new_v4());
        let other_team = Some(Uuid::new_v4());
        let manager = actor(Role::Manager, team, Some(ORG));

        for target_role in Role::ALL {
            for target_team in [team, other_team, None] {
                let expected = target_team == team && target_role.is_director_assignable();
                assert_eq!(
                    manager.can_manage_user(&subject(target_role, target_team, Some(ORG))),
                    expected,
                    "role={target_role} same_team={}",
                    target_team == team
                );
            }
        }
    }

    #[test]
    fn manager_without_team_manages_nobody() {
        let manager = actor(Role::Manager, None, Some(ORG));
        assert!(!manager.can_manage_user(&subject(Role::User, None, Some(ORG))));
    }

    #[test]
    fn plain_user_manages_nobody() {
        let team = Some(Uuid::new_v4());
        let user = actor(Role::User, team, Some(ORG));
        assert!(!user.can_manage_user(&subject(Role::User, team, Some(ORG))));
    }

    #[test]
    fn director_cannot_grant_director_or_admin() {
        let director = actor(Role::Director, None, Some(ORG));
        let target = subject(Role::User, None, Some(ORG));

        assert!(director.can_assign_role(&target, Role::Manager));
        assert!(!director.can_assign_role(&target, Role::Director));
        assert!(!director.can_assign_role(&target, Role::Admin));

        let denied = authorize(
            &director,
            Action::ChangeRole { subject: target, new_role: Role::Admin },
        );
        assert!(denied.is_err());
    }

    #[test]
    fn director_cannot_touch_other_directors_roles() {
        let director = actor(Role::Director, None, Some(ORG));
        let peer = subject(Role::Director, None, Some(ORG));
        assert!(!director.can_change_role(&peer));
        assert!(!director.can_assign_role(&peer, Role::User));
        assert!(!director.can_change_role(&subject(Role::Admin, None, Some(ORG))));
    }

    #[test]
    fn admin_changes_any_role() {
        let admin = actor(Role::Admin, None, None);
        for from in Role::ALL {
            for to in Role::ALL {
                assert!(admin.can_assign_role(&subject(from, None, Some(OTHER_ORG)), to));
            }
        }
    }

    #[test]
    fn managers_and_users_cannot_change_roles() {
        for role in [Role::Manager, Role::User] {
            let a = actor(role, Some(Uuid::new_v4()), Some(ORG));
            assert!(!a.can_change_role(&subject(Role::User, a.team_id, Some(ORG))));
        }
    }

    #[test]
    fn unchanged_role_is_not_a_role_change() {
        let manager = actor(Role::Manager, Some(Uuid::new_v4()), Some(ORG));
        let target = subject(Role::User, manager.team_id, Some(ORG));
        assert!(manager.can(Action::ChangeRole { subject: target, new_role: Role::User }));
        assert!(!manager.can(Action::ChangeRole { subject: target, new_role: Role::Manager }));
    }

    #[test]
    fn tenant_boundary_applies_to_non_admins() {
        let director = actor(Role::Director, None, Some(ORG));
        let foreign = subject(Role::User, None, Some(OTHER_ORG));
        assert!(director.can_manage_user(&foreign));
        assert!(!director.can(Action::ManageUser(foreign)));

        let admin = actor(Role::Admin, None, None);
        assert!(admin.can(Action::ManageUser(foreign)));
        assert!(admin.can(Action::ViewTenant { organization: Some(OTHER_ORG) }));
    }

    #[test]
    fn actor_without_organization_sees_no_tenant_data() {
        let director = actor(Role::Director, None, None);
        assert_eq!(director.tenant_scope(), TenantScope::Nothing);
        assert!(!director.can(Action::ViewTenant { organization: None }));
        assert!(!director.can(Action::ViewTenant { organization: Some(ORG) }));
    }

    #[test]
    fn api_keys_need_director_or_admin() {
        let manager = actor(Role::Manager, None, Some(ORG));
        let director = actor(Role::Director, None, Some(ORG));
        assert!(!manager.can(Action::ManageApiKeys { organization: Some(ORG) }));
        assert!(director.can(Action::ManageApiKeys { organization: Some(ORG) }));
        assert!(!director.can(Action::ManageApiKeys { organization: Some(OTHER_ORG) }));
    }

    #[test]
    fn director_creates_only_users_and_managers() {
        let director = actor(Role::Director, None, Some(ORG));
        assert!(director.can(Action::CreateUser { organization: Some(ORG), role: Role::Manager }));
        assert!(!director.can(Action::CreateUser {
            organization: Some(ORG),
            role: Role::Director
        }));
        assert!(!director.can(Action::CreateUser {
            organization: Some(OTHER_ORG),
            role: Role::User
        }));
    }

    #[test]
    fn admin_panel_is_admin_only() {
        for role in [Role::User, Role::Manager, Role::Director] {
            assert!(!actor(role, None, Some(ORG)).can(Action::AccessAdminPanel));
        }
        assert!(actor(Role::Admin, None, None).can(Action::AccessAdminPanel));
    }

    #[test]
    fn everyone_manages_their_own_profile() {
        let user = actor(Role::User, None, Some(ORG));
        let me = Subject {
            profile_id: user.profile_id,
            role: user.role,
            team_id: None,
            organization: Some(ORG),
        };
        assert!(user.can(Action::ManageUser(me)));
        assert!(user.can(Action::ViewAgent(me)));
    }

    #[test]
    fn visibility_by_role() {
        let team = Uuid::new_v4();
        assert_eq!(visible_members(&actor(Role::Admin, None, None)), Visibility::Everyone);
        assert_eq!(
            visible_members(&actor(Role::Director, None, Some(ORG))),
            Visibility::Tenant(ORG.to_string())
        );
        assert_eq!(
            visible_members(&actor(Role::Manager, Some(team), Some(ORG))),
            Visibility::Team(team)
        );
        let user = actor(Role::User, Some(team), Some(ORG));
        assert_eq!(visible_members(&user), Visibility::OnlySelf(user.profile_id));
    }
}
