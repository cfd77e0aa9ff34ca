//! Static role → capability table.
//!
//! Roles are reference data: the table is built once at startup and shared
//! read-only. Membership rows only store a [`RoleId`]; resolving it against
//! this table yields the capability set checked by the role guard.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::RoleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CreateWorkspace,
    DeleteWorkspace,
    EditWorkspace,
    ManageWorkspaceSettings,
    AddMember,
    ChangeMemberRole,
    RemoveMember,
    CreateProject,
    EditProject,
    DeleteProject,
    CreateTask,
    EditTask,
    DeleteTask,
    CreateFarmer,
    EditFarmer,
    DeleteFarmer,
    UploadDocument,
    DeleteDocument,
    ViewOnly,
}

impl Permission {
    pub const ALL: [Permission; 19] = [
        Permission::CreateWorkspace,
        Permission::DeleteWorkspace,
        Permission::EditWorkspace,
        Permission::ManageWorkspaceSettings,
        Permission::AddMember,
        Permission::ChangeMemberRole,
        Permission::RemoveMember,
        Permission::CreateProject,
        Permission::EditProject,
        Permission::DeleteProject,
        Permission::CreateTask,
        Permission::EditTask,
        Permission::DeleteTask,
        Permission::CreateFarmer,
        Permission::EditFarmer,
        Permission::DeleteFarmer,
        Permission::UploadDocument,
        Permission::DeleteDocument,
        Permission::ViewOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateWorkspace => "CREATE_WORKSPACE",
            Self::DeleteWorkspace => "DELETE_WORKSPACE",
            Self::EditWorkspace => "EDIT_WORKSPACE",
            Self::ManageWorkspaceSettings => "MANAGE_WORKSPACE_SETTINGS",
            Self::AddMember => "ADD_MEMBER",
            Self::ChangeMemberRole => "CHANGE_MEMBER_ROLE",
            Self::RemoveMember => "REMOVE_MEMBER",
            Self::CreateProject => "CREATE_PROJECT",
            Self::EditProject => "EDIT_PROJECT",
            Self::DeleteProject => "DELETE_PROJECT",
            Self::CreateTask => "CREATE_TASK",
            Self::EditTask => "EDIT_TASK",
            Self::DeleteTask => "DELETE_TASK",
            Self::CreateFarmer => "CREATE_FARMER",
            Self::EditFarmer => "EDIT_FARMER",
            Self::DeleteFarmer => "DELETE_FARMER",
            Self::UploadDocument => "UPLOAD_DOCUMENT",
            Self::DeleteDocument => "DELETE_DOCUMENT",
            Self::ViewOnly => "VIEW_ONLY",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    Owner,
    Admin,
    Member,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    /// Stable identifier persisted on membership rows.
    pub fn role_id(&self) -> RoleId {
        RoleId::from(self.as_str().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: RoleName,
    pub permissions: BTreeSet<Permission>,
}

impl RoleRecord {
    pub fn new(name: RoleName, permissions: &[Permission]) -> Self {
        Self {
            id: name.role_id(),
            name,
            permissions: permissions.iter().copied().collect(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// True when at least one of `required` is granted. An empty requirement
    /// is never satisfied.
    pub fn grants_any(&self, required: &[Permission]) -> bool {
        required.iter().any(|permission| self.has(*permission))
    }
}

#[derive(Debug, Clone)]
pub struct PermissionTable {
    roles: Vec<RoleRecord>,
}

impl PermissionTable {
    pub fn new(roles: Vec<RoleRecord>) -> Self {
        Self { roles }
    }

    /// The cooperative role model: owners hold every capability, admins
    /// everything except deleting the workspace, members run day-to-day
    /// loan and farmer work.
    pub fn standard() -> Self {
        let owner = RoleRecord::new(RoleName::Owner, &Permission::ALL);

        let admin_permissions: Vec<Permission> = Permission::ALL
            .into_iter()
            .filter(|permission| *permission != Permission::DeleteWorkspace)
            .collect();
        let admin = RoleRecord::new(RoleName::Admin, &admin_permissions);

        let member = RoleRecord::new(
            RoleName::Member,
            &[
                Permission::CreateTask,
                Permission::EditTask,
                Permission::CreateFarmer,
                Permission::EditFarmer,
                Permission::UploadDocument,
                Permission::ViewOnly,
            ],
        );

        Self::new(vec![owner, admin, member])
    }

    pub fn roles(&self) -> &[RoleRecord] {
        &self.roles
    }

    pub fn find(&self, role_id: &str) -> Option<&RoleRecord> {
        let normalized = role_id.trim();
        self.roles
            .iter()
            .find(|role| role.id.eq_ignore_ascii_case(normalized))
    }

    pub fn by_name(&self, name: RoleName) -> Option<&RoleRecord> {
        self.roles.iter().find(|role| role.name == name)
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn standard_table_resolves_by_id_and_name() {
        let table = PermissionTable::standard();
        let owner = table.find("owner").expect("owner role");
        assert_eq!(owner.name, RoleName::Owner);
        assert_eq!(table.find(" ADMIN ").map(|role| role.name), Some(RoleName::Admin));
        assert!(table.find("superuser").is_none());
        assert_eq!(
            table.by_name(RoleName::Member).map(|role| role.id.clone()),
            Some(RoleId::from("member"))
        );
    }

    #[test]
    fn only_owner_can_delete_workspace() {
        let table = PermissionTable::standard();
        let holders: Vec<RoleName> = table
            .roles()
            .iter()
            .filter(|role| role.has(Permission::DeleteWorkspace))
            .map(|role| role.name)
            .collect();
        assert_eq!(holders, vec![RoleName::Owner]);
    }

    #[test]
    fn member_cannot_manage_membership() {
        let table = PermissionTable::standard();
        let member = table.by_name(RoleName::Member).expect("member role");
        assert!(!member.grants_any(&[Permission::ChangeMemberRole]));
        assert!(!member.grants_any(&[Permission::DeleteTask]));
        assert!(member.grants_any(&[Permission::ViewOnly]));
    }

    #[test]
    fn empty_requirement_is_never_granted() {
        let table = PermissionTable::standard();
        let owner = table.by_name(RoleName::Owner).expect("owner role");
        assert!(!owner.grants_any(&[]));
    }

    fn permission_subset() -> impl Strategy<Value = Vec<Permission>> {
        proptest::sample::subsequence(Permission::ALL.to_vec(), 0..=Permission::ALL.len())
    }

    proptest! {
        #[test]
        fn grants_any_matches_set_intersection(
            role_perms in permission_subset(),
            required in permission_subset(),
        ) {
            let role = RoleRecord::new(RoleName::Member, &role_perms);
            let intersects = required.iter().any(|permission| role_perms.contains(permission));
            prop_assert_eq!(role.grants_any(&required), intersects);
        }
    }
}
