use std::sync::Arc;

use axum::extract::FromRef;
use tracing::debug;

use agrocoop_core::{
    permissions::{Permission, PermissionTable, RoleRecord},
    workspace::WorkspaceStore,
};

use crate::{AppError, state::AppState};

/// Resolves a caller's role inside a workspace and checks it against the
/// permissions an operation requires.
pub struct AccessService {
    workspace_store: WorkspaceStore,
    permissions: Arc<PermissionTable>,
}

impl AccessService {
    pub fn new(workspace_store: WorkspaceStore, permissions: Arc<PermissionTable>) -> Self {
        Self {
            workspace_store,
            permissions,
        }
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    /// Fails `NOT_FOUND` when the caller has no membership, or when the
    /// stored role id is absent from the permission table.
    pub async fn resolve_role(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<RoleRecord, AppError> {
        let role_id = self
            .workspace_store
            .find_member_role(workspace_id, user_id)
            .await
            .map_err(AppError::from_anyhow)?;

        let Some(role_id) = role_id else {
            let workspace_exists = self
                .workspace_store
                .find_by_id(workspace_id)
                .await
                .map_err(AppError::from_anyhow)?
                .is_some();
            return Err(if workspace_exists {
                AppError::member_not_found(workspace_id, user_id)
            } else {
                AppError::workspace_not_found(workspace_id)
            });
        };

        self.permissions
            .find(&role_id)
            .cloned()
            .ok_or_else(|| AppError::role_not_found(&role_id))
    }

    pub async fn authorize(
        &self,
        user_id: &str,
        workspace_id: &str,
        required: &[Permission],
    ) -> Result<RoleRecord, AppError> {
        let role = self.resolve_role(user_id, workspace_id).await?;
        role_guard(&role, required)?;
        Ok(role)
    }
}

/// Succeeds when `role` holds any of `required`; an empty list never does.
pub(crate) fn role_guard(role: &RoleRecord, required: &[Permission]) -> Result<(), AppError> {
    if role.grants_any(required) {
        return Ok(());
    }
    debug!(role = role.name.as_str(), ?required, "permission check failed");
    Err(AppError::permission_denied())
}

impl FromRef<AppState> for Arc<AccessService> {
    fn from_ref(state: &AppState) -> Arc<AccessService> {
        state.access_service.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrocoop_core::{ids::UserId, permissions::RoleName};
    use axum::http::StatusCode;

    use crate::test_support::setup_state;

    #[test]
    fn guard_matches_permission_table() {
        let table = PermissionTable::standard();
        for role in table.roles() {
            for permission in Permission::ALL {
                let outcome = role_guard(role, &[permission]);
                assert_eq!(outcome.is_ok(), role.has(permission));
            }
            let err = role_guard(role, &[]).expect_err("empty requirement fails closed");
            assert_eq!(err.status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn guard_accepts_any_of_required() {
        let table = PermissionTable::standard();
        let member = table.by_name(RoleName::Member).expect("member role");
        assert!(role_guard(member, &[Permission::DeleteTask, Permission::EditTask]).is_ok());
        let err = role_guard(member, &[Permission::DeleteTask]).expect_err("forbidden");
        assert_eq!(err.name(), "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn resolver_reports_missing_membership_as_not_found() {
        let (_dir, _database, state) = setup_state().await;
        let owner = UserId::from("owner-1");
        let workspace = state
            .workspace_store
            .create(&owner, "Coop", None)
            .await
            .expect("workspace");

        let role = state
            .access_service
            .resolve_role(&owner, &workspace.id)
            .await
            .expect("owner role");
        assert_eq!(role.name, RoleName::Owner);

        let err = state
            .access_service
            .authorize("stranger", &workspace.id, &[Permission::ViewOnly])
            .await
            .expect_err("not a member");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "MEMBER_NOT_FOUND");

        let err = state
            .access_service
            .resolve_role(&owner, "missing-workspace")
            .await
            .expect_err("no workspace");
        assert_eq!(err.name(), "WORKSPACE_NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_stored_role_is_not_found() {
        let (_dir, database, state) = setup_state().await;
        let owner = UserId::from("owner-1");
        let workspace = state
            .workspace_store
            .create(&owner, "Coop", None)
            .await
            .expect("workspace");
        sqlx::query("UPDATE workspace_members SET role_id = 'treasurer' WHERE user_id = ?")
            .bind(owner.as_str())
            .execute(database.pool())
            .await
            .expect("corrupt role");

        let err = state
            .access_service
            .authorize(&owner, &workspace.id, &[Permission::ViewOnly])
            .await
            .expect_err("unknown role");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "ROLE_NOT_FOUND");
    }
}
