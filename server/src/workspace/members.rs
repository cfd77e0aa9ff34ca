use tracing::info;

use agrocoop_core::{
    ids::{UserId, WorkspaceId},
    permissions::{Permission, RoleName, RoleRecord},
    workspace::WorkspaceRecord,
    workspace_member::WorkspaceMemberRecord,
};

use crate::{AppError, AppState};

pub async fn add_member(
    state: &AppState,
    actor_id: &str,
    workspace_id: &str,
    target_user_id: &str,
    role_id: Option<&str>,
) -> Result<WorkspaceMemberRecord, AppError> {
    state
        .access_service
        .authorize(actor_id, workspace_id, &[Permission::AddMember])
        .await?;
    state.workspace_service.fetch_workspace(workspace_id).await?;

    let role = assignable_role(state, role_id.unwrap_or(RoleName::Member.as_str()))?;
    let member = state
        .workspace_store
        .add_member(
            &WorkspaceId::from(workspace_id),
            &UserId::from(target_user_id.trim()),
            &role.id,
        )
        .await
        .map_err(|err| {
            AppError::conflict_or_internal(err, "User is already a member of this workspace.")
        })?;

    info!(
        workspace_id,
        user_id = %member.user_id,
        role = role.name.as_str(),
        "member added"
    );
    Ok(member)
}

pub async fn change_member_role(
    state: &AppState,
    actor_id: &str,
    workspace_id: &str,
    member_id: &str,
    role_id: &str,
) -> Result<WorkspaceMemberRecord, AppError> {
    state
        .access_service
        .authorize(actor_id, workspace_id, &[Permission::ChangeMemberRole])
        .await?;
    let workspace = state.workspace_service.fetch_workspace(workspace_id).await?;
    ensure_not_owner(&workspace, member_id, "the workspace owner's role cannot be changed")?;

    let role = assignable_role(state, role_id)?;
    let member = state
        .workspace_store
        .change_member_role(workspace_id, member_id, &role.id)
        .await
        .map_err(AppError::from_anyhow)?
        .ok_or_else(|| AppError::member_not_found(workspace_id, member_id))?;

    info!(workspace_id, member_id, role = role.name.as_str(), "member role changed");
    Ok(member)
}

pub async fn remove_member(
    state: &AppState,
    actor_id: &str,
    workspace_id: &str,
    target_user_id: &str,
) -> Result<(), AppError> {
    state
        .access_service
        .authorize(actor_id, workspace_id, &[Permission::RemoveMember])
        .await?;
    let workspace = state.workspace_service.fetch_workspace(workspace_id).await?;
    ensure_not_owner(&workspace, target_user_id, "the workspace owner cannot be removed")?;

    let removed = state
        .workspace_store
        .remove_member(workspace_id, target_user_id)
        .await
        .map_err(AppError::from_anyhow)?;
    if !removed {
        return Err(AppError::member_not_found(workspace_id, target_user_id));
    }

    info!(workspace_id, user_id = target_user_id, "member removed");
    Ok(())
}

/// Ownership is fixed at creation, so the owner role is never handed out.
fn assignable_role(state: &AppState, role_id: &str) -> Result<RoleRecord, AppError> {
    let role = state
        .permissions
        .find(role_id)
        .cloned()
        .ok_or_else(|| AppError::role_not_found(role_id))?;
    if role.name == RoleName::Owner {
        return Err(AppError::bad_request("the owner role cannot be assigned"));
    }
    Ok(role)
}

fn ensure_not_owner(
    workspace: &WorkspaceRecord,
    user_id: &str,
    error_message: &'static str,
) -> Result<(), AppError> {
    if workspace.owner_id.as_str() == user_id.trim() {
        Err(AppError::forbidden(error_message))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::test_support::{seed_member, setup_state};

    async fn seeded() -> (tempfile::TempDir, AppState, String) {
        let (dir, _database, state) = setup_state().await;
        let workspace = state
            .workspace_service
            .create_workspace("owner-1", "Coop", None)
            .await
            .expect("workspace");
        (dir, state, workspace.id.into_inner())
    }

    #[tokio::test]
    async fn adding_existing_member_conflicts() {
        let (_dir, state, workspace_id) = seeded().await;

        let member = add_member(&state, "owner-1", &workspace_id, "officer-1", None)
            .await
            .expect("add officer");
        assert_eq!(member.role_id.as_str(), "member");

        let err = add_member(&state, "owner-1", &workspace_id, "officer-1", None)
            .await
            .expect_err("duplicate");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let (_dir, state, workspace_id) = seeded().await;
        seed_member(&state, &workspace_id, "officer-1", "member").await;

        let err = change_member_role(&state, "owner-1", &workspace_id, "officer-1", "treasurer")
            .await
            .expect_err("unknown role");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.name(), "ROLE_NOT_FOUND");

        let changed = change_member_role(&state, "owner-1", &workspace_id, "officer-1", "ADMIN")
            .await
            .expect("promote");
        assert_eq!(changed.role_id.as_str(), "admin");
    }

    #[tokio::test]
    async fn owner_is_protected() {
        let (_dir, state, workspace_id) = seeded().await;
        seed_member(&state, &workspace_id, "admin-1", "admin").await;

        let err = change_member_role(&state, "admin-1", &workspace_id, "owner-1", "member")
            .await
            .expect_err("owner role fixed");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = remove_member(&state, "admin-1", &workspace_id, "owner-1")
            .await
            .expect_err("owner stays");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = add_member(&state, "admin-1", &workspace_id, "user-9", Some("owner"))
            .await
            .expect_err("owner not assignable");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn members_cannot_manage_membership() {
        let (_dir, state, workspace_id) = seeded().await;
        seed_member(&state, &workspace_id, "officer-1", "member").await;
        seed_member(&state, &workspace_id, "officer-2", "member").await;

        let err = remove_member(&state, "officer-1", &workspace_id, "officer-2")
            .await
            .expect_err("forbidden");
        assert_eq!(err.name(), "PERMISSION_DENIED");

        remove_member(&state, "owner-1", &workspace_id, "officer-2")
            .await
            .expect("owner removes");
        let err = remove_member(&state, "owner-1", &workspace_id, "officer-2")
            .await
            .expect_err("already gone");
        assert_eq!(err.name(), "MEMBER_NOT_FOUND");
    }
}
