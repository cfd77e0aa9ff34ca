// Workspace and membership handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    auth::authenticate,
    error::AppError,
    extract::ValidatedJson,
    state::AppState,
    types::{
        AddMemberRequest, AnalyticsResponse, ChangeMemberRoleRequest, CreateWorkspaceRequest,
        MemberResponse, UpdateWorkspaceRequest, UserWorkspaceResponse, WorkspaceResponse,
    },
    workspace::{members, service::WorkspaceService},
};

pub(crate) async fn create_workspace_handler(
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<CreateWorkspaceRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let workspace = workspaces
        .create_workspace(&user_id, &payload.name, payload.description.as_deref())
        .await?;

    let body = json!({
        "message": "Workspace created successfully",
        "workspace": WorkspaceResponse::from(workspace),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn list_user_workspaces_handler(
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let memberships: Vec<UserWorkspaceResponse> = workspaces
        .list_for_user(&user_id)
        .await?
        .into_iter()
        .map(UserWorkspaceResponse::from)
        .collect();

    Ok(Json(json!({
        "message": "User workspaces fetched successfully",
        "workspaces": memberships,
    }))
    .into_response())
}

pub(crate) async fn get_workspace_handler(
    Path(workspace_id): Path<String>,
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let workspace = workspaces.get_workspace(&user_id, &workspace_id).await?;

    Ok(Json(json!({
        "message": "Workspace fetched successfully",
        "workspace": WorkspaceResponse::from(workspace),
    }))
    .into_response())
}

pub(crate) async fn update_workspace_handler(
    Path(workspace_id): Path<String>,
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<UpdateWorkspaceRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let workspace = workspaces
        .update_workspace(
            &user_id,
            &workspace_id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Workspace updated successfully",
        "workspace": WorkspaceResponse::from(workspace),
    }))
    .into_response())
}

pub(crate) async fn delete_workspace_handler(
    Path(workspace_id): Path<String>,
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let workspace = workspaces.delete_workspace(&user_id, &workspace_id).await?;

    Ok(Json(json!({
        "message": "Workspace deleted successfully",
        "workspace": WorkspaceResponse::from(workspace),
    }))
    .into_response())
}

pub(crate) async fn workspace_members_handler(
    Path(workspace_id): Path<String>,
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let listing = workspaces.members(&user_id, &workspace_id).await?;

    Ok(Json(json!({
        "message": "Workspace members retrieved successfully",
        "members": listing.members,
        "roles": listing.roles,
    }))
    .into_response())
}

pub(crate) async fn workspace_analytics_handler(
    Path(workspace_id): Path<String>,
    State(workspaces): State<Arc<WorkspaceService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let analytics = workspaces.analytics(&user_id, &workspace_id).await?;

    Ok(Json(AnalyticsResponse {
        message: "Cooperative analytics retrieved successfully",
        analytics,
    })
    .into_response())
}

pub(crate) async fn change_member_role_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<ChangeMemberRoleRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let member = members::change_member_role(
        &state,
        &user_id,
        &workspace_id,
        payload.member_id.trim(),
        &payload.role_id,
    )
    .await?;
    let role = state.permissions.find(&member.role_id);

    Ok(Json(json!({
        "message": "Member role changed successfully",
        "member": MemberResponse::new(member, role),
    }))
    .into_response())
}

pub(crate) async fn add_member_handler(
    Path(workspace_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<AddMemberRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let member = members::add_member(
        &state,
        &user_id,
        &workspace_id,
        &payload.officer_id,
        payload.role_id.as_deref(),
    )
    .await?;
    let role = state.permissions.find(&member.role_id);

    let body = json!({
        "message": "Officer added to workspace successfully",
        "officer": MemberResponse::new(member, role),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn remove_member_handler(
    Path((workspace_id, member_id)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    members::remove_member(&state, &user_id, &workspace_id, &member_id).await?;

    Ok(Json(json!({
        "message": "Member removed successfully",
        "userId": member_id,
    }))
    .into_response())
}
