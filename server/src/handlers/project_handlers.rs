// Project handlers

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
    extract::{ValidatedJson, ValidatedQuery},
    project::service::{ProjectChanges, ProjectService},
    types::{
        AnalyticsResponse, CreateProjectRequest, PaginationQuery, ProjectResponse,
        UpdateProjectRequest,
    },
};

pub(crate) async fn create_project_handler(
    Path(workspace_id): Path<String>,
    State(projects): State<Arc<ProjectService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<CreateProjectRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let project = projects
        .create_project(
            &user_id,
            &workspace_id,
            &payload.name,
            payload.emoji.as_deref(),
            payload.description.as_deref(),
        )
        .await?;

    let body = json!({
        "message": "Project created successfully",
        "project": ProjectResponse::from(project),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn list_projects_handler(
    Path(workspace_id): Path<String>,
    State(projects): State<Arc<ProjectService>>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
) -> Result<Response, AppError> {
    let pagination = query.pagination()?;
    let user_id = authenticate(&headers)?;

    let page = projects
        .list_projects(&user_id, &workspace_id, pagination)
        .await?
        .map(ProjectResponse::from);

    Ok(Json(json!({
        "message": "Projects fetched successfully",
        "projects": page.items,
        "pagination": page.info,
    }))
    .into_response())
}

pub(crate) async fn get_project_handler(
    Path((project_id, workspace_id)): Path<(String, String)>,
    State(projects): State<Arc<ProjectService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let project = projects
        .get_project(&user_id, &workspace_id, &project_id)
        .await?;

    Ok(Json(json!({
        "message": "Project fetched successfully",
        "project": ProjectResponse::from(project),
    }))
    .into_response())
}

pub(crate) async fn project_analytics_handler(
    Path((project_id, workspace_id)): Path<(String, String)>,
    State(projects): State<Arc<ProjectService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let analytics = projects
        .project_analytics(&user_id, &workspace_id, &project_id)
        .await?;

    Ok(Json(AnalyticsResponse {
        message: "Project analytics retrieved successfully",
        analytics,
    })
    .into_response())
}

pub(crate) async fn update_project_handler(
    Path((project_id, workspace_id)): Path<(String, String)>,
    State(projects): State<Arc<ProjectService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<UpdateProjectRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let project = projects
        .update_project(
            &user_id,
            &workspace_id,
            &project_id,
            ProjectChanges {
                name: payload.name.as_deref(),
                emoji: payload.emoji.as_deref(),
                description: payload.description.as_deref(),
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Project updated successfully",
        "project": ProjectResponse::from(project),
    }))
    .into_response())
}

pub(crate) async fn delete_project_handler(
    Path((project_id, workspace_id)): Path<(String, String)>,
    State(projects): State<Arc<ProjectService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let deleted = projects
        .delete_project(&user_id, &workspace_id, &project_id)
        .await?;

    Ok(Json(json!({
        "message": "Project deleted successfully",
        "projectId": deleted,
    }))
    .into_response())
}
