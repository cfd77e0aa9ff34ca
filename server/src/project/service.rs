use std::sync::Arc;

use axum::extract::FromRef;
use tracing::info;

use agrocoop_core::{
    analytics::{AnalyticsScope, AnalyticsStore, TaskAnalytics},
    ids::{ProjectId, UserId, WorkspaceId},
    pagination::{Page, Pagination},
    permissions::Permission,
    project::{ProjectRecord, ProjectStore},
};

use crate::{AppError, access::AccessService, state::AppState};

/// Field values for a partial project update; `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct ProjectChanges<'a> {
    pub name: Option<&'a str>,
    pub emoji: Option<&'a str>,
    pub description: Option<&'a str>,
}

pub struct ProjectService {
    project_store: ProjectStore,
    analytics_store: AnalyticsStore,
    access: Arc<AccessService>,
}

impl ProjectService {
    pub fn new(
        project_store: ProjectStore,
        analytics_store: AnalyticsStore,
        access: Arc<AccessService>,
    ) -> Self {
        Self {
            project_store,
            analytics_store,
            access,
        }
    }

    /// Fetches a project that must belong to `workspace_id`.
    pub async fn fetch_project(
        &self,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<ProjectRecord, AppError> {
        self.project_store
            .find(workspace_id, project_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::project_not_found(workspace_id, project_id))
    }

    pub async fn create_project(
        &self,
        user_id: &str,
        workspace_id: &str,
        name: &str,
        emoji: Option<&str>,
        description: Option<&str>,
    ) -> Result<ProjectRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::CreateProject])
            .await?;

        let project = self
            .project_store
            .create(
                &WorkspaceId::from(workspace_id),
                &UserId::from(user_id),
                name,
                emoji,
                description,
            )
            .await
            .map_err(AppError::from_anyhow)?;
        info!(workspace_id, project_id = %project.id, "project created");
        Ok(project)
    }

    pub async fn list_projects(
        &self,
        user_id: &str,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<Page<ProjectRecord>, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        self.project_store
            .list(workspace_id, pagination)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn get_project(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<ProjectRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;
        self.fetch_project(workspace_id, project_id).await
    }

    pub async fn project_analytics(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<TaskAnalytics, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;
        let project = self.fetch_project(workspace_id, project_id).await?;

        self.analytics_store
            .compute(&AnalyticsScope::Project {
                workspace_id: project.workspace_id,
                project_id: project.id,
            })
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn update_project(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
        changes: ProjectChanges<'_>,
    ) -> Result<ProjectRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::EditProject])
            .await?;

        self.project_store
            .update(
                workspace_id,
                project_id,
                changes.name,
                changes.emoji,
                changes.description,
            )
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::project_not_found(workspace_id, project_id))
    }

    /// Deletes the project together with its tasks.
    pub async fn delete_project(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<ProjectId, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::DeleteProject])
            .await?;
        let project = self.fetch_project(workspace_id, project_id).await?;

        let deleted = self
            .project_store
            .delete(workspace_id, project_id)
            .await
            .map_err(AppError::from_anyhow)?;
        if !deleted {
            return Err(AppError::project_not_found(workspace_id, project_id));
        }

        info!(workspace_id, project_id, "project deleted");
        Ok(project.id)
    }
}

impl FromRef<AppState> for Arc<ProjectService> {
    fn from_ref(state: &AppState) -> Arc<ProjectService> {
        Arc::clone(&state.project_service)
    }
}
