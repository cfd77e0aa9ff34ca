use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    ids::{ProjectId, WorkspaceId},
    pagination::Pagination,
    project::ProjectRecord,
};

/// `Some(None)` on optional columns clears them.
#[derive(Debug, Clone)]
pub struct UpdateProjectParams {
    pub workspace_id: WorkspaceId,
    pub id: ProjectId,
    pub name: Option<String>,
    pub emoji: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub updated_at: i64,
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn insert_project(&self, record: &ProjectRecord) -> Result<()>;

    async fn fetch_project(&self, workspace_id: &str, id: &str) -> Result<Option<ProjectRecord>>;

    async fn list_projects(
        &self,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<ProjectRecord>, i64)>;

    async fn update_project(&self, params: UpdateProjectParams) -> Result<bool>;

    async fn delete_project_with_tasks(&self, workspace_id: &str, id: &str) -> Result<bool>;
}

pub type ProjectRepositoryRef = Arc<dyn ProjectRepository>;
