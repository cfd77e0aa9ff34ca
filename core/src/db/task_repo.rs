use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    analytics::{AnalyticsScope, TaskAnalytics},
    ids::{ProjectId, TaskId, UserId, WorkspaceId},
    pagination::Pagination,
    task::{TaskPriority, TaskRecord, TaskStatus},
};

#[derive(Debug, Clone)]
pub struct TaskListQuery {
    pub workspace_id: WorkspaceId,
    pub project_id: Option<ProjectId>,
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub assignees: Vec<UserId>,
    pub keyword: Option<String>,
    /// Half-open `[start, end)` range of due timestamps.
    pub due_range: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct UpdateTaskParams {
    pub workspace_id: WorkspaceId,
    pub id: TaskId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<i64>,
    pub amount: Option<f64>,
    pub updated_at: i64,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert_task(&self, record: &TaskRecord) -> Result<()>;

    async fn fetch_task(&self, workspace_id: &str, id: &str) -> Result<Option<TaskRecord>>;

    async fn list_tasks(
        &self,
        query: &TaskListQuery,
        pagination: Pagination,
    ) -> Result<(Vec<TaskRecord>, i64)>;

    async fn update_task(&self, params: UpdateTaskParams) -> Result<bool>;

    async fn delete_task(&self, workspace_id: &str, id: &str) -> Result<bool>;

    /// Single aggregated pass over the tasks in `scope`; `loans_amount` is
    /// left for the caller to derive.
    async fn aggregate_tasks(&self, scope: &AnalyticsScope, now: i64) -> Result<TaskAnalytics>;
}

pub type TaskRepositoryRef = Arc<dyn TaskRepository>;
