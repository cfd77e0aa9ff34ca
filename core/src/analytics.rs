//! Loan analytics derived from task rows.
//!
//! Pending loans are tasks `IN_REVIEW` or `IN_PROGRESS`; approved loans are
//! tasks `DONE`. A task is overdue when its due date lies strictly before
//! the evaluation instant and it is not `DONE`.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::{Database, task_repo::TaskRepositoryRef},
    ids::{ProjectId, WorkspaceId},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAnalytics {
    pub total_tasks: i64,
    pub overdue_tasks: i64,
    pub completed_tasks: i64,
    pub pending_loans: f64,
    pub pending_loan_count: i64,
    pub approved_loans: f64,
    pub approved_loan_count: i64,
    pub loans_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsScope {
    Project {
        workspace_id: WorkspaceId,
        project_id: ProjectId,
    },
    Workspace {
        workspace_id: WorkspaceId,
    },
}

impl AnalyticsScope {
    pub fn workspace_id(&self) -> &WorkspaceId {
        match self {
            Self::Project { workspace_id, .. } | Self::Workspace { workspace_id } => workspace_id,
        }
    }
}

#[derive(Clone)]
pub struct AnalyticsStore {
    task_repo: TaskRepositoryRef,
}

impl AnalyticsStore {
    pub fn new(database: &Database) -> Self {
        Self {
            task_repo: database.repositories().task_repo(),
        }
    }

    pub async fn compute(&self, scope: &AnalyticsScope) -> Result<TaskAnalytics> {
        self.compute_at(scope, Utc::now().timestamp()).await
    }

    pub async fn compute_at(&self, scope: &AnalyticsScope, now: i64) -> Result<TaskAnalytics> {
        let mut analytics = self.task_repo.aggregate_tasks(scope, now).await?;
        analytics.loans_amount = analytics.pending_loans + analytics.approved_loans;
        Ok(analytics)
    }
}
