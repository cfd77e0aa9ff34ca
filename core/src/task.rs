use std::{fmt, str::FromStr};

use anyhow::{Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        Database,
        task_repo::{TaskListQuery, TaskRepositoryRef, UpdateTaskParams},
    },
    ids::{ProjectId, TaskId, UserId, WorkspaceId},
    pagination::{Page, Pagination},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "BACKLOG",
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::InReview => "IN_REVIEW",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BACKLOG" => Ok(Self::Backlog),
            "TODO" => Ok(Self::Todo),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "IN_REVIEW" => Ok(Self::InReview),
            "DONE" => Ok(Self::Done),
            other => bail!("unknown task status: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => bail!("unknown task priority: {other}"),
        }
    }
}

/// A loan request tracked as a task inside a project.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub workspace_id: WorkspaceId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<i64>,
    pub amount: f64,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<i64>,
    pub amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<i64>,
    pub amount: Option<f64>,
}

/// Due-date filtering matches the whole UTC day containing `due_on`.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<ProjectId>,
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub assignees: Vec<UserId>,
    pub keyword: Option<String>,
    pub due_on: Option<i64>,
}

pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone)]
pub struct TaskStore {
    task_repo: TaskRepositoryRef,
}

impl TaskStore {
    pub fn new(database: &Database) -> Self {
        Self {
            task_repo: database.repositories().task_repo(),
        }
    }

    pub async fn create(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
        created_by: &UserId,
        input: NewTask,
    ) -> Result<TaskRecord> {
        let now = Utc::now().timestamp();
        let record = TaskRecord {
            id: TaskId::generate(),
            workspace_id: workspace_id.clone(),
            project_id: project_id.clone(),
            title: input.title.trim().to_owned(),
            description: input
                .description
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            status: input.status,
            priority: input.priority,
            assigned_to: input.assigned_to,
            due_date: input.due_date,
            amount: input.amount,
            created_by: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        self.task_repo.insert_task(&record).await?;
        Ok(record)
    }

    pub async fn find(&self, workspace_id: &str, id: &str) -> Result<Option<TaskRecord>> {
        self.task_repo.fetch_task(workspace_id, id).await
    }

    pub async fn list(
        &self,
        workspace_id: &str,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> Result<Page<TaskRecord>> {
        let due_range = filter.due_on.map(|timestamp| {
            let start = timestamp - timestamp.rem_euclid(SECONDS_PER_DAY);
            (start, start + SECONDS_PER_DAY)
        });
        let query = TaskListQuery {
            workspace_id: WorkspaceId::from(workspace_id),
            project_id: filter.project_id.clone(),
            statuses: filter.statuses.clone(),
            priorities: filter.priorities.clone(),
            assignees: filter.assignees.clone(),
            keyword: filter
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            due_range,
        };
        let (items, total) = self.task_repo.list_tasks(&query, pagination).await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn update(
        &self,
        workspace_id: &str,
        id: &str,
        changes: TaskChanges,
    ) -> Result<Option<TaskRecord>> {
        let updated = self
            .task_repo
            .update_task(UpdateTaskParams {
                workspace_id: WorkspaceId::from(workspace_id),
                id: TaskId::from(id),
                title: changes.title.map(|value| value.trim().to_owned()),
                description: changes.description.map(|value| value.trim().to_owned()),
                status: changes.status,
                priority: changes.priority,
                assigned_to: changes.assigned_to,
                due_date: changes.due_date,
                amount: changes.amount,
                updated_at: Utc::now().timestamp(),
            })
            .await?;
        if !updated {
            return Ok(None);
        }
        self.task_repo.fetch_task(workspace_id, id).await
    }

    pub async fn delete(&self, workspace_id: &str, id: &str) -> Result<bool> {
        self.task_repo.delete_task(workspace_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_database;

    fn loan(title: &str, status: TaskStatus, amount: f64) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            assigned_to: None,
            due_date: None,
            amount,
        }
    }

    #[test]
    fn status_and_priority_parse_case_insensitively() {
        assert_eq!("in_review".parse::<TaskStatus>().unwrap(), TaskStatus::InReview);
        assert_eq!("High".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert!("ARCHIVED".parse::<TaskStatus>().is_err());
    }

    #[tokio::test]
    async fn list_applies_status_keyword_and_due_day() {
        let (_dir, database) = setup_database().await;
        let store = TaskStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let project = ProjectId::from("project-1");
        let creator = UserId::from("user-1");
        let due = 1_717_243_200; // 2024-06-01T12:00:00Z

        let mut fertilizer = loan("Fertilizer loan", TaskStatus::InProgress, 50.0);
        fertilizer.due_date = Some(due);
        store
            .create(&workspace, &project, &creator, fertilizer)
            .await
            .expect("task");
        store
            .create(&workspace, &project, &creator, loan("Seed loan", TaskStatus::Done, 100.0))
            .await
            .expect("task");
        store
            .create(&workspace, &project, &creator, loan("50%_deposit", TaskStatus::Todo, 5.0))
            .await
            .expect("task");

        let by_status = store
            .list(
                &workspace,
                &TaskFilter {
                    statuses: vec![TaskStatus::Done, TaskStatus::InProgress],
                    ..TaskFilter::default()
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(by_status.info.total_count, 2);

        let by_keyword = store
            .list(
                &workspace,
                &TaskFilter {
                    keyword: Some("SEED".to_owned()),
                    ..TaskFilter::default()
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(by_keyword.items.len(), 1);
        assert_eq!(by_keyword.items[0].title, "Seed loan");

        let literal_wildcard = store
            .list(
                &workspace,
                &TaskFilter {
                    keyword: Some("%_".to_owned()),
                    ..TaskFilter::default()
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(literal_wildcard.info.total_count, 1);

        let by_day = store
            .list(
                &workspace,
                &TaskFilter {
                    due_on: Some(1_717_200_000), // 2024-06-01T00:00:00Z
                    ..TaskFilter::default()
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert_eq!(by_day.info.total_count, 1);
        assert_eq!(by_day.items[0].title, "Fertilizer loan");
    }

    #[tokio::test]
    async fn update_keeps_unspecified_fields() {
        let (_dir, database) = setup_database().await;
        let store = TaskStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let task = store
            .create(
                &workspace,
                &ProjectId::from("project-1"),
                &UserId::from("user-1"),
                loan("Seed loan", TaskStatus::Todo, 80.0),
            )
            .await
            .expect("task");

        let updated = store
            .update(
                &workspace,
                &task.id,
                TaskChanges {
                    status: Some(TaskStatus::Done),
                    ..TaskChanges::default()
                },
            )
            .await
            .expect("update")
            .expect("task exists");
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.amount, 80.0);
        assert_eq!(updated.title, "Seed loan");

        assert!(store.delete(&workspace, &task.id).await.expect("delete"));
        assert!(store.find(&workspace, &task.id).await.expect("find").is_none());
    }
}
