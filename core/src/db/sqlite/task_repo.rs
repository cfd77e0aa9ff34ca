use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    analytics::{AnalyticsScope, TaskAnalytics},
    db::task_repo::{TaskListQuery, TaskRepository, UpdateTaskParams},
    ids::{ProjectId, TaskId, UserId, WorkspaceId},
    pagination::{Pagination, like_pattern},
    task::{TaskRecord, TaskStatus},
};

const TASK_COLUMNS: &str = "id, workspace_id, project_id, title, description, status, priority, \
     assigned_to, due_date, amount, created_by, created_at, updated_at";

pub struct SqliteTaskRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTaskRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_task_row(row: SqliteRow) -> Result<TaskRecord> {
        let status: String = row.get("status");
        let priority: String = row.get("priority");
        Ok(TaskRecord {
            id: TaskId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            project_id: ProjectId::from(row.get::<String, _>("project_id")),
            title: row.get("title"),
            description: row.get("description"),
            status: status.parse().context("invalid status stored for task")?,
            priority: priority.parse().context("invalid priority stored for task")?,
            assigned_to: row
                .get::<Option<String>, _>("assigned_to")
                .map(UserId::from),
            due_date: row.get("due_date"),
            amount: row.get("amount"),
            created_by: UserId::from(row.get::<String, _>("created_by")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &'a TaskListQuery) {
        builder.push(" WHERE workspace_id = ");
        builder.push_bind(query.workspace_id.as_str());

        if let Some(project_id) = query.project_id.as_ref() {
            builder.push(" AND project_id = ");
            builder.push_bind(project_id.as_str());
        }
        if !query.statuses.is_empty() {
            builder.push(" AND status IN (");
            let mut separated = builder.separated(", ");
            for status in &query.statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
        if !query.priorities.is_empty() {
            builder.push(" AND priority IN (");
            let mut separated = builder.separated(", ");
            for priority in &query.priorities {
                separated.push_bind(priority.as_str());
            }
            separated.push_unseparated(")");
        }
        if !query.assignees.is_empty() {
            builder.push(" AND assigned_to IN (");
            let mut separated = builder.separated(", ");
            for assignee in &query.assignees {
                separated.push_bind(assignee.as_str());
            }
            separated.push_unseparated(")");
        }
        if let Some(keyword) = query.keyword.as_deref() {
            builder.push(" AND LOWER(title) LIKE ");
            builder.push_bind(like_pattern(keyword));
            builder.push(" ESCAPE '\\'");
        }
        if let Some((start, end)) = query.due_range {
            builder.push(" AND due_date >= ");
            builder.push_bind(start);
            builder.push(" AND due_date < ");
            builder.push_bind(end);
        }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert_task(&self, record: &TaskRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO tasks (
                 id,
                 workspace_id,
                 project_id,
                 title,
                 description,
                 status,
                 priority,
                 assigned_to,
                 due_date,
                 amount,
                 created_by,
                 created_at,
                 updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(record.workspace_id.as_str())
        .bind(record.project_id.as_str())
        .bind(&record.title)
        .bind(record.description.as_deref())
        .bind(record.status.as_str())
        .bind(record.priority.as_str())
        .bind(record.assigned_to.as_ref().map(|user| user.as_str()))
        .bind(record.due_date)
        .bind(record.amount)
        .bind(record.created_by.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_task(&self, workspace_id: &str, id: &str) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND workspace_id = ?"
        ))
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_task_row).transpose()
    }

    async fn list_tasks(
        &self,
        query: &TaskListQuery,
        pagination: Pagination,
    ) -> Result<(Vec<TaskRecord>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        Self::push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        Self::push_filters(&mut select, query);
        select.push(" ORDER BY created_at DESC, rowid DESC LIMIT ");
        select.push_bind(pagination.limit());
        select.push(" OFFSET ");
        select.push_bind(pagination.skip());

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Self::map_task_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn update_task(&self, params: UpdateTaskParams) -> Result<bool> {
        let UpdateTaskParams {
            workspace_id,
            id,
            title,
            description,
            status,
            priority,
            assigned_to,
            due_date,
            amount,
            updated_at,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE tasks SET updated_at = ");
        builder.push_bind(updated_at);

        if let Some(title) = title {
            builder.push(", title = ");
            builder.push_bind(title);
        }
        if let Some(description) = description {
            builder.push(", description = ");
            builder.push_bind(Some(description).filter(|value| !value.is_empty()));
        }
        if let Some(status) = status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(priority) = priority {
            builder.push(", priority = ");
            builder.push_bind(priority.as_str());
        }
        if let Some(assigned_to) = assigned_to {
            builder.push(", assigned_to = ");
            builder.push_bind(assigned_to.into_inner());
        }
        if let Some(due_date) = due_date {
            builder.push(", due_date = ");
            builder.push_bind(due_date);
        }
        if let Some(amount) = amount {
            builder.push(", amount = ");
            builder.push_bind(amount);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id.into_inner());
        builder.push(" AND workspace_id = ");
        builder.push_bind(workspace_id.into_inner());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, workspace_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND workspace_id = ?")
            .bind(id)
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn aggregate_tasks(&self, scope: &AnalyticsScope, now: i64) -> Result<TaskAnalytics> {
        let done = TaskStatus::Done.as_str();
        let pending = format!(
            "status IN ('{}', '{}')",
            TaskStatus::InReview.as_str(),
            TaskStatus::InProgress.as_str()
        );

        let mut builder = QueryBuilder::new(format!(
            "SELECT
                 CAST(COUNT(*) AS INTEGER) AS total_tasks,
                 CAST(COALESCE(SUM(CASE WHEN status = '{done}' THEN 1 ELSE 0 END), 0) AS INTEGER)
                     AS completed_tasks,
                 CAST(COALESCE(SUM(CASE WHEN {pending} THEN amount ELSE 0 END), 0) AS REAL)
                     AS pending_loans,
                 CAST(COALESCE(SUM(CASE WHEN {pending} THEN 1 ELSE 0 END), 0) AS INTEGER)
                     AS pending_loan_count,
                 CAST(COALESCE(SUM(CASE WHEN status = '{done}' THEN amount ELSE 0 END), 0) AS REAL)
                     AS approved_loans,
                 CAST(COALESCE(SUM(CASE WHEN status = '{done}' THEN 1 ELSE 0 END), 0) AS INTEGER)
                     AS approved_loan_count,
                 CAST(COALESCE(SUM(CASE
                     WHEN due_date IS NOT NULL AND due_date < "
        ));
        builder.push_bind(now);
        builder.push(format!(
            " AND status <> '{done}' THEN 1 ELSE 0 END), 0) AS INTEGER) AS overdue_tasks
             FROM tasks
             WHERE workspace_id = "
        ));

        match scope {
            AnalyticsScope::Project {
                workspace_id,
                project_id,
            } => {
                builder.push_bind(workspace_id.as_str());
                builder.push(" AND project_id = ");
                builder.push_bind(project_id.as_str());
            }
            AnalyticsScope::Workspace { workspace_id } => {
                builder.push_bind(workspace_id.as_str());
            }
        }

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(TaskAnalytics {
            total_tasks: row.try_get("total_tasks")?,
            overdue_tasks: row.try_get("overdue_tasks")?,
            completed_tasks: row.try_get("completed_tasks")?,
            pending_loans: row.try_get("pending_loans")?,
            pending_loan_count: row.try_get("pending_loan_count")?,
            approved_loans: row.try_get("approved_loans")?,
            approved_loan_count: row.try_get("approved_loan_count")?,
            loans_amount: 0.0,
        })
    }
}
