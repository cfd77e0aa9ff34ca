use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::project_repo::{ProjectRepository, UpdateProjectParams},
    ids::{ProjectId, UserId, WorkspaceId},
    pagination::Pagination,
    project::ProjectRecord,
};

pub struct SqliteProjectRepository {
    pool: Pool<Sqlite>,
}

impl SqliteProjectRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_project_row(row: SqliteRow) -> ProjectRecord {
        ProjectRecord {
            id: ProjectId::from(row.get::<String, _>("id")),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            name: row.get("name"),
            emoji: row.get("emoji"),
            description: row.get("description"),
            created_by: UserId::from(row.get::<String, _>("created_by")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn insert_project(&self, record: &ProjectRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO projects (
                 id,
                 workspace_id,
                 name,
                 emoji,
                 description,
                 created_by,
                 created_at,
                 updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(record.workspace_id.as_str())
        .bind(&record.name)
        .bind(record.emoji.as_deref())
        .bind(record.description.as_deref())
        .bind(record.created_by.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_project(&self, workspace_id: &str, id: &str) -> Result<Option<ProjectRecord>> {
        let row = sqlx::query(
            "SELECT id, workspace_id, name, emoji, description, created_by, created_at, updated_at
             FROM projects
             WHERE id = ? AND workspace_id = ?",
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_project_row))
    }

    async fn list_projects(
        &self,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<ProjectRecord>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE workspace_id = ?")
            .bind(workspace_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT id, workspace_id, name, emoji, description, created_by, created_at, updated_at
             FROM projects
             WHERE workspace_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?",
        )
        .bind(workspace_id)
        .bind(pagination.limit())
        .bind(pagination.skip())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Self::map_project_row).collect(), total))
    }

    async fn update_project(&self, params: UpdateProjectParams) -> Result<bool> {
        let UpdateProjectParams {
            workspace_id,
            id,
            name,
            emoji,
            description,
            updated_at,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE projects SET updated_at = ");
        builder.push_bind(updated_at);

        if let Some(name) = name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(emoji) = emoji {
            builder.push(", emoji = ");
            builder.push_bind(emoji);
        }
        if let Some(description) = description {
            builder.push(", description = ");
            builder.push_bind(description);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id.into_inner());
        builder.push(" AND workspace_id = ");
        builder.push_bind(workspace_id.into_inner());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_project_with_tasks(&self, workspace_id: &str, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM projects WHERE id = ? AND workspace_id = ?")
            .bind(id)
            .bind(workspace_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM tasks WHERE project_id = ? AND workspace_id = ?")
            .bind(id)
            .bind(workspace_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
