use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::workspace_repo::{CreateWorkspaceParams, UpdateWorkspaceParams, WorkspaceRepository},
    ids::{RoleId, UserId, WorkspaceId},
    workspace::{UserWorkspaceMembership, WorkspaceDeletion, WorkspaceRecord},
    workspace_member::WorkspaceMemberRecord,
};

pub struct SqliteWorkspaceRepository {
    pool: Pool<Sqlite>,
}

impl SqliteWorkspaceRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_workspace_row(row: &SqliteRow) -> WorkspaceRecord {
        WorkspaceRecord {
            id: WorkspaceId::from(row.get::<String, _>("id")),
            name: row.get("name"),
            description: row.get("description"),
            owner_id: UserId::from(row.get::<String, _>("owner_id")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn map_member_row(row: SqliteRow) -> WorkspaceMemberRecord {
        WorkspaceMemberRecord {
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            user_id: UserId::from(row.get::<String, _>("user_id")),
            role_id: RoleId::from(row.get::<String, _>("role_id")),
            joined_at: row.get("joined_at"),
        }
    }
}

#[async_trait]
impl WorkspaceRepository for SqliteWorkspaceRepository {
    async fn create_workspace(&self, params: CreateWorkspaceParams) -> Result<WorkspaceRecord> {
        let CreateWorkspaceParams {
            id,
            name,
            description,
            owner_id,
            owner_role_id,
            created_at,
        } = params;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO workspaces (id, name, description, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(&name)
        .bind(description.as_deref())
        .bind(owner_id.as_str())
        .bind(created_at)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role_id, joined_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(owner_id.as_str())
        .bind(owner_role_id.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WorkspaceRecord {
            id,
            name,
            description,
            owner_id,
            created_at,
            updated_at: created_at,
        })
    }

    async fn fetch_workspace(&self, id: &str) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query(
            "SELECT id, name, description, owner_id, created_at, updated_at
             FROM workspaces
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::map_workspace_row))
    }

    async fn update_workspace(&self, params: UpdateWorkspaceParams) -> Result<bool> {
        let UpdateWorkspaceParams {
            id,
            name,
            description,
            updated_at,
        } = params;

        let mut builder = QueryBuilder::new("UPDATE workspaces SET updated_at = ");
        builder.push_bind(updated_at);

        if let Some(name) = name {
            builder.push(", name = ");
            builder.push_bind(name);
        }
        if let Some(description) = description {
            builder.push(", description = ");
            builder.push_bind(description);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id.into_inner());

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_workspace_cascade(&self, id: &str) -> Result<Option<WorkspaceDeletion>> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM workspaces WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let document_keys: Vec<String> =
            sqlx::query_scalar("SELECT storage_key FROM documents WHERE workspace_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        for table in [
            "documents",
            "tasks",
            "projects",
            "farmers",
            "workspace_members",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE workspace_id = ?"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(WorkspaceDeletion { document_keys }))
    }

    async fn list_memberships_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserWorkspaceMembership>> {
        let rows = sqlx::query(
            "SELECT w.id, w.name, w.description, w.owner_id, w.created_at, w.updated_at,
                    wm.role_id, wm.joined_at
             FROM workspace_members wm
             JOIN workspaces w ON w.id = wm.workspace_id
             WHERE wm.user_id = ?
             ORDER BY w.created_at DESC, w.rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UserWorkspaceMembership {
                workspace: Self::map_workspace_row(&row),
                role_id: RoleId::from(row.get::<String, _>("role_id")),
                joined_at: row.get("joined_at"),
            })
            .collect())
    }

    async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMemberRecord>> {
        let rows = sqlx::query(
            "SELECT workspace_id, user_id, role_id, joined_at
             FROM workspace_members
             WHERE workspace_id = ?
             ORDER BY joined_at ASC, rowid ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::map_member_row).collect())
    }

    async fn get_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<WorkspaceMemberRecord>> {
        let row = sqlx::query(
            "SELECT workspace_id, user_id, role_id, joined_at
             FROM workspace_members
             WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_member_row))
    }

    async fn find_member_role(&self, workspace_id: &str, user_id: &str) -> Result<Option<RoleId>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role_id FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role.map(RoleId::from))
    }

    async fn insert_member(&self, record: &WorkspaceMemberRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role_id, joined_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.workspace_id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.role_id.as_str())
        .bind(record.joined_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_member_role(
        &self,
        workspace_id: &str,
        user_id: &str,
        role_id: &RoleId,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE workspace_members SET role_id = ? WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(role_id.as_str())
        .bind(workspace_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_member(&self, workspace_id: &str, user_id: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM workspace_members WHERE workspace_id = ? AND user_id = ?")
                .bind(workspace_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
