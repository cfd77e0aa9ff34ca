use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    db::document_repo::DocumentRepository,
    document::DocumentRecord,
    ids::{DocumentId, UserId, WorkspaceId},
    pagination::Pagination,
};

pub struct SqliteDocumentRepository {
    pool: Pool<Sqlite>,
}

impl SqliteDocumentRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_document_row(row: SqliteRow) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::from(row.get::<String, _>("id")),
            external_id: row.get("external_id"),
            workspace_id: WorkspaceId::from(row.get::<String, _>("workspace_id")),
            storage_key: row.get("storage_key"),
            file_url: row.get("file_url"),
            file_name: row.get("file_name"),
            content_type: row.get("content_type"),
            size: row.get("size"),
            uploaded_by: UserId::from(row.get::<String, _>("uploaded_by")),
            uploaded_at: row.get("uploaded_at"),
        }
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents (
                 id,
                 external_id,
                 workspace_id,
                 storage_key,
                 file_url,
                 file_name,
                 content_type,
                 size,
                 uploaded_by,
                 uploaded_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(&record.external_id)
        .bind(record.workspace_id.as_str())
        .bind(&record.storage_key)
        .bind(&record.file_url)
        .bind(&record.file_name)
        .bind(record.content_type.as_deref())
        .bind(record.size)
        .bind(record.uploaded_by.as_str())
        .bind(record.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(
            "SELECT id, external_id, workspace_id, storage_key, file_url, file_name,
                    content_type, size, uploaded_by, uploaded_at
             FROM documents
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_document_row))
    }

    async fn list_documents(
        &self,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<DocumentRecord>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE workspace_id = ?")
                .bind(workspace_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(
            "SELECT id, external_id, workspace_id, storage_key, file_url, file_name,
                    content_type, size, uploaded_by, uploaded_at
             FROM documents
             WHERE workspace_id = ?
             ORDER BY uploaded_at DESC, rowid DESC
             LIMIT ? OFFSET ?",
        )
        .bind(workspace_id)
        .bind(pagination.limit())
        .bind(pagination.skip())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Self::map_document_row).collect(), total))
    }

    async fn delete_matching(&self, id: &str, file_url: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(
            "DELETE FROM documents
             WHERE id = ? AND file_url = ?
             RETURNING id, external_id, workspace_id, storage_key, file_url, file_name,
                       content_type, size, uploaded_by, uploaded_at",
        )
        .bind(id)
        .bind(file_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_document_row))
    }
}
