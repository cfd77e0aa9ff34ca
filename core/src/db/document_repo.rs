use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{document::DocumentRecord, pagination::Pagination};

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert_document(&self, record: &DocumentRecord) -> Result<()>;

    async fn fetch_document(&self, id: &str) -> Result<Option<DocumentRecord>>;

    async fn list_documents(
        &self,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<(Vec<DocumentRecord>, i64)>;

    /// Removes the row only when both `id` and `file_url` match it and
    /// returns what was removed.
    async fn delete_matching(&self, id: &str, file_url: &str) -> Result<Option<DocumentRecord>>;
}

pub type DocumentRepositoryRef = Arc<dyn DocumentRepository>;
