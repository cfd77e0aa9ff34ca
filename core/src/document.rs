use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{Database, document_repo::DocumentRepositoryRef},
    ids::{DocumentId, UserId, WorkspaceId},
    pagination::{Page, Pagination},
};

/// Metadata for a file held in external object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub external_id: String,
    pub workspace_id: WorkspaceId,
    pub storage_key: String,
    pub file_url: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: i64,
    pub uploaded_by: UserId,
    pub uploaded_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub external_id: String,
    pub storage_key: String,
    pub file_url: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: i64,
}

#[derive(Clone)]
pub struct DocumentStore {
    document_repo: DocumentRepositoryRef,
}

impl DocumentStore {
    pub fn new(database: &Database) -> Self {
        Self {
            document_repo: database.repositories().document_repo(),
        }
    }

    /// Object key layout: `<workspace>/<external id>-<sanitized file name>`.
    pub fn storage_key_for(workspace_id: &str, external_id: &str, file_name: &str) -> String {
        format!("{workspace_id}/{external_id}-{}", sanitize_file_name(file_name))
    }

    pub fn new_external_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn create(
        &self,
        workspace_id: &WorkspaceId,
        uploaded_by: &UserId,
        input: NewDocument,
    ) -> Result<DocumentRecord> {
        let record = DocumentRecord {
            id: DocumentId::generate(),
            external_id: input.external_id,
            workspace_id: workspace_id.clone(),
            storage_key: input.storage_key,
            file_url: input.file_url,
            file_name: input.file_name,
            content_type: input.content_type,
            size: input.size,
            uploaded_by: uploaded_by.clone(),
            uploaded_at: Utc::now().timestamp(),
        };
        self.document_repo.insert_document(&record).await?;
        Ok(record)
    }

    pub async fn list(
        &self,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<Page<DocumentRecord>> {
        let (items, total) = self
            .document_repo
            .list_documents(workspace_id, pagination)
            .await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn find(&self, id: &str) -> Result<Option<DocumentRecord>> {
        self.document_repo.fetch_document(id).await
    }

    /// Deletes only when both id and file URL match the same row.
    pub async fn delete_matching(
        &self,
        id: &str,
        file_url: &str,
    ) -> Result<Option<DocumentRecord>> {
        self.document_repo.delete_matching(id, file_url).await
    }
}

pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_owned()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_database;

    fn upload(name: &str) -> NewDocument {
        let external_id = DocumentStore::new_external_id();
        let storage_key = DocumentStore::storage_key_for("ws-1", &external_id, name);
        NewDocument {
            file_url: format!("https://storage.test/{storage_key}"),
            external_id,
            storage_key,
            file_name: name.to_owned(),
            content_type: Some("application/pdf".to_owned()),
            size: 42,
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("land deed (1).pdf"), "land_deed__1_.pdf");
        assert_eq!(sanitize_file_name("   "), "file");
    }

    #[tokio::test]
    async fn delete_requires_matching_id_and_url() {
        let (_dir, database) = setup_database().await;
        let store = DocumentStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let uploader = UserId::from("user-1");

        let first = store
            .create(&workspace, &uploader, upload("deed.pdf"))
            .await
            .expect("first");
        let second = store
            .create(&workspace, &uploader, upload("receipt.pdf"))
            .await
            .expect("second");

        let mismatched = store
            .delete_matching(&first.id, &second.file_url)
            .await
            .expect("delete");
        assert!(mismatched.is_none());
        assert!(store.find(&first.id).await.expect("find").is_some());

        let deleted = store
            .delete_matching(&first.id, &first.file_url)
            .await
            .expect("delete")
            .expect("document removed");
        assert_eq!(deleted.storage_key, first.storage_key);

        let page = store.list(&workspace, Pagination::default()).await.expect("list");
        assert_eq!(page.info.total_count, 1);
        assert_eq!(page.items[0].id, second.id);
    }
}
