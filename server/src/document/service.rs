use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{error, info, warn};

use agrocoop_core::{
    blob::{BlobDescriptor, BlobMetadata, BlobStorage, ListedBlobRecord},
    document::{DocumentRecord, DocumentStore, NewDocument},
    ids::{UserId, WorkspaceId},
    pagination::{Page, Pagination},
    permissions::Permission,
};

use crate::{AppError, access::AccessService, state::AppState};

/// A file received from a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

pub struct DocumentService {
    document_store: DocumentStore,
    blob_store: Arc<dyn BlobStorage>,
    storage_bucket: String,
    access: Arc<AccessService>,
}

impl DocumentService {
    pub fn new(
        document_store: DocumentStore,
        blob_store: Arc<dyn BlobStorage>,
        storage_bucket: String,
        access: Arc<AccessService>,
    ) -> Self {
        Self {
            document_store,
            blob_store,
            storage_bucket,
            access,
        }
    }

    fn descriptor(&self, key: &str) -> BlobDescriptor {
        BlobDescriptor::new(self.storage_bucket.as_str(), key)
    }

    /// Stores the bytes first, then records the metadata row. When the row
    /// cannot be written the stored object is removed again.
    pub async fn upload(
        &self,
        user_id: &str,
        workspace_id: &str,
        file: UploadedFile,
    ) -> Result<DocumentRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::UploadDocument])
            .await?;
        if file.bytes.is_empty() {
            return Err(AppError::bad_request("Uploaded file is empty."));
        }

        let external_id = DocumentStore::new_external_id();
        let storage_key = DocumentStore::storage_key_for(workspace_id, &external_id, &file.file_name);
        let descriptor = self.descriptor(&storage_key);
        let size = file.bytes.len() as i64;

        let location = self
            .blob_store
            .put(
                &descriptor,
                &file.bytes,
                BlobMetadata {
                    content_type: file.content_type.clone(),
                    content_length: Some(file.bytes.len() as u64),
                    last_modified: None,
                },
            )
            .await
            .map_err(AppError::from_anyhow)?;

        let created = self
            .document_store
            .create(
                &WorkspaceId::from(workspace_id),
                &UserId::from(user_id),
                NewDocument {
                    external_id,
                    storage_key: storage_key.clone(),
                    file_url: location.uri,
                    file_name: file.file_name,
                    content_type: file.content_type,
                    size,
                },
            )
            .await;

        match created {
            Ok(document) => {
                info!(
                    workspace_id,
                    document_id = %document.id,
                    size,
                    "document uploaded"
                );
                Ok(document)
            }
            Err(err) => {
                if let Err(cleanup) = self.blob_store.delete(&descriptor).await {
                    warn!(
                        key = storage_key.as_str(),
                        error = %cleanup,
                        "failed to remove orphaned upload"
                    );
                }
                Err(AppError::conflict_or_internal(err, "Document already exists."))
            }
        }
    }

    pub async fn list_documents(
        &self,
        user_id: &str,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<Page<DocumentRecord>, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        self.document_store
            .list(workspace_id, pagination)
            .await
            .map_err(AppError::from_anyhow)
    }

    /// Both the id and the file URL must name the same document.
    pub async fn delete_document(
        &self,
        user_id: &str,
        document_id: &str,
        file_url: &str,
    ) -> Result<DocumentRecord, AppError> {
        let document = self
            .document_store
            .find(document_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::document_not_found(document_id))?;
        self.access
            .authorize(user_id, &document.workspace_id, &[Permission::DeleteDocument])
            .await?;

        let deleted = self
            .document_store
            .delete_matching(document_id, file_url.trim())
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::document_not_found(document_id))?;

        if let Err(err) = self
            .blob_store
            .delete(&self.descriptor(&deleted.storage_key))
            .await
        {
            warn!(
                document_id,
                key = deleted.storage_key.as_str(),
                error = %err,
                "failed to remove stored object for deleted document"
            );
        }

        info!(document_id, workspace_id = %deleted.workspace_id, "document deleted");
        Ok(deleted)
    }

    /// Raw object listing for a workspace; storage failures are logged and
    /// returned to the caller.
    pub async fn list_files(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<ListedBlobRecord>, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        self.blob_store
            .list(&self.storage_bucket, workspace_id)
            .await
            .map_err(|err| {
                error!(workspace_id, error = %err, "failed to list stored files");
                AppError::from_anyhow(err)
            })
    }
}

impl FromRef<AppState> for Arc<DocumentService> {
    fn from_ref(state: &AppState) -> Arc<DocumentService> {
        Arc::clone(&state.document_service)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::test_support::{seed_member, seed_workspace, setup_state};

    fn deed() -> UploadedFile {
        UploadedFile {
            file_name: "land deed.pdf".to_owned(),
            content_type: Some("application/pdf".to_owned()),
            bytes: b"%PDF-1.4".to_vec(),
        }
    }

    #[tokio::test]
    async fn upload_stores_object_and_record() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;

        let document = state
            .document_service
            .upload(&owner_id, &workspace_id, deed())
            .await
            .expect("upload");
        assert!(document.storage_key.starts_with(&format!("{workspace_id}/")));
        assert!(document.storage_key.ends_with("-land_deed.pdf"));

        let files = state
            .document_service
            .list_files(&owner_id, &workspace_id)
            .await
            .expect("files");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 8);
    }

    #[tokio::test]
    async fn delete_requires_matching_locator() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;
        let document = state
            .document_service
            .upload(&owner_id, &workspace_id, deed())
            .await
            .expect("upload");

        let err = state
            .document_service
            .delete_document(&owner_id, &document.id, "memory://elsewhere")
            .await
            .expect_err("locator mismatch");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        seed_member(&state, &workspace_id, "officer-1", "member").await;
        let err = state
            .document_service
            .delete_document("officer-1", &document.id, &document.file_url)
            .await
            .expect_err("members cannot delete documents");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        state
            .document_service
            .delete_document(&owner_id, &document.id, &document.file_url)
            .await
            .expect("delete");
        let files = state
            .document_service
            .list_files(&owner_id, &workspace_id)
            .await
            .expect("files");
        assert!(files.is_empty());
    }
}
