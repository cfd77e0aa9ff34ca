use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};

use agrocoop_core::{
    analytics::{AnalyticsScope, AnalyticsStore, TaskAnalytics},
    blob::{BlobDescriptor, BlobStorage},
    ids::{UserId, WorkspaceId},
    permissions::Permission,
    workspace::{UserWorkspaceMembership, WorkspaceRecord, WorkspaceStore},
};

use crate::{
    AppError,
    access::AccessService,
    state::AppState,
    types::{MemberResponse, MembersResponse, RoleResponse},
};

pub struct WorkspaceService {
    workspace_store: WorkspaceStore,
    analytics_store: AnalyticsStore,
    access: Arc<AccessService>,
    blob_store: Arc<dyn BlobStorage>,
    storage_bucket: String,
}

impl WorkspaceService {
    pub fn new(
        workspace_store: WorkspaceStore,
        analytics_store: AnalyticsStore,
        access: Arc<AccessService>,
        blob_store: Arc<dyn BlobStorage>,
        storage_bucket: String,
    ) -> Self {
        Self {
            workspace_store,
            analytics_store,
            access,
            blob_store,
            storage_bucket,
        }
    }

    pub async fn fetch_workspace(&self, workspace_id: &str) -> Result<WorkspaceRecord, AppError> {
        self.workspace_store
            .find_by_id(workspace_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::workspace_not_found(workspace_id))
    }

    pub async fn create_workspace(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<WorkspaceRecord, AppError> {
        let workspace = self
            .workspace_store
            .create(&UserId::from(owner_id), name, description)
            .await
            .map_err(AppError::from_anyhow)?;
        info!(workspace_id = %workspace.id, owner_id, "workspace created");
        Ok(workspace)
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserWorkspaceMembership>, AppError> {
        self.workspace_store
            .list_for_user(user_id)
            .await
            .map_err(AppError::from_anyhow)
    }

    /// Any membership grants read access to the workspace itself.
    pub async fn get_workspace(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<WorkspaceRecord, AppError> {
        let workspace = self.fetch_workspace(workspace_id).await?;
        self.access.resolve_role(user_id, workspace_id).await?;
        Ok(workspace)
    }

    pub async fn update_workspace(
        &self,
        user_id: &str,
        workspace_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<WorkspaceRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::EditWorkspace])
            .await?;

        self.workspace_store
            .update(workspace_id, name, description)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::workspace_not_found(workspace_id))
    }

    /// Rows go first in one transaction; stored objects are removed after,
    /// and a failed object delete only logs.
    pub async fn delete_workspace(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<WorkspaceRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::DeleteWorkspace])
            .await?;
        let workspace = self.fetch_workspace(workspace_id).await?;

        let deletion = self
            .workspace_store
            .delete(workspace_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::workspace_not_found(workspace_id))?;

        for key in &deletion.document_keys {
            let descriptor = BlobDescriptor::new(self.storage_bucket.as_str(), key.as_str());
            if let Err(err) = self.blob_store.delete(&descriptor).await {
                warn!(
                    workspace_id,
                    key = key.as_str(),
                    error = %err,
                    "failed to remove stored object for deleted workspace"
                );
            }
        }

        info!(
            workspace_id,
            documents = deletion.document_keys.len(),
            "workspace deleted"
        );
        Ok(workspace)
    }

    pub async fn members(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<MembersResponse, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        let table = self.access.permissions();
        let members = self
            .workspace_store
            .list_members(workspace_id)
            .await
            .map_err(AppError::from_anyhow)?
            .into_iter()
            .map(|member| {
                let role = table.find(&member.role_id);
                MemberResponse::new(member, role)
            })
            .collect();
        let roles = table.roles().iter().map(RoleResponse::from).collect();

        Ok(MembersResponse { members, roles })
    }

    pub async fn analytics(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<TaskAnalytics, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        self.analytics_store
            .compute(&AnalyticsScope::Workspace {
                workspace_id: WorkspaceId::from(workspace_id),
            })
            .await
            .map_err(AppError::from_anyhow)
    }
}

impl FromRef<AppState> for Arc<WorkspaceService> {
    fn from_ref(state: &AppState) -> Arc<WorkspaceService> {
        Arc::clone(&state.workspace_service)
    }
}

#[cfg(test)]
mod tests {
    use agrocoop_core::{
        blob::BlobMetadata,
        document::{DocumentStore, NewDocument},
    };
    use axum::http::StatusCode;

    use crate::test_support::{seed_member, setup_state};

    use super::*;

    #[tokio::test]
    async fn delete_requires_delete_permission() {
        let (_dir, _database, state) = setup_state().await;
        let workspace = state
            .workspace_service
            .create_workspace("owner-1", "Coop", None)
            .await
            .expect("workspace");
        seed_member(&state, &workspace.id, "admin-1", "admin").await;

        let err = state
            .workspace_service
            .delete_workspace("admin-1", &workspace.id)
            .await
            .expect_err("admins cannot delete");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(state.workspace_service.fetch_workspace(&workspace.id).await.is_ok());
    }

    #[tokio::test]
    async fn delete_removes_stored_objects() {
        let (_dir, database, state) = setup_state().await;
        let owner = UserId::from("owner-1");
        let workspace = state
            .workspace_service
            .create_workspace(&owner, "Coop", None)
            .await
            .expect("workspace");

        let key = DocumentStore::storage_key_for(&workspace.id, "ext-1", "deed.pdf");
        let descriptor = BlobDescriptor::new(state.storage_bucket.as_str(), key.as_str());
        let location = state
            .blob_store
            .put(&descriptor, b"deed", BlobMetadata::default())
            .await
            .expect("put");
        DocumentStore::new(&database)
            .create(
                &workspace.id,
                &owner,
                NewDocument {
                    external_id: "ext-1".to_owned(),
                    storage_key: key.clone(),
                    file_url: location.uri,
                    file_name: "deed.pdf".to_owned(),
                    content_type: None,
                    size: 4,
                },
            )
            .await
            .expect("document");

        state
            .workspace_service
            .delete_workspace(&owner, &workspace.id)
            .await
            .expect("delete");

        let remaining = state
            .blob_store
            .list(&state.storage_bucket, &workspace.id)
            .await
            .expect("list");
        assert!(remaining.is_empty());
        let err = state
            .workspace_service
            .get_workspace(&owner, &workspace.id)
            .await
            .expect_err("gone");
        assert_eq!(err.name(), "WORKSPACE_NOT_FOUND");
    }
}
