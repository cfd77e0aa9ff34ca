use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    ids::{RoleId, UserId, WorkspaceId},
    workspace::{UserWorkspaceMembership, WorkspaceDeletion, WorkspaceRecord},
    workspace_member::WorkspaceMemberRecord,
};

#[derive(Debug, Clone)]
pub struct CreateWorkspaceParams {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub owner_role_id: RoleId,
    pub created_at: i64,
}

/// `description: Some(None)` clears the stored value.
#[derive(Debug, Clone)]
pub struct UpdateWorkspaceParams {
    pub id: WorkspaceId,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub updated_at: i64,
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn create_workspace(&self, params: CreateWorkspaceParams) -> Result<WorkspaceRecord>;

    async fn fetch_workspace(&self, id: &str) -> Result<Option<WorkspaceRecord>>;

    async fn update_workspace(&self, params: UpdateWorkspaceParams) -> Result<bool>;

    async fn delete_workspace_cascade(&self, id: &str) -> Result<Option<WorkspaceDeletion>>;

    async fn list_memberships_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserWorkspaceMembership>>;

    async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMemberRecord>>;

    async fn get_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<WorkspaceMemberRecord>>;

    async fn find_member_role(&self, workspace_id: &str, user_id: &str) -> Result<Option<RoleId>>;

    async fn insert_member(&self, record: &WorkspaceMemberRecord) -> Result<()>;

    async fn set_member_role(
        &self,
        workspace_id: &str,
        user_id: &str,
        role_id: &RoleId,
    ) -> Result<bool>;

    async fn delete_member(&self, workspace_id: &str, user_id: &str) -> Result<bool>;
}

pub type WorkspaceRepositoryRef = Arc<dyn WorkspaceRepository>;
