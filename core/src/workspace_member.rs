use crate::ids::{RoleId, UserId, WorkspaceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMemberRecord {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub joined_at: i64,
}

impl WorkspaceMemberRecord {
    pub fn new(workspace_id: WorkspaceId, user_id: UserId, role_id: RoleId, joined_at: i64) -> Self {
        Self {
            workspace_id,
            user_id,
            role_id,
            joined_at,
        }
    }
}
