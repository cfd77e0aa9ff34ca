use anyhow::Result;
use chrono::Utc;

use crate::{
    db::{
        Database,
        workspace_repo::{CreateWorkspaceParams, UpdateWorkspaceParams, WorkspaceRepositoryRef},
    },
    ids::{RoleId, UserId, WorkspaceId},
    permissions::RoleName,
    workspace_member::WorkspaceMemberRecord,
};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A workspace together with the caller's role in it.
#[derive(Debug, Clone)]
pub struct UserWorkspaceMembership {
    pub workspace: WorkspaceRecord,
    pub role_id: RoleId,
    pub joined_at: i64,
}

/// Storage keys released by a workspace delete; the caller removes the
/// objects once the rows are gone.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceDeletion {
    pub document_keys: Vec<String>,
}

#[derive(Clone)]
pub struct WorkspaceStore {
    workspace_repo: WorkspaceRepositoryRef,
}

impl WorkspaceStore {
    pub fn new(database: &Database) -> Self {
        Self {
            workspace_repo: database.repositories().workspace_repo(),
        }
    }

    /// Creates the workspace and the owner's membership in one transaction.
    pub async fn create(
        &self,
        owner_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<WorkspaceRecord> {
        let now = Utc::now().timestamp();
        self.workspace_repo
            .create_workspace(CreateWorkspaceParams {
                id: WorkspaceId::generate(),
                name: name.trim().to_owned(),
                description: normalize_optional(description),
                owner_id: owner_id.clone(),
                owner_role_id: RoleName::Owner.role_id(),
                created_at: now,
            })
            .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<WorkspaceRecord>> {
        self.workspace_repo.fetch_workspace(id).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserWorkspaceMembership>> {
        self.workspace_repo.list_memberships_for_user(user_id).await
    }

    /// Partial update; returns the refreshed record or `None` when the
    /// workspace does not exist.
    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<WorkspaceRecord>> {
        let updated = self
            .workspace_repo
            .update_workspace(UpdateWorkspaceParams {
                id: WorkspaceId::from(id),
                name: name.map(|value| value.trim().to_owned()),
                description: description.map(|value| normalize_optional(Some(value))),
                updated_at: Utc::now().timestamp(),
            })
            .await?;

        if !updated {
            return Ok(None);
        }

        self.workspace_repo.fetch_workspace(id).await
    }

    /// Deletes the workspace with every membership, project, task, farmer
    /// and document row it owns.
    pub async fn delete(&self, id: &str) -> Result<Option<WorkspaceDeletion>> {
        self.workspace_repo.delete_workspace_cascade(id).await
    }

    pub async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMemberRecord>> {
        self.workspace_repo.list_members(workspace_id).await
    }

    pub async fn get_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<WorkspaceMemberRecord>> {
        self.workspace_repo.get_member(workspace_id, user_id).await
    }

    pub async fn find_member_role(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<RoleId>> {
        self.workspace_repo
            .find_member_role(workspace_id, user_id)
            .await
    }

    pub async fn add_member(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<WorkspaceMemberRecord> {
        let record = WorkspaceMemberRecord::new(
            workspace_id.clone(),
            user_id.clone(),
            role_id.clone(),
            Utc::now().timestamp(),
        );
        self.workspace_repo.insert_member(&record).await?;
        Ok(record)
    }

    pub async fn change_member_role(
        &self,
        workspace_id: &str,
        user_id: &str,
        role_id: &RoleId,
    ) -> Result<Option<WorkspaceMemberRecord>> {
        let updated = self
            .workspace_repo
            .set_member_role(workspace_id, user_id, role_id)
            .await?;
        if !updated {
            return Ok(None);
        }
        self.workspace_repo.get_member(workspace_id, user_id).await
    }

    pub async fn remove_member(&self, workspace_id: &str, user_id: &str) -> Result<bool> {
        self.workspace_repo.delete_member(workspace_id, user_id).await
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_database;

    #[tokio::test]
    async fn create_registers_owner_membership() {
        let (_dir, database) = setup_database().await;
        let store = WorkspaceStore::new(&database);
        let owner = UserId::from("owner-1");

        let workspace = store
            .create(&owner, "  Green Valley Coop ", Some("  "))
            .await
            .expect("create workspace");
        assert_eq!(workspace.name, "Green Valley Coop");
        assert_eq!(workspace.description, None);

        let role = store
            .find_member_role(&workspace.id, &owner)
            .await
            .expect("role lookup");
        assert_eq!(role, Some(RoleName::Owner.role_id()));

        let listed = store.list_for_user(&owner).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].workspace.id, workspace.id);
    }

    #[tokio::test]
    async fn update_only_touches_provided_fields() {
        let (_dir, database) = setup_database().await;
        let store = WorkspaceStore::new(&database);
        let owner = UserId::from("owner-1");
        let workspace = store
            .create(&owner, "Coop", Some("maize growers"))
            .await
            .expect("create workspace");

        let updated = store
            .update(&workspace.id, Some("Coop North"), None)
            .await
            .expect("update")
            .expect("workspace exists");
        assert_eq!(updated.name, "Coop North");
        assert_eq!(updated.description.as_deref(), Some("maize growers"));

        let missing = store.update("missing", Some("x"), None).await.expect("update");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_member_is_rejected() {
        let (_dir, database) = setup_database().await;
        let store = WorkspaceStore::new(&database);
        let owner = UserId::from("owner-1");
        let workspace = store.create(&owner, "Coop", None).await.expect("create");

        let err = store
            .add_member(&workspace.id, &owner, &RoleName::Member.role_id())
            .await
            .expect_err("owner is already a member");
        assert!(crate::db::errors::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn delete_cascades_to_owned_rows() {
        use crate::{
            document::{DocumentStore, NewDocument},
            farmer::{FarmerFilter, FarmerStore, MemberType, NewFarmer},
            pagination::Pagination,
            project::ProjectStore,
        };

        let (_dir, database) = setup_database().await;
        let store = WorkspaceStore::new(&database);
        let owner = UserId::from("owner-1");
        let workspace = store.create(&owner, "Coop", None).await.expect("create");

        ProjectStore::new(&database)
            .create(&workspace.id, &owner, "Maize", None, None)
            .await
            .expect("project");
        FarmerStore::new(&database)
            .create(
                &workspace.id,
                NewFarmer {
                    full_name: "Amina Njeri".to_owned(),
                    phone_number: "0712345678".to_owned(),
                    email: "amina@coop.test".to_owned(),
                    land_area: 1.0,
                    avg_yield_sold_to_market: 0.0,
                    member_type: MemberType::Farmer,
                    national_id: "NID-1".to_owned(),
                    joined_at: None,
                },
            )
            .await
            .expect("farmer");
        DocumentStore::new(&database)
            .create(
                &workspace.id,
                &owner,
                NewDocument {
                    external_id: "ext-1".to_owned(),
                    storage_key: format!("{}/ext-1-deed.pdf", workspace.id),
                    file_url: "https://storage.test/deed.pdf".to_owned(),
                    file_name: "deed.pdf".to_owned(),
                    content_type: None,
                    size: 3,
                },
            )
            .await
            .expect("document");

        let deletion = store
            .delete(&workspace.id)
            .await
            .expect("delete")
            .expect("workspace existed");
        assert_eq!(
            deletion.document_keys,
            vec![format!("{}/ext-1-deed.pdf", workspace.id)]
        );

        assert!(store.find_by_id(&workspace.id).await.expect("find").is_none());
        assert!(store.list_members(&workspace.id).await.expect("members").is_empty());
        let farmers = FarmerStore::new(&database)
            .list(&workspace.id, &FarmerFilter::default(), Pagination::default())
            .await
            .expect("farmers");
        assert_eq!(farmers.info.total_count, 0);
        let projects = ProjectStore::new(&database)
            .list(&workspace.id, Pagination::default())
            .await
            .expect("projects");
        assert_eq!(projects.info.total_count, 0);

        assert!(store.delete(&workspace.id).await.expect("delete twice").is_none());
    }

    #[tokio::test]
    async fn member_role_change_and_removal() {
        let (_dir, database) = setup_database().await;
        let store = WorkspaceStore::new(&database);
        let owner = UserId::from("owner-1");
        let officer = UserId::from("officer-1");
        let workspace = store.create(&owner, "Coop", None).await.expect("create");

        store
            .add_member(&workspace.id, &officer, &RoleName::Member.role_id())
            .await
            .expect("add member");
        let changed = store
            .change_member_role(&workspace.id, &officer, &RoleName::Admin.role_id())
            .await
            .expect("change role")
            .expect("member exists");
        assert_eq!(changed.role_id, RoleName::Admin.role_id());

        assert!(store.remove_member(&workspace.id, &officer).await.expect("remove"));
        assert!(!store.remove_member(&workspace.id, &officer).await.expect("remove twice"));
        assert_eq!(store.list_members(&workspace.id).await.expect("members").len(), 1);
    }
}
