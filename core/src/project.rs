use anyhow::Result;
use chrono::Utc;

use crate::{
    db::{
        Database,
        project_repo::{ProjectRepositoryRef, UpdateProjectParams},
    },
    ids::{ProjectId, UserId, WorkspaceId},
    pagination::{Page, Pagination},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone)]
pub struct ProjectStore {
    project_repo: ProjectRepositoryRef,
}

impl ProjectStore {
    pub fn new(database: &Database) -> Self {
        Self {
            project_repo: database.repositories().project_repo(),
        }
    }

    pub async fn create(
        &self,
        workspace_id: &WorkspaceId,
        created_by: &UserId,
        name: &str,
        emoji: Option<&str>,
        description: Option<&str>,
    ) -> Result<ProjectRecord> {
        let now = Utc::now().timestamp();
        let record = ProjectRecord {
            id: ProjectId::generate(),
            workspace_id: workspace_id.clone(),
            name: name.trim().to_owned(),
            emoji: trimmed(emoji),
            description: trimmed(description),
            created_by: created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        self.project_repo.insert_project(&record).await?;
        Ok(record)
    }

    pub async fn find(&self, workspace_id: &str, id: &str) -> Result<Option<ProjectRecord>> {
        self.project_repo.fetch_project(workspace_id, id).await
    }

    pub async fn list(
        &self,
        workspace_id: &str,
        pagination: Pagination,
    ) -> Result<Page<ProjectRecord>> {
        let (items, total) = self
            .project_repo
            .list_projects(workspace_id, pagination)
            .await?;
        Ok(Page::new(items, total, pagination))
    }

    pub async fn update(
        &self,
        workspace_id: &str,
        id: &str,
        name: Option<&str>,
        emoji: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<ProjectRecord>> {
        let updated = self
            .project_repo
            .update_project(UpdateProjectParams {
                workspace_id: WorkspaceId::from(workspace_id),
                id: ProjectId::from(id),
                name: name.map(|value| value.trim().to_owned()),
                emoji: emoji.map(|value| trimmed(Some(value))),
                description: description.map(|value| trimmed(Some(value))),
                updated_at: Utc::now().timestamp(),
            })
            .await?;
        if !updated {
            return Ok(None);
        }
        self.project_repo.fetch_project(workspace_id, id).await
    }

    /// Removes the project and all of its tasks atomically.
    pub async fn delete(&self, workspace_id: &str, id: &str) -> Result<bool> {
        self.project_repo
            .delete_project_with_tasks(workspace_id, id)
            .await
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        task::{NewTask, TaskFilter, TaskStatus, TaskStore},
        test_support::setup_database,
    };

    #[tokio::test]
    async fn pagination_over_twenty_five_projects() {
        let (_dir, database) = setup_database().await;
        let store = ProjectStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let creator = UserId::from("user-1");

        for index in 0..25 {
            store
                .create(&workspace, &creator, &format!("Season {index}"), None, None)
                .await
                .expect("create project");
        }

        let page = store
            .list(&workspace, Pagination::new(10, 2).unwrap())
            .await
            .expect("list");
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.info.skip, 10);
        assert_eq!(page.info.total_count, 25);
        assert_eq!(page.info.total_pages, 3);
        // newest first: page two starts at the 15th project created
        assert_eq!(page.items[0].name, "Season 14");
    }

    #[tokio::test]
    async fn delete_removes_project_tasks() {
        let (_dir, database) = setup_database().await;
        let projects = ProjectStore::new(&database);
        let tasks = TaskStore::new(&database);
        let workspace = WorkspaceId::from("ws-1");
        let creator = UserId::from("user-1");

        let project = projects
            .create(&workspace, &creator, "Maize", Some("🌽"), None)
            .await
            .expect("project");
        let sibling = projects
            .create(&workspace, &creator, "Beans", None, None)
            .await
            .expect("sibling");

        for target in [&project, &project, &sibling] {
            tasks
                .create(
                    &workspace,
                    &target.id,
                    &creator,
                    NewTask {
                        title: "Seed loan".to_owned(),
                        description: None,
                        status: TaskStatus::Todo,
                        priority: Default::default(),
                        assigned_to: None,
                        due_date: None,
                        amount: 10.0,
                    },
                )
                .await
                .expect("task");
        }

        assert!(projects.delete(&workspace, &project.id).await.expect("delete"));
        assert!(projects.find(&workspace, &project.id).await.expect("find").is_none());

        let remaining = tasks
            .list(&workspace, &TaskFilter::default(), Pagination::default())
            .await
            .expect("list tasks");
        assert_eq!(remaining.info.total_count, 1);
        assert_eq!(remaining.items[0].project_id, sibling.id);

        assert!(!projects.delete(&workspace, &project.id).await.expect("delete again"));
    }
}
