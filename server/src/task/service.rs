use std::sync::Arc;

use axum::extract::FromRef;
use tracing::info;

use agrocoop_core::{
    ids::{ProjectId, UserId, WorkspaceId},
    pagination::{Page, Pagination},
    permissions::Permission,
    task::{NewTask, TaskChanges, TaskFilter, TaskRecord, TaskStore},
    workspace::WorkspaceStore,
};

use crate::{
    AppError, access::AccessService, project::service::ProjectService, state::AppState,
};

pub struct TaskService {
    task_store: TaskStore,
    workspace_store: WorkspaceStore,
    project_service: Arc<ProjectService>,
    access: Arc<AccessService>,
}

impl TaskService {
    pub fn new(
        task_store: TaskStore,
        workspace_store: WorkspaceStore,
        project_service: Arc<ProjectService>,
        access: Arc<AccessService>,
    ) -> Self {
        Self {
            task_store,
            workspace_store,
            project_service,
            access,
        }
    }

    pub async fn fetch_task(&self, workspace_id: &str, task_id: &str) -> Result<TaskRecord, AppError> {
        self.task_store
            .find(workspace_id, task_id)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::task_not_found(workspace_id, task_id))
    }

    /// The project must live in the workspace and an assignee, when given,
    /// must be one of its members.
    pub async fn create_task(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
        input: NewTask,
    ) -> Result<TaskRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::CreateTask])
            .await?;
        self.project_service
            .fetch_project(workspace_id, project_id)
            .await?;
        if let Some(assignee) = input.assigned_to.as_ref() {
            self.ensure_assignee_is_member(workspace_id, assignee).await?;
        }

        let task = self
            .task_store
            .create(
                &WorkspaceId::from(workspace_id),
                &ProjectId::from(project_id),
                &UserId::from(user_id),
                input,
            )
            .await
            .map_err(AppError::from_anyhow)?;
        info!(workspace_id, project_id, task_id = %task.id, "loan created");
        Ok(task)
    }

    pub async fn list_tasks(
        &self,
        user_id: &str,
        workspace_id: &str,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> Result<Page<TaskRecord>, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;

        self.task_store
            .list(workspace_id, filter, pagination)
            .await
            .map_err(AppError::from_anyhow)
    }

    pub async fn get_task(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
        task_id: &str,
    ) -> Result<TaskRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::ViewOnly])
            .await?;
        self.fetch_task_in_project(workspace_id, project_id, task_id)
            .await
    }

    pub async fn update_task(
        &self,
        user_id: &str,
        workspace_id: &str,
        project_id: &str,
        task_id: &str,
        changes: TaskChanges,
    ) -> Result<TaskRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::EditTask])
            .await?;
        self.fetch_task_in_project(workspace_id, project_id, task_id)
            .await?;
        if let Some(assignee) = changes.assigned_to.as_ref() {
            self.ensure_assignee_is_member(workspace_id, assignee).await?;
        }

        self.task_store
            .update(workspace_id, task_id, changes)
            .await
            .map_err(AppError::from_anyhow)?
            .ok_or_else(|| AppError::task_not_found(workspace_id, task_id))
    }

    pub async fn delete_task(
        &self,
        user_id: &str,
        workspace_id: &str,
        task_id: &str,
    ) -> Result<TaskRecord, AppError> {
        self.access
            .authorize(user_id, workspace_id, &[Permission::DeleteTask])
            .await?;
        let task = self.fetch_task(workspace_id, task_id).await?;

        let deleted = self
            .task_store
            .delete(workspace_id, task_id)
            .await
            .map_err(AppError::from_anyhow)?;
        if !deleted {
            return Err(AppError::task_not_found(workspace_id, task_id));
        }

        info!(workspace_id, task_id, "loan deleted");
        Ok(task)
    }

    async fn fetch_task_in_project(
        &self,
        workspace_id: &str,
        project_id: &str,
        task_id: &str,
    ) -> Result<TaskRecord, AppError> {
        self.project_service
            .fetch_project(workspace_id, project_id)
            .await?;
        let task = self.fetch_task(workspace_id, task_id).await?;
        if task.project_id.as_str() != project_id {
            return Err(AppError::task_not_found(workspace_id, task_id));
        }
        Ok(task)
    }

    async fn ensure_assignee_is_member(
        &self,
        workspace_id: &str,
        assignee: &UserId,
    ) -> Result<(), AppError> {
        let member = self
            .workspace_store
            .get_member(workspace_id, assignee)
            .await
            .map_err(AppError::from_anyhow)?;
        if member.is_none() {
            return Err(AppError::bad_request(
                "Assigned user is not a member of this workspace.",
            ));
        }
        Ok(())
    }
}

impl FromRef<AppState> for Arc<TaskService> {
    fn from_ref(state: &AppState) -> Arc<TaskService> {
        Arc::clone(&state.task_service)
    }
}

#[cfg(test)]
mod tests {
    use agrocoop_core::task::{TaskPriority, TaskStatus};
    use axum::http::StatusCode;

    use super::*;
    use crate::test_support::{seed_member, seed_workspace, setup_state};

    fn loan(title: &str, assigned_to: Option<&str>) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            assigned_to: assigned_to.map(UserId::from),
            due_date: None,
            amount: 250.0,
        }
    }

    #[tokio::test]
    async fn assignee_must_be_workspace_member() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;
        let project = state
            .project_service
            .create_project(&owner_id, &workspace_id, "Maize", None, None)
            .await
            .expect("project");

        let err = state
            .task_service
            .create_task(&owner_id, &workspace_id, &project.id, loan("Seed loan", Some("stranger")))
            .await
            .expect_err("stranger assignee");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        seed_member(&state, &workspace_id, "officer-1", "member").await;
        let task = state
            .task_service
            .create_task(&owner_id, &workspace_id, &project.id, loan("Seed loan", Some("officer-1")))
            .await
            .expect("member assignee");
        assert_eq!(task.assigned_to.as_deref(), Some("officer-1"));
    }

    #[tokio::test]
    async fn task_lookup_is_scoped_to_project() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;
        let maize = state
            .project_service
            .create_project(&owner_id, &workspace_id, "Maize", None, None)
            .await
            .expect("maize");
        let beans = state
            .project_service
            .create_project(&owner_id, &workspace_id, "Beans", None, None)
            .await
            .expect("beans");
        let task = state
            .task_service
            .create_task(&owner_id, &workspace_id, &maize.id, loan("Fertilizer", None))
            .await
            .expect("task");

        let err = state
            .task_service
            .get_task(&owner_id, &workspace_id, &beans.id, &task.id)
            .await
            .expect_err("wrong project");
        assert_eq!(err.name(), "TASK_NOT_FOUND");

        let missing_project = state
            .task_service
            .create_task(&owner_id, &workspace_id, "missing", loan("Tools", None))
            .await
            .expect_err("unknown project");
        assert_eq!(missing_project.name(), "PROJECT_NOT_FOUND");
    }

    #[tokio::test]
    async fn members_cannot_delete_loans() {
        let (_dir, _database, state) = setup_state().await;
        let (workspace_id, owner_id) = seed_workspace(&state).await;
        seed_member(&state, &workspace_id, "officer-1", "member").await;
        let project = state
            .project_service
            .create_project(&owner_id, &workspace_id, "Maize", None, None)
            .await
            .expect("project");
        let task = state
            .task_service
            .create_task("officer-1", &workspace_id, &project.id, loan("Seed loan", None))
            .await
            .expect("members create loans");

        let err = state
            .task_service
            .delete_task("officer-1", &workspace_id, &task.id)
            .await
            .expect_err("no delete permission");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        state
            .task_service
            .delete_task(&owner_id, &workspace_id, &task.id)
            .await
            .expect("owner deletes");
    }
}
