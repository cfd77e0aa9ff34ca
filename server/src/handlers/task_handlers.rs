// Loan (task) handlers

use std::{str::FromStr, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use agrocoop_core::{
    ids::{ProjectId, UserId},
    task::{NewTask, TaskChanges, TaskFilter},
};

use crate::{
    auth::authenticate,
    error::AppError,
    extract::{ValidatedJson, ValidatedQuery},
    task::service::TaskService,
    types::{
        CreateTaskRequest, TaskListQuery, TaskResponse, UpdateTaskRequest,
        parse_optional_timestamp, split_list, to_pagination,
    },
};

fn parse_list<T>(field: &str, value: Option<&str>) -> Result<Vec<T>, AppError>
where
    T: FromStr<Err = anyhow::Error>,
{
    split_list(value)
        .into_iter()
        .map(|item| {
            item.parse::<T>()
                .map_err(|err| AppError::validation(format!("{field}: {err}")))
        })
        .collect()
}

fn assignee(value: Option<&str>) -> Option<UserId> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::from)
}

impl TaskListQuery {
    fn filter(&self) -> Result<TaskFilter, AppError> {
        Ok(TaskFilter {
            project_id: self
                .project_id
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ProjectId::from),
            statuses: parse_list("status", self.status.as_deref())?,
            priorities: parse_list("priority", self.priority.as_deref())?,
            assignees: split_list(self.assigned_to.as_deref())
                .into_iter()
                .map(UserId::from)
                .collect(),
            keyword: self.keyword.clone(),
            due_on: parse_optional_timestamp("dueDate", self.due_date.as_deref())?,
        })
    }
}

pub(crate) async fn create_task_handler(
    Path((project_id, workspace_id)): Path<(String, String)>,
    State(tasks): State<Arc<TaskService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<CreateTaskRequest>,
) -> Result<Response, AppError> {
    let due_date = parse_optional_timestamp("dueDate", payload.due_date.as_deref())?;
    let user_id = authenticate(&headers)?;

    let task = tasks
        .create_task(
            &user_id,
            &workspace_id,
            &project_id,
            NewTask {
                title: payload.title,
                description: payload.description,
                status: payload.status,
                priority: payload.priority,
                assigned_to: assignee(payload.assigned_to.as_deref()),
                due_date,
                amount: payload.amount,
            },
        )
        .await?;

    let body = json!({
        "message": "Loan created successfully",
        "task": TaskResponse::from(task),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn list_tasks_handler(
    Path(workspace_id): Path<String>,
    State(tasks): State<Arc<TaskService>>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<TaskListQuery>,
) -> Result<Response, AppError> {
    let filter = query.filter()?;
    let pagination = to_pagination(query.page_size, query.page_number)?;
    let user_id = authenticate(&headers)?;

    let page = tasks
        .list_tasks(&user_id, &workspace_id, &filter, pagination)
        .await?
        .map(TaskResponse::from);

    Ok(Json(json!({
        "message": "All loans fetched successfully",
        "tasks": page.items,
        "pagination": page.info,
    }))
    .into_response())
}

pub(crate) async fn get_task_handler(
    Path((task_id, project_id, workspace_id)): Path<(String, String, String)>,
    State(tasks): State<Arc<TaskService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let task = tasks
        .get_task(&user_id, &workspace_id, &project_id, &task_id)
        .await?;

    Ok(Json(json!({
        "message": "Loan fetched successfully",
        "task": TaskResponse::from(task),
    }))
    .into_response())
}

pub(crate) async fn update_task_handler(
    Path((task_id, project_id, workspace_id)): Path<(String, String, String)>,
    State(tasks): State<Arc<TaskService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<UpdateTaskRequest>,
) -> Result<Response, AppError> {
    let due_date = parse_optional_timestamp("dueDate", payload.due_date.as_deref())?;
    let user_id = authenticate(&headers)?;

    let task = tasks
        .update_task(
            &user_id,
            &workspace_id,
            &project_id,
            &task_id,
            TaskChanges {
                title: payload.title,
                description: payload.description,
                status: payload.status,
                priority: payload.priority,
                assigned_to: assignee(payload.assigned_to.as_deref()),
                due_date,
                amount: payload.amount,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Loan updated successfully",
        "task": TaskResponse::from(task),
    }))
    .into_response())
}

pub(crate) async fn delete_task_handler(
    Path((task_id, workspace_id)): Path<(String, String)>,
    State(tasks): State<Arc<TaskService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let task = tasks.delete_task(&user_id, &workspace_id, &task_id).await?;

    Ok(Json(json!({
        "message": "Loan deleted successfully",
        "taskId": task.id,
    }))
    .into_response())
}
