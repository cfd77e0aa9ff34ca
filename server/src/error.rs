use std::fmt;

use anyhow::Error as AnyError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::error;
use validator::ValidationErrors;

use agrocoop_core::db::errors::is_unique_violation;

#[derive(Debug, Clone, Copy)]
struct ErrorDescriptor {
    status: StatusCode,
    name: &'static str,
    error_type: &'static str,
    default_message: &'static str,
}

const VALIDATION_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::BAD_REQUEST,
    name: "VALIDATION_ERROR",
    error_type: "VALIDATION_ERROR",
    default_message: "Request validation failed.",
};

const BAD_REQUEST_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::BAD_REQUEST,
    name: "BAD_REQUEST",
    error_type: "BAD_REQUEST",
    default_message: "Bad request.",
};

const UNAUTHORIZED_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::UNAUTHORIZED,
    name: "AUTHENTICATION_REQUIRED",
    error_type: "AUTHENTICATION_REQUIRED",
    default_message: "You must sign in first to access this resource.",
};

const CONFLICT_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::CONFLICT,
    name: "RESOURCE_ALREADY_EXISTS",
    error_type: "RESOURCE_ALREADY_EXISTS",
    default_message: "Resource already exists.",
};

const NOT_FOUND_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::NOT_FOUND,
    name: "NOT_FOUND",
    error_type: "RESOURCE_NOT_FOUND",
    default_message: "Resource not found.",
};

const FORBIDDEN_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::FORBIDDEN,
    name: "ACTION_FORBIDDEN",
    error_type: "ACTION_FORBIDDEN",
    default_message: "Action forbidden.",
};

const INTERNAL_SERVER_ERROR_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::INTERNAL_SERVER_ERROR,
    name: "INTERNAL_SERVER_ERROR",
    error_type: "INTERNAL_SERVER_ERROR",
    default_message: "An internal error occurred.",
};

#[derive(Debug)]
pub struct AppError {
    descriptor: &'static ErrorDescriptor,
    name: String,
    error_type: String,
    message: String,
    data: Option<JsonValue>,
    source: Option<AnyError>,
}

impl AppError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::from_descriptor(&VALIDATION_DESCRIPTOR, Some(message.into()))
    }

    /// Collapses field errors into one message and keeps the per-field
    /// detail under `data`.
    pub(crate) fn from_validation(errors: &ValidationErrors) -> Self {
        let mut fields = serde_json::Map::new();
        let mut messages = Vec::new();

        for (field, field_errors) in errors.field_errors() {
            let details: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", error.code))
                })
                .collect();
            messages.extend(details.iter().cloned());
            fields.insert(field.to_string(), json!(details));
        }
        messages.sort();

        let message = if messages.is_empty() {
            VALIDATION_DESCRIPTOR.default_message.to_owned()
        } else {
            messages.join("; ")
        };

        Self::validation(message).with_data(json!({ "fields": fields }))
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::from_descriptor(&BAD_REQUEST_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::from_descriptor(&UNAUTHORIZED_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::from_descriptor(&FORBIDDEN_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::from_descriptor(&CONFLICT_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn internal(error: AnyError) -> Self {
        error!(error = format!("{error:#}"), "internal server error");
        Self::from_descriptor(&INTERNAL_SERVER_ERROR_DESCRIPTOR, None).with_source(error)
    }

    pub(crate) fn from_anyhow(error: AnyError) -> Self {
        Self::internal(error)
    }

    /// Unique-constraint failures become `409` with `message`; everything
    /// else is internal.
    pub(crate) fn conflict_or_internal(error: AnyError, message: &str) -> Self {
        if is_unique_violation(&error) {
            Self::conflict(message)
        } else {
            Self::internal(error)
        }
    }

    pub(crate) fn workspace_not_found(workspace_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let message = format!("Workspace {workspace_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("WORKSPACE_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id }))
    }

    pub(crate) fn member_not_found(workspace_id: &str, user_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let user_id = user_id.to_owned();
        let message = format!("User {user_id} is not a member of workspace {workspace_id}.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("MEMBER_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id, "userId": user_id }))
    }

    pub(crate) fn role_not_found(role_id: &str) -> Self {
        let role_id = role_id.to_owned();
        let message = format!("Role {role_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("ROLE_NOT_FOUND")
            .with_data(json!({ "roleId": role_id }))
    }

    pub(crate) fn project_not_found(workspace_id: &str, project_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let project_id = project_id.to_owned();
        let message = format!("Project {project_id} not found in workspace {workspace_id}.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("PROJECT_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id, "projectId": project_id }))
    }

    pub(crate) fn task_not_found(workspace_id: &str, task_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let task_id = task_id.to_owned();
        let message = format!("Task {task_id} not found in workspace {workspace_id}.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("TASK_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id, "taskId": task_id }))
    }

    pub(crate) fn farmer_not_found(workspace_id: &str, farmer_id: &str) -> Self {
        let workspace_id = workspace_id.to_owned();
        let farmer_id = farmer_id.to_owned();
        let message = format!("Farmer {farmer_id} not found in workspace {workspace_id}.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("FARMER_NOT_FOUND")
            .with_data(json!({ "workspaceId": workspace_id, "farmerId": farmer_id }))
    }

    pub(crate) fn document_not_found(document_id: &str) -> Self {
        let document_id = document_id.to_owned();
        let message = format!("Document {document_id} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("DOCUMENT_NOT_FOUND")
            .with_data(json!({ "documentId": document_id }))
    }

    pub(crate) fn permission_denied() -> Self {
        Self::from_descriptor(
            &FORBIDDEN_DESCRIPTOR,
            Some("You do not have the necessary permissions to perform this action.".to_owned()),
        )
        .with_name("PERMISSION_DENIED")
        .with_error_type("NO_PERMISSION")
    }

    pub(crate) fn into_payload(self) -> (StatusCode, UserFriendlyPayload) {
        let AppError {
            descriptor,
            name,
            error_type,
            message,
            data,
            source: _,
        } = self;

        let status = descriptor.status;
        let (code, reason) = code_and_reason(status);
        let payload = UserFriendlyPayload {
            status: status.as_u16(),
            code,
            reason,
            error_type,
            name,
            message,
            data,
        };

        (status, payload)
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.descriptor.status
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn from_descriptor(descriptor: &'static ErrorDescriptor, message: Option<String>) -> Self {
        Self {
            descriptor,
            name: descriptor.name.to_owned(),
            error_type: descriptor.error_type.to_owned(),
            message: message.unwrap_or_else(|| descriptor.default_message.to_owned()),
            data: None,
            source: None,
        }
    }

    fn with_source(mut self, error: AnyError) -> Self {
        self.source = Some(error);
        self
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }

    pub(crate) fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = self.into_payload();
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserFriendlyPayload {
    pub(crate) status: u16,
    pub(crate) code: String,
    pub(crate) reason: String,
    #[serde(rename = "type")]
    pub(crate) error_type: String,
    pub(crate) name: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<JsonValue>,
}

fn code_and_reason(status: StatusCode) -> (String, String) {
    let reason = status
        .canonical_reason()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Status {}", status.as_u16()));

    let code = reason
        .chars()
        .map(|ch| match ch {
            'a'..='z' => ch.to_ascii_uppercase(),
            'A'..='Z' | '0'..='9' => ch,
            _ => '_',
        })
        .collect::<String>();

    (code, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn http_error_payload_matches_contract() {
        let (status, json) = body_json(AppError::bad_request("file is required")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
        assert_eq!(json["code"], "BAD_REQUEST");
        assert_eq!(json["reason"], "Bad Request");
        assert_eq!(json["type"], "BAD_REQUEST");
        assert_eq!(json["name"], "BAD_REQUEST");
        assert_eq!(json["message"], "file is required");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn farmer_not_found_includes_domain_metadata() {
        let (status, json) = body_json(AppError::farmer_not_found("ws-1", "farmer-9")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["type"], "RESOURCE_NOT_FOUND");
        assert_eq!(json["name"], "FARMER_NOT_FOUND");
        assert_eq!(json["message"], "Farmer farmer-9 not found in workspace ws-1.");
        assert_eq!(json["data"]["workspaceId"], "ws-1");
        assert_eq!(json["data"]["farmerId"], "farmer-9");
    }

    #[tokio::test]
    async fn permission_denied_does_not_mention_membership() {
        let (status, json) = body_json(AppError::permission_denied()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["type"], "NO_PERMISSION");
        assert_eq!(json["name"], "PERMISSION_DENIED");
        let message = json["message"].as_str().unwrap().to_ascii_lowercase();
        assert!(!message.contains("member"));
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[tokio::test]
    async fn validation_errors_carry_field_details() {
        let errors = Probe {
            name: String::new(),
        }
        .validate()
        .expect_err("empty name");
        let (status, json) = body_json(AppError::from_validation(&errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["type"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "name is required");
        assert_eq!(json["data"]["fields"]["name"][0], "name is required");
    }

    #[test]
    fn unique_violations_map_to_conflict() {
        let error = anyhow::anyhow!("UNIQUE constraint failed: farmers.national_id");
        let mapped = AppError::conflict_or_internal(error, "national ID already registered");
        assert_eq!(mapped.status(), StatusCode::CONFLICT);
    }
}
