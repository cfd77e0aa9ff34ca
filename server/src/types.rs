// Request and response types for REST API handlers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use agrocoop_core::{
    analytics::TaskAnalytics,
    document::DocumentRecord,
    farmer::{FarmerRecord, MemberType},
    pagination::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, Pagination},
    permissions::{Permission, RoleName, RoleRecord},
    project::ProjectRecord,
    task::{TaskPriority, TaskRecord, TaskStatus},
    workspace::{UserWorkspaceMembership, WorkspaceRecord},
    workspace_member::WorkspaceMemberRecord,
};

use crate::error::AppError;

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// ========== Health ==========

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}

// ========== Pagination ==========

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaginationQuery {
    #[validate(range(min = 1, message = "pageSize must be a positive integer"))]
    pub(crate) page_size: Option<i64>,
    #[validate(range(min = 1, message = "pageNumber must be a positive integer"))]
    pub(crate) page_number: Option<i64>,
}

impl PaginationQuery {
    pub(crate) fn pagination(&self) -> Result<Pagination, AppError> {
        to_pagination(self.page_size, self.page_number)
    }
}

pub(crate) fn to_pagination(
    page_size: Option<i64>,
    page_number: Option<i64>,
) -> Result<Pagination, AppError> {
    Pagination::new(
        page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        page_number.unwrap_or(DEFAULT_PAGE_NUMBER),
    )
    .map_err(|err| AppError::validation(err.to_string()))
}

// ========== Workspace Types ==========

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateWorkspaceRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "description is too long"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UpdateWorkspaceRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 255, message = "name must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "description is too long"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangeMemberRoleRequest {
    #[validate(length(min = 1, message = "memberId is required"))]
    pub(crate) member_id: String,
    #[validate(length(min = 1, message = "roleId is required"))]
    pub(crate) role_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddMemberRequest {
    #[serde(alias = "userId")]
    #[validate(length(min = 1, message = "officerId is required"))]
    pub(crate) officer_id: String,
    #[serde(default)]
    pub(crate) role_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WorkspaceResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) owner_id: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<WorkspaceRecord> for WorkspaceResponse {
    fn from(record: WorkspaceRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            name: record.name,
            description: record.description,
            owner_id: record.owner_id.into_inner(),
            created_at: timestamp_to_datetime(record.created_at),
            updated_at: timestamp_to_datetime(record.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserWorkspaceResponse {
    #[serde(flatten)]
    pub(crate) workspace: WorkspaceResponse,
    pub(crate) role: String,
    pub(crate) joined_at: DateTime<Utc>,
}

impl From<UserWorkspaceMembership> for UserWorkspaceResponse {
    fn from(membership: UserWorkspaceMembership) -> Self {
        Self {
            workspace: membership.workspace.into(),
            role: membership.role_id.into_inner(),
            joined_at: timestamp_to_datetime(membership.joined_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoleResponse {
    pub(crate) id: String,
    pub(crate) name: RoleName,
    pub(crate) permissions: Vec<Permission>,
}

impl From<&RoleRecord> for RoleResponse {
    fn from(role: &RoleRecord) -> Self {
        Self {
            id: role.id.to_string(),
            name: role.name,
            permissions: role.permissions.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MemberResponse {
    pub(crate) user_id: String,
    pub(crate) workspace_id: String,
    pub(crate) role: Option<RoleResponse>,
    pub(crate) joined_at: DateTime<Utc>,
}

impl MemberResponse {
    pub(crate) fn new(record: WorkspaceMemberRecord, role: Option<&RoleRecord>) -> Self {
        Self {
            user_id: record.user_id.into_inner(),
            workspace_id: record.workspace_id.into_inner(),
            role: role.map(RoleResponse::from),
            joined_at: timestamp_to_datetime(record.joined_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MembersResponse {
    pub(crate) members: Vec<MemberResponse>,
    pub(crate) roles: Vec<RoleResponse>,
}

// ========== Project Types ==========

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CreateProjectRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(length(max = 16, message = "emoji is too long"))]
    pub(crate) emoji: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "description is too long"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UpdateProjectRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 255, message = "name must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 16, message = "emoji is too long"))]
    pub(crate) emoji: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "description is too long"))]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectResponse {
    pub(crate) id: String,
    pub(crate) workspace_id: String,
    pub(crate) name: String,
    pub(crate) emoji: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<ProjectRecord> for ProjectResponse {
    fn from(record: ProjectRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            workspace_id: record.workspace_id.into_inner(),
            name: record.name,
            emoji: record.emoji,
            description: record.description,
            created_by: record.created_by.into_inner(),
            created_at: timestamp_to_datetime(record.created_at),
            updated_at: timestamp_to_datetime(record.updated_at),
        }
    }
}

// ========== Task Types ==========

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTaskRequest {
    #[validate(
        length(min = 1, max = 255, message = "title must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) title: String,
    #[serde(default)]
    #[validate(length(max = 2000, message = "description is too long"))]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) status: TaskStatus,
    #[serde(default)]
    pub(crate) priority: TaskPriority,
    #[serde(default)]
    pub(crate) assigned_to: Option<String>,
    #[serde(default)]
    pub(crate) due_date: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub(crate) amount: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateTaskRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 255, message = "title must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "description is too long"))]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<TaskStatus>,
    #[serde(default)]
    pub(crate) priority: Option<TaskPriority>,
    #[serde(default)]
    pub(crate) assigned_to: Option<String>,
    #[serde(default)]
    pub(crate) due_date: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "amount must not be negative"))]
    pub(crate) amount: Option<f64>,
}

/// List filters; `status`, `priority` and `assignedTo` take comma-separated
/// values.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskListQuery {
    pub(crate) project_id: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) priority: Option<String>,
    pub(crate) assigned_to: Option<String>,
    pub(crate) keyword: Option<String>,
    pub(crate) due_date: Option<String>,
    #[validate(range(min = 1, message = "pageSize must be a positive integer"))]
    pub(crate) page_size: Option<i64>,
    #[validate(range(min = 1, message = "pageNumber must be a positive integer"))]
    pub(crate) page_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskResponse {
    pub(crate) id: String,
    pub(crate) workspace_id: String,
    pub(crate) project_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) status: TaskStatus,
    pub(crate) priority: TaskPriority,
    pub(crate) assigned_to: Option<String>,
    pub(crate) due_date: Option<DateTime<Utc>>,
    pub(crate) amount: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<TaskRecord> for TaskResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            workspace_id: record.workspace_id.into_inner(),
            project_id: record.project_id.into_inner(),
            title: record.title,
            description: record.description,
            status: record.status,
            priority: record.priority,
            assigned_to: record.assigned_to.map(|id| id.into_inner()),
            due_date: record.due_date.map(timestamp_to_datetime),
            amount: record.amount,
            created_by: record.created_by.into_inner(),
            created_at: timestamp_to_datetime(record.created_at),
            updated_at: timestamp_to_datetime(record.updated_at),
        }
    }
}

// ========== Farmer Types ==========

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFarmerRequest {
    #[validate(
        length(min = 1, max = 255, message = "fullName must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) full_name: String,
    #[validate(length(min = 10, max = 15, message = "phoneNumber must be 10 to 15 characters"))]
    pub(crate) phone_number: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(range(min = 0.0, message = "landArea must not be negative"))]
    pub(crate) land_area: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "avgYieldSoldToMarket must not be negative"))]
    pub(crate) avg_yield_sold_to_market: f64,
    #[validate(
        length(min = 1, max = 100, message = "nationalId must be between 1 and 100 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) national_id: String,
    pub(crate) member_type: MemberType,
    #[serde(default)]
    pub(crate) joined_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateFarmerRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 255, message = "fullName must be between 1 and 255 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 10, max = 15, message = "phoneNumber must be 10 to 15 characters"))]
    pub(crate) phone_number: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "landArea must not be negative"))]
    pub(crate) land_area: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "avgYieldSoldToMarket must not be negative"))]
    pub(crate) avg_yield_sold_to_market: Option<f64>,
    #[serde(default)]
    #[validate(
        length(min = 1, max = 100, message = "nationalId must be between 1 and 100 characters"),
        custom(function = "non_blank")
    )]
    pub(crate) national_id: Option<String>,
    #[serde(default)]
    pub(crate) member_type: Option<MemberType>,
    #[serde(default)]
    pub(crate) joined_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FarmerListQuery {
    pub(crate) member_type: Option<String>,
    pub(crate) keyword: Option<String>,
    #[validate(range(min = 1, message = "pageSize must be a positive integer"))]
    pub(crate) page_size: Option<i64>,
    #[validate(range(min = 1, message = "pageNumber must be a positive integer"))]
    pub(crate) page_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FarmerResponse {
    pub(crate) id: String,
    pub(crate) workspace_id: String,
    pub(crate) full_name: String,
    pub(crate) phone_number: String,
    pub(crate) email: String,
    pub(crate) land_area: f64,
    pub(crate) avg_yield_sold_to_market: f64,
    pub(crate) member_type: MemberType,
    pub(crate) national_id: String,
    pub(crate) joined_date: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl From<FarmerRecord> for FarmerResponse {
    fn from(record: FarmerRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            workspace_id: record.workspace_id.into_inner(),
            full_name: record.full_name,
            phone_number: record.phone_number,
            email: record.email,
            land_area: record.land_area,
            avg_yield_sold_to_market: record.avg_yield_sold_to_market,
            member_type: record.member_type,
            national_id: record.national_id,
            joined_date: timestamp_to_datetime(record.joined_at),
            created_at: timestamp_to_datetime(record.created_at),
            updated_at: timestamp_to_datetime(record.updated_at),
        }
    }
}

// ========== Document Types ==========

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListDocumentsRequest {
    #[validate(length(min = 1, message = "cooperativeId is required"))]
    pub(crate) cooperative_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteDocumentRequest {
    #[validate(length(min = 1, message = "documentId is required"))]
    pub(crate) document_id: String,
    #[validate(length(min = 1, message = "fileUrl is required"))]
    pub(crate) file_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DocumentResponse {
    pub(crate) id: String,
    pub(crate) external_id: String,
    pub(crate) cooperative_id: String,
    pub(crate) file_name: String,
    pub(crate) file_url: String,
    pub(crate) content_type: Option<String>,
    pub(crate) size: i64,
    pub(crate) uploaded_by: String,
    pub(crate) uploaded_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            external_id: record.external_id,
            cooperative_id: record.workspace_id.into_inner(),
            file_name: record.file_name,
            file_url: record.file_url,
            content_type: record.content_type,
            size: record.size,
            uploaded_by: record.uploaded_by.into_inner(),
            uploaded_at: timestamp_to_datetime(record.uploaded_at),
        }
    }
}

// ========== Analytics ==========

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalyticsResponse {
    pub(crate) message: &'static str,
    pub(crate) analytics: TaskAnalytics,
}

// ========== Helpers ==========

pub(crate) fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

/// Accepts RFC 3339 instants or plain `YYYY-MM-DD` dates (midnight UTC).
pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<i64, AppError> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.timestamp());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp())
        .ok_or_else(|| {
            AppError::validation(format!(
                "{field}: invalid date format. Please provide a valid date string."
            ))
        })
}

pub(crate) fn parse_optional_timestamp(
    field: &str,
    value: Option<&str>,
) -> Result<Option<i64>, AppError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_timestamp(field, value))
        .transpose()
}

/// Splits a comma-separated query value, dropping blanks.
pub(crate) fn split_list(value: Option<&str>) -> Vec<&str> {
    value
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_instants() {
        assert_eq!(parse_timestamp("dueDate", "2024-06-01").expect("date"), 1_717_200_000);
        assert_eq!(
            parse_timestamp("dueDate", "2024-06-01T12:00:00Z").expect("instant"),
            1_717_243_200
        );
        assert!(parse_timestamp("dueDate", "next week").is_err());
        assert_eq!(parse_optional_timestamp("dueDate", Some("  ")).expect("blank"), None);
    }

    #[test]
    fn splits_comma_lists() {
        assert_eq!(split_list(Some("TODO, DONE,,")), vec!["TODO", "DONE"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn pagination_rejects_non_positive_values() {
        let query = PaginationQuery {
            page_size: Some(0),
            page_number: None,
        };
        assert!(query.validate().is_err());

        let pagination = to_pagination(None, Some(3)).expect("defaults");
        assert_eq!(pagination.page_size, 10);
        assert_eq!(pagination.skip(), 20);
    }

    #[test]
    fn farmer_request_checks_contact_fields() {
        let request: CreateFarmerRequest = serde_json::from_value(serde_json::json!({
            "fullName": "Amina Njeri",
            "phoneNumber": "0712",
            "email": "not-an-email",
            "landArea": 2.5,
            "nationalId": "NID-1",
            "memberType": "animal rearer",
        }))
        .expect("deserialize");
        let errors = request.validate().expect_err("invalid contact fields");
        let fields = errors.field_errors();
        assert!(fields.contains_key("phone_number"));
        assert!(fields.contains_key("email"));
        assert_eq!(request.member_type, MemberType::AnimalRearer);
    }
}
