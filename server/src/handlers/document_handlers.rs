// Document upload and storage handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    auth::authenticate,
    document::service::{DocumentService, UploadedFile},
    error::AppError,
    extract::{ValidatedJson, ValidatedQuery},
    types::{DeleteDocumentRequest, DocumentResponse, ListDocumentsRequest, PaginationQuery},
};

/// Uploads larger than this are rejected by the router before reaching the
/// handler.
pub(crate) const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn multipart_error(err: MultipartError) -> AppError {
    AppError::bad_request(err.body_text())
}

struct UploadForm {
    cooperative_id: Option<String>,
    file: Option<UploadedFile>,
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        cooperative_id: None,
        file: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("cooperativeId") => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim();
                if !value.is_empty() {
                    form.cooperative_id = Some(value.to_string());
                }
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

pub(crate) async fn upload_document_handler(
    State(documents): State<Arc<DocumentService>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_upload_form(&mut multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    let workspace_id = form
        .cooperative_id
        .ok_or_else(|| AppError::bad_request("cooperativeId is required"))?;
    let user_id = authenticate(&headers)?;

    let document = documents.upload(&user_id, &workspace_id, file).await?;

    let body = json!({
        "message": "File uploaded successfully",
        "document": DocumentResponse::from(document),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn list_documents_handler(
    State(documents): State<Arc<DocumentService>>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<PaginationQuery>,
    ValidatedJson(payload): ValidatedJson<ListDocumentsRequest>,
) -> Result<Response, AppError> {
    let pagination = query.pagination()?;
    let user_id = authenticate(&headers)?;

    let page = documents
        .list_documents(&user_id, payload.cooperative_id.trim(), pagination)
        .await?
        .map(DocumentResponse::from);

    Ok(Json(json!({
        "message": "Documents fetched successfully",
        "documents": page.items,
        "pagination": page.info,
    }))
    .into_response())
}

pub(crate) async fn delete_document_handler(
    State(documents): State<Arc<DocumentService>>,
    headers: HeaderMap,
    ValidatedJson(payload): ValidatedJson<DeleteDocumentRequest>,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let document = documents
        .delete_document(&user_id, payload.document_id.trim(), &payload.file_url)
        .await?;

    Ok(Json(json!({
        "message": "File deleted successfully",
        "documentId": document.id,
    }))
    .into_response())
}

pub(crate) async fn list_files_handler(
    Path(workspace_id): Path<String>,
    State(documents): State<Arc<DocumentService>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user_id = authenticate(&headers)?;

    let files = documents.list_files(&user_id, &workspace_id).await?;

    Ok(Json(json!({
        "message": "Files fetched successfully",
        "files": files,
    }))
    .into_response())
}
