// Router configuration

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use agrocoop_core::config::{AppConfig, normalize_base_path};

use crate::{
    handlers::{
        document_handlers::*, farmer_handlers::*, health_handlers::*, project_handlers::*,
        task_handlers::*, workspace_handlers::*,
    },
    observability,
    state::AppState,
};

pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let prefix = normalize_base_path(&config.base_path);
    let router = build_base_router(state);
    let router = if prefix.is_empty() {
        router
    } else {
        Router::new().nest(&prefix, router)
    };

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(observability::http_make_span())
                .on_response(observability::response_logger()),
        )
        .layer(cors_layer(config.frontend_origin.as_deref()))
        .layer(observability::request_context_layer())
}

fn cors_layer(frontend_origin: Option<&str>) -> CorsLayer {
    let origin = match frontend_origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(err)) => {
            warn!(error = %err, "invalid frontend origin; mirroring request origin");
            AllowOrigin::mirror_request()
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn build_base_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        // Workspaces
        .route("/workspace/create/new", post(create_workspace_handler))
        .route("/workspace/all", get(list_user_workspaces_handler))
        .route("/workspace/{workspace_id}", get(get_workspace_handler))
        .route(
            "/workspace/update/{workspace_id}",
            put(update_workspace_handler),
        )
        .route(
            "/workspace/delete/{workspace_id}",
            delete(delete_workspace_handler),
        )
        .route(
            "/workspace/members/{workspace_id}",
            get(workspace_members_handler),
        )
        .route(
            "/workspace/analytics/{workspace_id}",
            get(workspace_analytics_handler),
        )
        .route(
            "/workspace/change/member/role/{workspace_id}",
            put(change_member_role_handler),
        )
        .route(
            "/workspace/officers/new/{workspace_id}",
            post(add_member_handler),
        )
        .route(
            "/workspace/{workspace_id}/members/{user_id}",
            delete(remove_member_handler),
        )
        // Projects
        .route(
            "/project/workspace/{workspace_id}/create",
            post(create_project_handler),
        )
        .route(
            "/project/workspace/{workspace_id}/all",
            get(list_projects_handler),
        )
        .route(
            "/project/{project_id}/workspace/{workspace_id}",
            get(get_project_handler),
        )
        .route(
            "/project/{project_id}/workspace/{workspace_id}/analytics",
            get(project_analytics_handler),
        )
        .route(
            "/project/{project_id}/workspace/{workspace_id}/update",
            put(update_project_handler),
        )
        .route(
            "/project/{project_id}/workspace/{workspace_id}/delete",
            delete(delete_project_handler),
        )
        // Loans
        .route(
            "/task/project/{project_id}/workspace/{workspace_id}/create",
            post(create_task_handler),
        )
        .route("/task/workspace/{workspace_id}/all", get(list_tasks_handler))
        .route(
            "/task/{task_id}/project/{project_id}/workspace/{workspace_id}",
            get(get_task_handler),
        )
        .route(
            "/task/{task_id}/project/{project_id}/workspace/{workspace_id}/update",
            put(update_task_handler),
        )
        .route(
            "/task/{task_id}/workspace/{workspace_id}/delete",
            delete(delete_task_handler),
        )
        // Farmers
        .route(
            "/farmer/workspace/{workspace_id}/create",
            post(create_farmer_handler),
        )
        .route(
            "/farmer/workspace/{workspace_id}/all",
            get(list_farmers_handler),
        )
        .route(
            "/farmer/{farmer_id}/workspace/{workspace_id}",
            get(get_farmer_handler),
        )
        .route(
            "/farmer/{farmer_id}/workspace/{workspace_id}/update",
            put(update_farmer_handler),
        )
        .route(
            "/farmer/{farmer_id}/workspace/{workspace_id}/delete",
            delete(delete_farmer_handler),
        )
        // Documents
        .route(
            "/upload",
            post(upload_document_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/documents", post(list_documents_handler))
        .route("/delete-file", delete(delete_document_handler))
        .route("/files/{workspace_id}", get(list_files_handler))
        .with_state(state)
}
