use std::sync::Arc;

use anyhow::Result as AnyResult;
use serde::Serialize;
use tracing::info;

use agrocoop_core::{
    analytics::AnalyticsStore,
    blob::BlobStorage,
    config::AppConfig,
    db::Database,
    document::DocumentStore,
    farmer::FarmerStore,
    permissions::PermissionTable,
    project::ProjectStore,
    task::TaskStore,
    workspace::WorkspaceStore,
};

use crate::{
    access::AccessService, blob_store::build_blob_storage, document::service::DocumentService,
    farmer::service::FarmerService, project::service::ProjectService,
    task::service::TaskService, workspace::service::WorkspaceService,
};

#[derive(Clone)]
pub struct AppState {
    pub workspace_store: WorkspaceStore,
    pub farmer_store: FarmerStore,
    pub project_store: ProjectStore,
    pub task_store: TaskStore,
    pub document_store: DocumentStore,
    pub analytics_store: AnalyticsStore,
    pub permissions: Arc<PermissionTable>,
    pub access_service: Arc<AccessService>,
    pub workspace_service: Arc<WorkspaceService>,
    pub project_service: Arc<ProjectService>,
    pub task_service: Arc<TaskService>,
    pub farmer_service: Arc<FarmerService>,
    pub document_service: Arc<DocumentService>,
    pub blob_store: Arc<dyn BlobStorage>,
    pub storage_bucket: String,
    pub metadata: ServerMetadata,
}

#[derive(Clone, Debug, Serialize)]
pub struct ServerMetadata {
    pub name: &'static str,
    pub version: &'static str,
    pub message: &'static str,
}

impl ServerMetadata {
    pub fn load() -> Self {
        Self {
            name: "agrocoop",
            version: env!("CARGO_PKG_VERSION"),
            message: "AgroCoop API is running",
        }
    }
}

/// Builds the state with the blob store selected by `app_config`.
pub fn build_state(database: &Database, app_config: &AppConfig) -> AnyResult<AppState> {
    let blob_store = build_blob_storage(app_config)?;
    info!(
        backend = ?app_config.blob_store_backend,
        bucket = app_config.storage_bucket.as_str(),
        "blob store ready"
    );
    Ok(build_state_with_blob_store(database, app_config, blob_store))
}

pub fn build_state_with_blob_store(
    database: &Database,
    app_config: &AppConfig,
    blob_store: Arc<dyn BlobStorage>,
) -> AppState {
    let permissions = Arc::new(PermissionTable::standard());
    let storage_bucket = app_config.storage_bucket.clone();

    let workspace_store = WorkspaceStore::new(database);
    let farmer_store = FarmerStore::new(database);
    let project_store = ProjectStore::new(database);
    let task_store = TaskStore::new(database);
    let document_store = DocumentStore::new(database);
    let analytics_store = AnalyticsStore::new(database);

    let access_service = Arc::new(AccessService::new(
        workspace_store.clone(),
        permissions.clone(),
    ));
    let workspace_service = Arc::new(WorkspaceService::new(
        workspace_store.clone(),
        analytics_store.clone(),
        access_service.clone(),
        blob_store.clone(),
        storage_bucket.clone(),
    ));
    let project_service = Arc::new(ProjectService::new(
        project_store.clone(),
        analytics_store.clone(),
        access_service.clone(),
    ));
    let task_service = Arc::new(TaskService::new(
        task_store.clone(),
        workspace_store.clone(),
        project_service.clone(),
        access_service.clone(),
    ));
    let farmer_service = Arc::new(FarmerService::new(
        farmer_store.clone(),
        access_service.clone(),
    ));
    let document_service = Arc::new(DocumentService::new(
        document_store.clone(),
        blob_store.clone(),
        storage_bucket.clone(),
        access_service.clone(),
    ));

    AppState {
        workspace_store,
        farmer_store,
        project_store,
        task_store,
        document_store,
        analytics_store,
        permissions,
        access_service,
        workspace_service,
        project_service,
        task_service,
        farmer_service,
        document_service,
        blob_store,
        storage_bucket,
        metadata: ServerMetadata::load(),
    }
}
