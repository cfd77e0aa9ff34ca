#![allow(dead_code)]

use std::sync::Arc;

use agrocoop_core::{
    config::AppConfig,
    db::Database,
    ids::{RoleId, UserId, WorkspaceId},
};
use tempfile::TempDir;

use crate::{
    blob_store::InMemoryBlobStorage,
    state::{AppState, build_state_with_blob_store},
};

pub(crate) const OWNER_ID: &str = "owner-1";

pub(crate) async fn setup_state() -> (TempDir, Database, AppState) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let mut config = AppConfig::default();
    let db_path = temp_dir.path().join("test.db");
    config.database_path = db_path.to_string_lossy().into_owned();

    let database = Database::connect(&config).await.expect("connect database");
    let state = build_state_with_blob_store(
        &database,
        &config,
        Arc::new(InMemoryBlobStorage::default()),
    );

    (temp_dir, database, state)
}

/// Creates a workspace owned by [`OWNER_ID`] and returns `(workspace_id, owner_id)`.
pub(crate) async fn seed_workspace(state: &AppState) -> (String, String) {
    let workspace = state
        .workspace_store
        .create(&UserId::from(OWNER_ID), "Test Cooperative", None)
        .await
        .expect("create workspace");
    (workspace.id.into_inner(), OWNER_ID.to_owned())
}

pub(crate) async fn seed_member(state: &AppState, workspace_id: &str, user_id: &str, role_id: &str) {
    state
        .workspace_store
        .add_member(
            &WorkspaceId::from(workspace_id),
            &UserId::from(user_id),
            &RoleId::from(role_id),
        )
        .await
        .expect("add member");
}
