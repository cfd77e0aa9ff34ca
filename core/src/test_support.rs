use tempfile::TempDir;

use crate::{config::AppConfig, db::Database};

pub(crate) async fn setup_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let config = AppConfig {
        database_path: temp_dir
            .path()
            .join("agrocoop.db")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };
    let database = Database::connect(&config).await.expect("connect database");
    (temp_dir, database)
}
