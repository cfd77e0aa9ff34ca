use std::{fs, fs::File, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use self::{
    document_repo::DocumentRepositoryRef,
    farmer_repo::FarmerRepositoryRef,
    project_repo::ProjectRepositoryRef,
    sqlite::{
        connection as sqlite_connection, document_repo::SqliteDocumentRepository,
        farmer_repo::SqliteFarmerRepository, project_repo::SqliteProjectRepository,
        task_repo::SqliteTaskRepository, workspace_repo::SqliteWorkspaceRepository,
    },
    task_repo::TaskRepositoryRef,
    workspace_repo::WorkspaceRepositoryRef,
};
use crate::config::AppConfig;

pub mod document_repo;
pub mod errors;
pub mod farmer_repo;
pub mod project_repo;
pub mod sqlite;
pub mod task_repo;
pub mod workspace_repo;

#[derive(Clone)]
pub struct RepositoryRegistry {
    workspace_repo: WorkspaceRepositoryRef,
    farmer_repo: FarmerRepositoryRef,
    project_repo: ProjectRepositoryRef,
    task_repo: TaskRepositoryRef,
    document_repo: DocumentRepositoryRef,
}

impl RepositoryRegistry {
    pub fn new(
        workspace_repo: WorkspaceRepositoryRef,
        farmer_repo: FarmerRepositoryRef,
        project_repo: ProjectRepositoryRef,
        task_repo: TaskRepositoryRef,
        document_repo: DocumentRepositoryRef,
    ) -> Self {
        Self {
            workspace_repo,
            farmer_repo,
            project_repo,
            task_repo,
            document_repo,
        }
    }

    pub fn workspace_repo(&self) -> WorkspaceRepositoryRef {
        self.workspace_repo.clone()
    }

    pub fn farmer_repo(&self) -> FarmerRepositoryRef {
        self.farmer_repo.clone()
    }

    pub fn project_repo(&self) -> ProjectRepositoryRef {
        self.project_repo.clone()
    }

    pub fn task_repo(&self) -> TaskRepositoryRef {
        self.task_repo.clone()
    }

    pub fn document_repo(&self) -> DocumentRepositoryRef {
        self.document_repo.clone()
    }
}

#[derive(Clone)]
pub struct Database {
    pool: sqlite_connection::SqlitePool,
    path: PathBuf,
    repositories: Arc<RepositoryRegistry>,
}

impl Database {
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let db_file = Self::resolve_db_path(&config.database_path)?;
        if let Some(parent) = db_file.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory: {}", parent.display())
            })?;
        }

        if !db_file.exists() {
            File::create(&db_file).with_context(|| {
                format!("failed to create database file: {}", db_file.display())
            })?;
        }

        let pool =
            sqlite_connection::create_pool(&db_file, config.database_max_connections).await?;
        sqlite_connection::run_migrations(&pool).await?;

        let repositories = Arc::new(RepositoryRegistry::new(
            Arc::new(SqliteWorkspaceRepository::new(pool.clone())) as WorkspaceRepositoryRef,
            Arc::new(SqliteFarmerRepository::new(pool.clone())) as FarmerRepositoryRef,
            Arc::new(SqliteProjectRepository::new(pool.clone())) as ProjectRepositoryRef,
            Arc::new(SqliteTaskRepository::new(pool.clone())) as TaskRepositoryRef,
            Arc::new(SqliteDocumentRepository::new(pool.clone())) as DocumentRepositoryRef,
        ));

        Ok(Self {
            pool,
            path: db_file,
            repositories,
        })
    }

    pub fn pool(&self) -> &sqlite_connection::SqlitePool {
        &self.pool
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn repositories(&self) -> Arc<RepositoryRegistry> {
        self.repositories.clone()
    }

    fn resolve_db_path(path: &str) -> Result<PathBuf> {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            Ok(path)
        } else {
            let cwd = std::env::current_dir().context("failed to obtain current directory")?;
            Ok(cwd.join(path))
        }
    }
}
