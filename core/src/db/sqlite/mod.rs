pub mod connection;
pub mod document_repo;
pub mod farmer_repo;
pub mod project_repo;
pub mod task_repo;
pub mod workspace_repo;
