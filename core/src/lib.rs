pub mod analytics;
pub mod blob;
pub mod config;
pub mod db;
pub mod document;
pub mod farmer;
pub mod ids;
pub mod pagination;
pub mod permissions;
pub mod project;
pub mod task;
pub mod workspace;
pub mod workspace_member;

#[cfg(test)]
pub(crate) mod test_support;
