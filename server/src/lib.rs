pub mod access;
pub mod auth;
pub mod blob_store;
pub mod document;
pub mod error;
pub mod extract;
pub mod farmer;
pub mod handlers;
pub mod observability;
pub mod project;
pub mod router;
pub mod state;
pub mod task;
pub mod types;
pub mod workspace;

pub use error::AppError;
pub use state::{AppState, build_state, build_state_with_blob_store};

#[cfg(test)]
pub mod test_support;
