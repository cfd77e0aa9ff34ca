// HTTP handlers module structure

pub(crate) mod document_handlers;
pub(crate) mod farmer_handlers;
pub(crate) mod health_handlers;
pub(crate) mod project_handlers;
pub(crate) mod task_handlers;
pub(crate) mod workspace_handlers;
