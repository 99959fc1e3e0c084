use thiserror::Error;

/// Errors from the text transform and content pipeline.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("unresolved code-block placeholder '{0}' at reconstruction")]
    UnresolvedPlaceholder(String),
}

/// Errors from model backend calls.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend rejected request: {0}")]
    InvalidRequest(String),
}

/// Errors from participant registration and addressing.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("expert '{0}' is already registered")]
    NameTaken(String),

    #[error("no expert registered under '{0}'")]
    Missing(String),
}

/// Errors from template resolution and rendering.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no template or entry point for consumer '{consumer}', name '{name}'")]
    NotFound { consumer: String, name: String },
}

/// Errors from tool dispatch.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    Unknown(String),

    #[error("tool '{0}' is already registered")]
    NameTaken(String),

    #[error("invalid tool arguments for '{name}': {message}")]
    InvalidArguments { name: String, message: String },
}

/// Errors from conversation-log operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat not initialized")]
    NotInitialized,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("no chat snapshot matches '{0}'")]
    SnapshotNotFound(String),
}

/// Errors from session-level registration and routing.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}
