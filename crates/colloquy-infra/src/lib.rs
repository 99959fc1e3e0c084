//! Infrastructure implementations for the colloquy-core ports: the
//! directory-backed template source, the chat history file store, the
//! TOML config loader, and a deterministic scripted backend for tests
//! and offline runs.

pub mod chat_store;
pub mod config;
pub mod scripted;
pub mod template_dir;

pub use chat_store::FileChatStore;
pub use config::load_session_config;
pub use scripted::ScriptedBackend;
pub use template_dir::DirTemplateSource;
