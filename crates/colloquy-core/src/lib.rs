//! Business logic for Colloquy.
//!
//! This crate owns the text-normalization/markup pipeline, content units,
//! message envelopes, conversation logs, the expert/session routing layer,
//! template rendering, and the tool registry. It defines the ports
//! (`ModelBackend`, `TemplateSource`, `ChatStore`) that colloquy-infra and
//! external callers implement -- it never performs network I/O itself.

pub mod backend;
pub mod chat;
pub mod content;
pub mod expert;
pub mod message;
pub mod session;
pub mod template;
pub mod text;
pub mod tool;
