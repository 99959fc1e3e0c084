//! Shared domain types for Colloquy.
//!
//! This crate holds the data shapes used across the workspace: message
//! roles, the terminal color palette and pool, the tag markup table, the
//! model-backend wire contract, session configuration, and the per-domain
//! error enums. It has no business logic and no I/O.

pub mod backend;
pub mod config;
pub mod error;
pub mod palette;
pub mod role;
pub mod tag;
