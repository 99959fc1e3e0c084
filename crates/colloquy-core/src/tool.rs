//! Statically registered tool table.
//!
//! Dispatch is a closed allow-list: the model can only name tools that
//! were registered up front, and an unknown or malformed call is an
//! explicit error, never an import or a lookup by reply text.

use std::collections::BTreeMap;
use std::fmt;

use colloquy_types::backend::{ToolCall, ToolOutcome, ToolSpec};
use colloquy_types::error::ToolError;

type Handler = Box<dyn Fn(serde_json::Value) -> Result<ToolOutcome, ToolError> + Send + Sync>;

struct ToolEntry {
    spec: ToolSpec,
    handler: Handler,
}

/// The session's tool allow-list.
#[derive(Default)]
pub struct ToolRegistry {
    entries: BTreeMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its spec name. Collisions are an error,
    /// never a silent overwrite.
    pub fn register<F>(&mut self, spec: ToolSpec, handler: F) -> Result<(), ToolError>
    where
        F: Fn(serde_json::Value) -> Result<ToolOutcome, ToolError> + Send + Sync + 'static,
    {
        let name = spec.name.clone();
        if self.entries.contains_key(&name) {
            return Err(ToolError::NameTaken(name));
        }
        self.entries.insert(
            name,
            ToolEntry {
                spec,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Specs advertised to the backend.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.entries.values().map(|e| e.spec.clone()).collect()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Run a call against the table. Arguments must parse as JSON before
    /// the handler ever sees them.
    pub fn dispatch(&self, call: &ToolCall) -> Result<ToolOutcome, ToolError> {
        let entry = self
            .entries
            .get(&call.name)
            .ok_or_else(|| ToolError::Unknown(call.name.clone()))?;
        let arguments: serde_json::Value =
            serde_json::from_str(&call.arguments_json).map_err(|err| {
                ToolError::InvalidArguments {
                    name: call.name.clone(),
                    message: err.to_string(),
                }
            })?;
        tracing::debug!(tool = %call.name, "dispatching tool call");
        (entry.handler)(arguments)
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("names", &self.names())
            .finish()
    }
}
