//! Conversation logs: per-expert message history and its lifecycle.
//!
//! A log moves `Uninitialized -> Initialized` when instructions and info
//! are injected, then `Active` through the append/respond cycle, and
//! optionally `Persisted` via the [`ChatStore`] port. A persisted log can
//! be reopened from its snapshot.

pub mod prompt;

use std::collections::BTreeMap;

use comfy_table::{presets, Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use colloquy_types::backend::{ToolCall, ToolOutcome};
use colloquy_types::config::{SessionConfig, SUDO_NAME, TABLE_WIDTH};
use colloquy_types::error::ChatError;
use colloquy_types::palette::{RESET, YELLOW};
use colloquy_types::role::Role;
use colloquy_types::tag::builtin_tags;

use crate::backend::{parse_reply, ModelBackend};
use crate::content::Content;
use crate::message::Envelope;
use crate::template::{self, TemplateSource};
use crate::text;
use crate::tool::ToolRegistry;

/// Template consumer type for chat instruction lookups.
const CHAT_CONSUMER: &str = "chat";

/// Lifecycle of a conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    Uninitialized,
    Initialized,
    Active,
    Persisted,
}

/// Persistence port for chat snapshots.
///
/// Records are named `{session_id}_{chat_name}`; restore picks the
/// lexicographically last record matching the given fragment. Not safe
/// against concurrent writers to the same record name.
pub trait ChatStore: Send + Sync {
    fn save(
        &self,
        record: &str,
        payload: &str,
    ) -> impl std::future::Future<Output = Result<(), ChatError>> + Send;

    fn load_latest(
        &self,
        matcher: &str,
    ) -> impl std::future::Future<Output = Result<String, ChatError>> + Send;
}

/// One expert's private view of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    owner: String,
    owner_role: Role,
    chat_type: String,
    use_tags: bool,
    use_names: bool,
    /// Display verbosity for table projections; drives tag-span redaction.
    #[serde(default)]
    verbosity: u8,
    state: ChatState,
    messages: Vec<Envelope>,
    /// Tool call awaiting dispatch from the last reply. Not persisted.
    #[serde(skip)]
    pending_call: Option<ToolCall>,
}

impl ConversationLog {
    pub fn new(owner: &str, owner_role: Role, chat_type: &str, config: &SessionConfig) -> Self {
        Self {
            owner: owner.to_lowercase(),
            owner_role,
            chat_type: chat_type.to_string(),
            use_tags: config.use_tags,
            use_names: config.use_names,
            verbosity: config.verbosity,
            state: ChatState::Uninitialized,
            messages: Vec::new(),
            pending_call: None,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn messages(&self) -> &[Envelope] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Display-flag keyed template variant name, e.g. `use_tags_use_names`.
    fn template_variant(&self) -> String {
        let mut parts = Vec::new();
        if self.use_tags {
            parts.push("use_tags");
        }
        if self.use_names {
            parts.push("use_names");
        }
        parts.join("_")
    }

    /// Resolve and render the owner's chat instructions, inject collected
    /// info, and insert the result as a leading system turn.
    pub fn initialize(
        &mut self,
        source: &dyn TemplateSource,
        roster: &str,
        infos: &BTreeMap<String, String>,
    ) -> Result<(), ChatError> {
        let tag_examples: String = builtin_tags()
            .iter()
            .filter(|(name, _)| *name == "chat" || *name == "expert")
            .map(|(name, spec)| format!("\n- {name}:{}{}", spec.start, spec.end))
            .collect();
        let context = BTreeMap::from([
            ("chat_type".to_string(), self.chat_type.clone()),
            ("in_chat".to_string(), roster.to_string()),
            ("tags".to_string(), tag_examples),
            ("owner".to_string(), self.owner.clone()),
        ]);
        let rendered = template::render(source, CHAT_CONSUMER, &self.template_variant(), &context)?;
        let info_text = infos.values().cloned().collect::<Vec<_>>().join("\n");
        let instructs = template::inject_infos(&rendered, &info_text);

        // instructions are only ever given by the privileged participant
        let envelope = Envelope::new(
            SUDO_NAME,
            Content::new(Some(""), Some(&instructs), Some("chat")),
            Some(Role::System),
        )
        .with_type("instructs_chat");
        self.messages.insert(0, envelope);
        if self.state == ChatState::Uninitialized {
            self.state = ChatState::Initialized;
        }
        tracing::debug!(owner = %self.owner, "chat initialized");
        Ok(())
    }

    pub fn append(&mut self, envelope: Envelope) -> &Envelope {
        if self.state == ChatState::Initialized || self.state == ChatState::Persisted {
            self.state = ChatState::Active;
        }
        self.messages.push(envelope);
        self.messages.last().expect("just pushed")
    }

    /// Wrap raw text using the owner's default role and append it.
    pub fn append_text(&mut self, text: &str, role: Option<Role>) -> &Envelope {
        let role = role.unwrap_or(self.owner_role);
        let envelope = Envelope::from_text(&self.owner, text, Some(role));
        self.append(envelope)
    }

    /// Submit the log to the backend and append the interpreted reply as
    /// an assistant turn.
    ///
    /// An unreachable backend propagates without touching the log. An
    /// empty reply lands as the no-response sentinel. A tool-call reply
    /// gets the execution watermark and call narration; the call itself
    /// is parked for [`Self::execute_tool`].
    pub async fn respond(
        &mut self,
        backend: &impl ModelBackend,
        tools: &ToolRegistry,
        config: &SessionConfig,
    ) -> Result<&Envelope, ChatError> {
        if self.state == ChatState::Uninitialized {
            return Err(ChatError::NotInitialized);
        }
        let request = prompt::build_request(&self.messages, config, tools)?;
        let reply = backend.submit(&request).await?;

        let parsed = parse_reply(&reply, &self.owner, &tools.names());
        let body = text::strip_speaker_name(&parsed.text, &self.owner);
        let mut envelope = Envelope::new(
            &self.owner,
            Content::new(Some(&body), parsed.instructs.as_deref(), Some("expert")),
            Some(Role::Assistant),
        )
        .with_type("assi_response")
        .with_watermark(parsed.watermark);
        envelope.legal_response = parsed.legal_response;
        self.pending_call = parsed.tool_call;
        Ok(self.append(envelope))
    }

    /// Tool call parked by the last reply, if any.
    pub fn take_pending_call(&mut self) -> Option<ToolCall> {
        self.pending_call.take()
    }

    /// Dispatch a call against the registry and append the outcome as a
    /// system-role narration turn.
    pub fn execute_tool(
        &mut self,
        registry: &ToolRegistry,
        call: &ToolCall,
    ) -> Result<ToolOutcome, ChatError> {
        let outcome = registry.dispatch(call)?;
        let narration = format!(
            "function: {}\nstatus: {}\n{}",
            call.name,
            match outcome.status {
                Some(true) => "ok",
                Some(false) => "failed",
                None => "not executed",
            },
            outcome.body,
        );
        let envelope = Envelope::from_text(SUDO_NAME, &narration, Some(Role::System))
            .with_type("tool_outcome");
        self.append(envelope);
        Ok(outcome)
    }

    /// Tombstone a turn by id. Never a physical delete.
    pub fn remove(&mut self, message_id: Uuid) {
        for envelope in &mut self.messages {
            if envelope.message_id == message_id {
                envelope.tombstone();
            }
        }
    }

    pub fn snapshot(&self) -> Result<String, ChatError> {
        serde_json::to_string_pretty(self).map_err(|err| ChatError::Persistence(err.to_string()))
    }

    pub fn from_snapshot(payload: &str) -> Result<Self, ChatError> {
        serde_json::from_str(payload).map_err(|err| ChatError::Persistence(err.to_string()))
    }

    /// Persist a snapshot under `{session_id}_{name}` (the owner's name
    /// by default). Returns the record name.
    pub async fn persist<S: ChatStore>(
        &mut self,
        store: &S,
        session_id: &str,
        name: Option<&str>,
    ) -> Result<String, ChatError> {
        let record = format!("{session_id}_{}", name.unwrap_or(&self.owner));
        let payload = self.snapshot()?;
        store.save(&record, &payload).await?;
        self.state = ChatState::Persisted;
        tracing::info!(record, "chat persisted");
        Ok(record)
    }

    /// Reopen the most recent snapshot whose record name contains
    /// `matcher`.
    pub async fn restore<S: ChatStore>(store: &S, matcher: &str) -> Result<Self, ChatError> {
        let payload = store.load_latest(matcher).await?;
        Self::from_snapshot(&payload)
    }

    /// Whole-log table projection with the owner's chat header. Tag
    /// spans are redacted per the log's verbosity; the privileged
    /// participant's table can append a roster to the opening turn via
    /// `roster`.
    pub fn to_table(&self, colors: &BTreeMap<String, String>, roster: Option<&str>) -> String {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_width(TABLE_WIDTH as u16 + 40);
        table.set_header(vec![
            Cell::new(format!(
                "{YELLOW}Chat for expert {}{RESET} with {} entries.",
                truncate_upper(&self.owner, 20),
                self.messages.len(),
            )),
            Cell::new("MESSAGE"),
        ]);
        for (i, envelope) in self.messages.iter().enumerate() {
            let color = colors.get(&envelope.speaker).map(String::as_str);
            let mut cell = text::hide_tags(
                &envelope.to_table(self.use_names, true, color),
                self.verbosity,
            );
            if i == 0 {
                if let Some(roster) = roster {
                    cell.push('\n');
                    cell.push_str(roster);
                }
            }
            table.add_row(vec![envelope.speaker.clone(), cell]);
        }
        table.to_string()
    }
}

fn truncate_upper(name: &str, limit: usize) -> String {
    name.chars().take(limit).collect::<String>().to_uppercase()
}
