//! Message envelopes: one speaker turn plus its display metadata.

use chrono::{DateTime, Utc};
use comfy_table::{presets, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use colloquy_types::palette::{RESET, WATERMARK};
use colloquy_types::role::Role;

use crate::content::{Content, RenderMode};

/// Message type marking a tombstoned entry. Tombstones stay in the log
/// but are skipped when a backend request is assembled.
pub const REMOVED_TYPE: &str = "removed";

/// One turn in a conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub speaker: String,
    pub content: Content,
    pub role: Role,
    pub message_type: Option<String>,
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Display marker for model-produced turns. Assistant envelopes always
    /// carry one; the tool-execution marker differs from the default.
    pub watermark: Option<String>,
    /// False when the producing reply leaked generic markup. The turn is
    /// delivered regardless.
    #[serde(default = "default_true")]
    pub legal_response: bool,
}

fn default_true() -> bool {
    true
}

impl Envelope {
    pub fn new(speaker: &str, content: Content, role: Option<Role>) -> Self {
        let role = role.unwrap_or_default();
        Self {
            speaker: speaker.to_lowercase(),
            content,
            role,
            message_type: None,
            message_id: Uuid::now_v7(),
            timestamp: Utc::now(),
            watermark: role.is_watermarked().then(|| WATERMARK.to_string()),
            legal_response: true,
        }
    }

    /// Wrap raw text. Coerced content is tagged `expert` so any
    /// instructions attached later render under the expert markers.
    pub fn from_text(speaker: &str, text: &str, role: Option<Role>) -> Self {
        Self::new(speaker, Content::new(Some(text), None, Some("expert")), role)
    }

    /// Envelope whose body has not been supplied yet. The log holds it
    /// while interactive input is being solicited.
    pub fn pending_input(speaker: &str) -> Self {
        Self::new(speaker, Content::new(None, None, None), None)
    }

    pub fn with_type(mut self, message_type: &str) -> Self {
        self.message_type = Some(message_type.to_string());
        self
    }

    pub fn with_watermark(mut self, watermark: &str) -> Self {
        self.watermark = Some(watermark.to_string());
        self
    }

    pub fn is_pending_input(&self) -> bool {
        self.content.text.is_none()
    }

    pub fn is_removed(&self) -> bool {
        self.message_type.as_deref() == Some(REMOVED_TYPE)
    }

    /// Retype to the tombstone marker. The envelope stays in the log.
    pub fn tombstone(&mut self) {
        self.message_type = Some(REMOVED_TYPE.to_string());
    }

    /// Speaker column for table projections: colorized name plus
    /// watermark, or a plain `name:` label.
    pub fn speaker_label(&self, use_color: bool, color: Option<&str>) -> String {
        if !use_color {
            return format!("{}: ", self.speaker);
        }
        let mark = self.watermark.as_deref().unwrap_or_default();
        match color {
            Some(code) => format!("{code}{}{RESET}{mark}", self.speaker),
            None => format!("{}{mark}", self.speaker),
        }
    }

    /// Single-row table projection of this turn.
    pub fn to_table(&self, use_names: bool, use_color: bool, color: Option<&str>) -> String {
        let mode = if use_color {
            RenderMode::Pretty
        } else {
            RenderMode::Plain
        };
        let body = self
            .content
            .render(mode, true)
            .unwrap_or_else(|err| format!(" [unrenderable: {err}]\n"));

        let mut table = Table::new();
        table.load_preset(presets::NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if use_names {
            table.add_row(vec![self.speaker_label(use_color, color), body]);
        } else {
            table.add_row(vec![body]);
        }
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::palette::{EXEC_WATERMARK, GREEN};

    #[test]
    fn test_role_defaults_to_input() {
        let envelope = Envelope::from_text("alice", "hi", None);
        assert_eq!(envelope.role, Role::Input);
        assert!(envelope.watermark.is_none());
    }

    #[test]
    fn test_assistant_always_watermarked() {
        let envelope = Envelope::from_text("alice", "hi", Some(Role::Assistant));
        assert_eq!(envelope.watermark.as_deref(), Some(WATERMARK));
    }

    #[test]
    fn test_exec_watermark_overrides_default() {
        let envelope = Envelope::from_text("alice", "hi", Some(Role::Assistant))
            .with_watermark(EXEC_WATERMARK);
        assert_eq!(envelope.watermark.as_deref(), Some(EXEC_WATERMARK));
    }

    #[test]
    fn test_coerced_text_is_expert_tagged() {
        let envelope = Envelope::from_text("alice", "hi", None);
        assert_eq!(envelope.content.tag.as_deref(), Some("expert"));
    }

    #[test]
    fn test_pending_input_state() {
        let envelope = Envelope::pending_input("bob");
        assert!(envelope.is_pending_input());
    }

    #[test]
    fn test_tombstone_retypes_without_deleting() {
        let mut envelope = Envelope::from_text("alice", "hi", None);
        envelope.tombstone();
        assert!(envelope.is_removed());
        assert!(envelope.content.text.is_some());
    }

    #[test]
    fn test_speaker_label_plain() {
        let envelope = Envelope::from_text("alice", "hi", None);
        assert_eq!(envelope.speaker_label(false, Some(GREEN)), "alice: ");
    }

    #[test]
    fn test_speaker_label_colored_with_watermark() {
        let envelope = Envelope::from_text("alice", "hi", Some(Role::Assistant));
        let label = envelope.speaker_label(true, Some(GREEN));
        assert!(label.starts_with(GREEN));
        assert!(label.contains("alice"));
        assert!(label.ends_with(WATERMARK));
    }

    #[test]
    fn test_names_are_lowercased() {
        let envelope = Envelope::from_text("Alice", "hi", None);
        assert_eq!(envelope.speaker, "alice");
    }
}
