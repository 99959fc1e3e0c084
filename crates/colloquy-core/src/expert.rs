//! Experts: named participants and their private conversation logs.
//!
//! Routing between experts is a session concern; an expert only knows
//! how to think into, and hear things in, its own log.

use std::collections::BTreeMap;

use uuid::Uuid;

use colloquy_types::config::{ExpertProfile, SessionConfig, SUDO_NAME};
use colloquy_types::error::ChatError;
use colloquy_types::palette::Color;
use colloquy_types::role::Role;

use crate::backend::ModelBackend;
use crate::chat::ConversationLog;
use crate::content::Content;
use crate::message::Envelope;
use crate::template::{self, TemplateSource};
use crate::tool::ToolRegistry;

/// Template consumer type for expert-domain instruction lookups.
const EXPERT_CONSUMER: &str = "expert";

/// One named participant.
#[derive(Debug)]
pub struct Expert {
    name: String,
    role: Role,
    color: Color,
    profile: ExpertProfile,
    log: ConversationLog,
    last_said: Option<Uuid>,
    last_heard: Option<Uuid>,
}

impl Expert {
    /// Build the expert and its master log: chat instructions plus the
    /// expert's domain template, both as leading system turns.
    pub fn new(
        name: &str,
        role: Role,
        color: Color,
        profile: ExpertProfile,
        config: &SessionConfig,
        chat_type: &str,
        source: &dyn TemplateSource,
        roster: &str,
        infos: &BTreeMap<String, String>,
    ) -> Result<Self, ChatError> {
        let name = name.to_lowercase();
        let mut log = ConversationLog::new(&name, role, chat_type, config);

        let context = BTreeMap::from([
            ("domain".to_string(), profile.domain.clone()),
            ("name".to_string(), name.clone()),
        ]);
        let domain_instructs =
            template::render(source, EXPERT_CONSUMER, &profile.domain, &context)?;
        log.append(
            Envelope::new(
                SUDO_NAME,
                Content::new(Some(""), Some(&domain_instructs), Some("expert")),
                Some(Role::System),
            )
            .with_type("instructs_expert"),
        );
        log.initialize(source, roster, infos)?;

        Ok(Self {
            name,
            role,
            color,
            profile,
            log,
            last_said: None,
            last_heard: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn profile(&self) -> &ExpertProfile {
        &self.profile
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ConversationLog {
        &mut self.log
    }

    pub fn last_said(&self) -> Option<Uuid> {
        self.last_said
    }

    pub fn last_heard(&self) -> Option<Uuid> {
        self.last_heard
    }

    pub fn is_sudo(&self) -> bool {
        self.name == SUDO_NAME
    }

    /// Produce a thought in the own log: append the given message, or
    /// solicit one from the backend when none is given and the role is
    /// assistant. A missing message with a non-assistant role enters the
    /// pending-input state.
    pub async fn think(
        &mut self,
        message: Option<&str>,
        role: Option<Role>,
        instructs: Option<&str>,
        backend: &impl ModelBackend,
        tools: &ToolRegistry,
        config: &SessionConfig,
    ) -> Result<Envelope, ChatError> {
        if let Some(instructs) = instructs.filter(|i| !i.is_empty()) {
            self.log.append(
                Envelope::new(
                    SUDO_NAME,
                    Content::new(Some(""), Some(instructs), Some("chat")),
                    Some(Role::System),
                )
                .with_type("instructs"),
            );
        }
        let role = role.unwrap_or(self.role);
        let envelope = match message {
            Some(text) => self.log.append_text(text, Some(role)).clone(),
            None if role == Role::Assistant => {
                self.log.respond(backend, tools, config).await?.clone()
            }
            None => self.log.append(Envelope::pending_input(&self.name)).clone(),
        };
        self.last_said = Some(envelope.message_id);
        Ok(envelope)
    }

    /// Privately observe a turn produced elsewhere.
    pub fn hear(&mut self, envelope: Envelope) {
        self.last_heard = Some(envelope.message_id);
        self.log.append(envelope);
    }
}
