//! Sessions: the expert registry, color assignment, and routing.
//!
//! All cross-expert routing goes through `Session` methods taking the
//! actor's name. The registry and the color pool are plain owned state;
//! nothing here is global or locked.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Local;

use colloquy_types::config::{profile_for, SessionConfig, DEFAULT_EXPERT, SUDO_NAME};
use colloquy_types::error::{RegistryError, SessionError};
use colloquy_types::palette::{Color, ColorPool, SUDO_COLOR, USER_COLOR};
use colloquy_types::role::Role;

use crate::backend::ModelBackend;
use crate::chat::ChatStore;
use crate::expert::Expert;
use crate::message::Envelope;
use crate::template::{self, TemplateSource};
use crate::tool::ToolRegistry;

/// Template consumer type for configured info subjects.
const INFO_CONSUMER: &str = "info";

/// Who receives a spoken turn besides the speaker's own log.
#[derive(Debug, Clone, Default)]
pub enum Audience {
    /// Every registered expert except the speaker.
    #[default]
    Everyone,
    /// The speaker's log only; the thought stays private.
    Nobody,
    /// The named experts only. Every name must be registered.
    Named(BTreeSet<String>),
}

/// One running conversation session.
pub struct Session {
    id: String,
    chat_type: String,
    config: SessionConfig,
    experts: BTreeMap<String, Expert>,
    colors: ColorPool,
    templates: Arc<dyn TemplateSource>,
    /// Collected system/context info, keyed by subject.
    infos: BTreeMap<String, String>,
    tools: ToolRegistry,
}

impl Session {
    /// Build a session. Info subjects named in the config are resolved
    /// through the template source up front; an unresolvable subject is
    /// skipped with a warning rather than failing the session.
    pub fn new(config: SessionConfig, templates: Arc<dyn TemplateSource>) -> Self {
        let mut infos = BTreeMap::new();
        for subject in &config.infos {
            match template::render(templates.as_ref(), INFO_CONSUMER, subject, &BTreeMap::new()) {
                Ok(text) => {
                    infos.insert(subject.clone(), text);
                }
                Err(err) => {
                    tracing::warn!(subject, %err, "configured info subject not resolvable");
                }
            }
        }
        Self {
            id: Local::now().format("%Y-%m-%d-%H-%M-%S-%6f").to_string(),
            chat_type: "simple chat".to_string(),
            config,
            experts: BTreeMap::new(),
            colors: ColorPool::new(),
            templates,
            infos,
            tools: ToolRegistry::new(),
        }
    }

    pub fn with_chat_type(mut self, chat_type: &str) -> Self {
        self.chat_type = chat_type.to_string();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn names(&self) -> Vec<String> {
        self.experts.keys().cloned().collect()
    }

    pub fn expert(&self, name: &str) -> Result<&Expert, RegistryError> {
        let name = name.to_lowercase();
        self.experts
            .get(&name)
            .ok_or(RegistryError::Missing(name))
    }

    pub fn expert_mut(&mut self, name: &str) -> Result<&mut Expert, RegistryError> {
        let name = name.to_lowercase();
        self.experts
            .get_mut(&name)
            .ok_or(RegistryError::Missing(name))
    }

    /// Record an info subject injected into instruction templates of
    /// experts registered afterwards.
    pub fn add_info(&mut self, subject: &str, text: &str) {
        self.infos.insert(subject.to_string(), text.to_string());
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    /// Register a new expert under a unique lower-cased name, assign it a
    /// color from the shared pool, and initialize its master log.
    pub fn register(
        &mut self,
        name: &str,
        role: Role,
        preferred_color: Option<Color>,
    ) -> Result<&Expert, SessionError> {
        let name = name.to_lowercase();
        if self.experts.contains_key(&name) {
            return Err(RegistryError::NameTaken(name).into());
        }
        let color = self.assign_color(&name, preferred_color);

        let mut roster_names = self.names();
        roster_names.push(name.clone());
        let roster = roster_names.join(", ");

        let expert = Expert::new(
            &name,
            role,
            color,
            profile_for(&name),
            &self.config,
            &self.chat_type,
            self.templates.as_ref(),
            &roster,
            &self.infos,
        )
        .map_err(SessionError::Chat)?;
        tracing::info!(name, %color, "expert registered");
        self.experts.insert(name.clone(), expert);
        Ok(self.experts.get(&name).expect("just inserted"))
    }

    fn assign_color(&mut self, name: &str, preferred: Option<Color>) -> Color {
        if name == SUDO_NAME {
            return SUDO_COLOR;
        }
        if name == DEFAULT_EXPERT {
            return USER_COLOR;
        }
        if let Some(color) = preferred.and_then(|c| self.colors.take(c)) {
            return color;
        }
        self.colors.take_next().unwrap_or(SUDO_COLOR)
    }

    /// Produce a thought in the speaker's log and broadcast it to the
    /// audience. The audience is validated before anything mutates, so an
    /// unknown addressee never leaves a half-delivered turn behind.
    pub async fn speak(
        &mut self,
        speaker: &str,
        message: Option<&str>,
        role: Option<Role>,
        to: Audience,
        backend: &impl ModelBackend,
    ) -> Result<Envelope, SessionError> {
        let speaker = speaker.to_lowercase();
        let recipients = self.resolve_audience(&speaker, &to)?;

        let expert = self
            .experts
            .get_mut(&speaker)
            .ok_or(RegistryError::Missing(speaker.clone()))?;
        let thought = expert
            .think(message, role, None, backend, &self.tools, &self.config)
            .await
            .map_err(SessionError::Chat)?;

        for recipient in recipients {
            self.experts
                .get_mut(&recipient)
                .expect("audience validated")
                .hear(thought.clone());
        }
        Ok(thought)
    }

    fn resolve_audience(
        &self,
        speaker: &str,
        to: &Audience,
    ) -> Result<Vec<String>, RegistryError> {
        match to {
            Audience::Nobody => Ok(Vec::new()),
            Audience::Everyone => Ok(self
                .experts
                .keys()
                .filter(|name| name.as_str() != speaker)
                .cloned()
                .collect()),
            Audience::Named(names) => {
                let mut recipients = Vec::new();
                for name in names {
                    let name = name.to_lowercase();
                    if !self.experts.contains_key(&name) {
                        return Err(RegistryError::Missing(name));
                    }
                    if name != speaker {
                        recipients.push(name);
                    }
                }
                Ok(recipients)
            }
        }
    }

    /// Privately deliver an observed message or instruction to one
    /// expert's log. Instruction-only notices from non-privileged experts
    /// are forwarded to the privileged participant instead.
    pub fn listen(
        &mut self,
        listener: &str,
        text: Option<&str>,
        instructs: Option<&str>,
    ) -> Result<(), SessionError> {
        let listener = listener.to_lowercase();
        if let Some(text) = text {
            let expert = self
                .experts
                .get_mut(&listener)
                .ok_or(RegistryError::Missing(listener.clone()))?;
            let role = expert.role();
            let mut envelope = Envelope::from_text(&listener, text, Some(role));
            if let Some(instructs) = instructs {
                envelope.content =
                    crate::content::Content::new(Some(text), Some(instructs), Some("expert"));
            }
            expert.hear(envelope);
            return Ok(());
        }
        if let Some(instructs) = instructs {
            if listener != SUDO_NAME && self.experts.contains_key(SUDO_NAME) {
                return self.listen(SUDO_NAME, Some(instructs), None);
            }
        }
        Ok(())
    }

    /// Broadcast an addressed question from `asker`, then have
    /// `respondent` speak an assistant reply to everyone.
    pub async fn ask(
        &mut self,
        asker: &str,
        respondent: &str,
        question: &str,
        backend: &impl ModelBackend,
    ) -> Result<Envelope, SessionError> {
        let respondent = respondent.to_lowercase();
        if !self.experts.contains_key(&respondent) {
            return Err(RegistryError::Missing(respondent).into());
        }
        let prefix = if self.config.use_names {
            format!("@{respondent} ")
        } else {
            String::new()
        };
        let question = format!("{prefix} Question: {question}");
        self.speak(
            asker,
            Some(&question),
            Some(Role::User),
            Audience::Everyone,
            backend,
        )
        .await?;
        self.speak(
            &respondent,
            None,
            Some(Role::Assistant),
            Audience::Everyone,
            backend,
        )
        .await
    }

    /// Convenience inverse of [`Self::ask`].
    pub async fn answer(
        &mut self,
        respondent: &str,
        asker: &str,
        question: &str,
        backend: &impl ModelBackend,
    ) -> Result<Envelope, SessionError> {
        self.ask(asker, respondent, question, backend).await
    }

    /// The "Available experts" roster appended to the privileged
    /// participant's chat table.
    pub fn roster(&self) -> String {
        let mut out = String::from("###Available experts: \n");
        for expert in self.experts.values() {
            out.push_str(&format!(
                "- {}: Domain: {}, knows: {}\n",
                capitalize(expert.name()),
                expert.profile().domain,
                expert.profile().infos.join(", "),
            ));
        }
        out
    }

    /// Persist one expert's log under this session's id.
    pub async fn persist<S: ChatStore>(
        &mut self,
        name: &str,
        store: &S,
    ) -> Result<String, SessionError> {
        let id = self.id.clone();
        let expert = self.expert_mut(name)?;
        expert
            .log_mut()
            .persist(store, &id, None)
            .await
            .map_err(SessionError::Chat)
    }

    /// Color codes per registered name, for table rendering.
    pub fn color_codes(&self) -> BTreeMap<String, String> {
        self.experts
            .iter()
            .map(|(name, expert)| (name.clone(), expert.color().code().to_string()))
            .collect()
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("experts", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::backend::{BackendReply, BackendRequest};
    use colloquy_types::error::{BackendError, TemplateError};
    use std::sync::Mutex;

    use crate::template::ResolvedTemplate;

    struct StubSource;

    impl TemplateSource for StubSource {
        fn resolve(&self, consumer: &str, _name: &str) -> Result<ResolvedTemplate, TemplateError> {
            Ok(ResolvedTemplate {
                entry: Some(format!("{consumer} briefing\n<< infos >>")),
                sub: None,
            })
        }
    }

    struct QueueBackend(Mutex<Vec<BackendReply>>);

    impl QueueBackend {
        fn with(texts: &[&str]) -> Self {
            let replies = texts
                .iter()
                .rev()
                .map(|t| BackendReply {
                    content: Some(t.to_string()),
                    tool_calls: None,
                })
                .collect();
            Self(Mutex::new(replies))
        }
    }

    impl ModelBackend for QueueBackend {
        fn name(&self) -> &str {
            "queue"
        }

        async fn submit(&self, _request: &BackendRequest) -> Result<BackendReply, BackendError> {
            self.0
                .lock()
                .expect("queue lock")
                .pop()
                .ok_or_else(|| BackendError::Unavailable("queue drained".to_string()))
        }
    }

    fn session() -> Session {
        Session::new(SessionConfig::default(), Arc::new(StubSource))
    }

    fn named(names: &[&str]) -> Audience {
        Audience::Named(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_registration_lowercases_and_rejects_duplicates() {
        let mut session = session();
        session.register("Alice", Role::User, None).unwrap();
        assert!(session.expert("alice").is_ok());
        let err = session.register("ALICE", Role::User, None).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Registry(RegistryError::NameTaken(_))
        ));
    }

    #[test]
    fn test_colors_are_exclusive() {
        let mut session = session();
        session.register("admin", Role::Assistant, None).unwrap();
        session.register("user", Role::User, None).unwrap();
        session.register("alice", Role::Assistant, None).unwrap();
        session.register("bob", Role::Assistant, None).unwrap();
        assert_eq!(session.expert("admin").unwrap().color(), SUDO_COLOR);
        assert_eq!(session.expert("user").unwrap().color(), USER_COLOR);
        let a = session.expert("alice").unwrap().color();
        let b = session.expert("bob").unwrap().color();
        assert_ne!(a, b);
        assert!(![SUDO_COLOR, USER_COLOR].contains(&a));
    }

    #[tokio::test]
    async fn test_speak_to_nobody_stays_private() {
        let mut session = session();
        session.register("alice", Role::User, None).unwrap();
        session.register("bob", Role::User, None).unwrap();
        let bob_len = session.expert("bob").unwrap().log().len();
        let thought = session
            .speak(
                "alice",
                Some("thinking out loud"),
                None,
                Audience::Nobody,
                &QueueBackend::with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(session.expert("bob").unwrap().log().len(), bob_len);
        // last_said moves even without an audience
        assert_eq!(
            session.expert("alice").unwrap().last_said(),
            Some(thought.message_id)
        );
    }

    #[tokio::test]
    async fn test_speak_broadcasts_to_everyone_but_sender() {
        let mut session = session();
        session.register("alice", Role::User, None).unwrap();
        session.register("bob", Role::User, None).unwrap();
        session.register("carol", Role::User, None).unwrap();
        let alice_len = session.expert("alice").unwrap().log().len();
        let bob_len = session.expert("bob").unwrap().log().len();
        session
            .speak(
                "alice",
                Some("hello everyone"),
                None,
                Audience::Everyone,
                &QueueBackend::with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(session.expert("alice").unwrap().log().len(), alice_len + 1);
        assert_eq!(session.expert("bob").unwrap().log().len(), bob_len + 1);
        assert_eq!(
            session.expert("carol").unwrap().last_heard(),
            session.expert("alice").unwrap().last_said()
        );
    }

    #[tokio::test]
    async fn test_speak_to_named_reaches_only_the_named() {
        let mut session = session();
        session.register("alice", Role::User, None).unwrap();
        session.register("bob", Role::User, None).unwrap();
        session.register("carol", Role::User, None).unwrap();
        let bob_len = session.expert("bob").unwrap().log().len();
        let carol_len = session.expert("carol").unwrap().log().len();
        session
            .speak(
                "alice",
                Some("just for you"),
                None,
                named(&["bob"]),
                &QueueBackend::with(&[]),
            )
            .await
            .unwrap();
        assert_eq!(session.expert("bob").unwrap().log().len(), bob_len + 1);
        assert_eq!(session.expert("carol").unwrap().log().len(), carol_len);
    }

    #[tokio::test]
    async fn test_speak_to_unknown_name_is_explicit_and_clean() {
        let mut session = session();
        session.register("alice", Role::User, None).unwrap();
        let before = session.expert("alice").unwrap().log().len();
        let err = session
            .speak(
                "alice",
                Some("anyone there?"),
                None,
                named(&["ghost"]),
                &QueueBackend::with(&[]),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Registry(RegistryError::Missing(_))
        ));
        // nothing was appended anywhere
        assert_eq!(session.expert("alice").unwrap().log().len(), before);
    }

    #[test]
    fn test_listen_forwards_instruction_notices_to_sudo() {
        let mut session = session();
        session.register("admin", Role::Assistant, None).unwrap();
        session.register("alice", Role::User, None).unwrap();
        let admin_len = session.expert("admin").unwrap().log().len();
        session
            .listen("alice", None, Some("budget doubled"))
            .unwrap();
        assert_eq!(session.expert("admin").unwrap().log().len(), admin_len + 1);
    }

    #[tokio::test]
    async fn test_alice_asks_bob_end_to_end() {
        let mut session = session();
        session.register("alice", Role::User, None).unwrap();
        session.register("bob", Role::Assistant, None).unwrap();
        session.register("carol", Role::User, None).unwrap();
        let backend = QueueBackend::with(&["bob: the answer is 42"]);

        let reply = session.ask("alice", "bob", "what is the answer?", &backend).await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content.text.as_deref(), Some("the answer is 42"));

        // carol observed both the addressed question and the reply
        let carol = session.expert("carol").unwrap();
        let texts: Vec<_> = carol
            .log()
            .messages()
            .iter()
            .filter_map(|m| m.content.text.clone())
            .collect();
        assert!(texts.iter().any(|t| t.contains("@bob") && t.contains("what is the answer?")));
        assert!(texts.iter().any(|t| t.contains("42")));
    }

    #[test]
    fn test_configured_infos_reach_instruction_turns() {
        let config = SessionConfig {
            infos: vec!["os".to_string()],
            ..SessionConfig::default()
        };
        let mut session = Session::new(config, Arc::new(StubSource));
        session.register("alice", Role::User, None).unwrap();
        let log = session.expert("alice").unwrap().log();
        let instructs = log
            .messages()
            .iter()
            .find(|m| m.message_type.as_deref() == Some("instructs_chat"))
            .and_then(|m| m.content.instructs.clone())
            .unwrap();
        // the "os" subject resolved through the info templates and was
        // injected into the chat briefing
        assert!(instructs.contains("info briefing"));
    }

    #[test]
    fn test_roster_lists_all_experts() {
        let mut session = session();
        session.register("alice", Role::User, None).unwrap();
        session.register("devops", Role::Assistant, None).unwrap();
        let roster = session.roster();
        assert!(roster.starts_with("###Available experts"));
        assert!(roster.contains("- Alice:"));
        assert!(roster.contains("- Devops:"));
        assert!(roster.contains("Domain: devops"));
    }
}
