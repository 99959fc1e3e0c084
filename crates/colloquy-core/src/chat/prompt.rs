//! Backend request assembly from a conversation log.

use colloquy_types::backend::{BackendRequest, ToolChoice, TurnMessage};
use colloquy_types::config::SessionConfig;
use colloquy_types::error::ChatError;
use colloquy_types::role::Role;

use crate::content::RenderMode;
use crate::message::Envelope;
use crate::tool::ToolRegistry;

/// Serialize the message list into a backend request.
///
/// Tombstoned and still-pending envelopes are skipped. The local-only
/// `input` role maps to `user` on the wire. With `single_shot` set the
/// whole turn list collapses into one aggregated message carrying the
/// last turn's role, for completion-style backends.
pub fn build_request(
    envelopes: &[Envelope],
    config: &SessionConfig,
    tools: &ToolRegistry,
) -> Result<BackendRequest, ChatError> {
    let mut messages = Vec::with_capacity(envelopes.len());
    for envelope in envelopes {
        if envelope.is_removed() || envelope.is_pending_input() {
            continue;
        }
        let role = match envelope.role {
            Role::Input => Role::User,
            other => other,
        };
        let content = envelope.content.render(RenderMode::Plain, config.use_tags)?;
        messages.push(TurnMessage {
            role,
            content: content.trim().to_string(),
        });
    }

    if config.single_shot && messages.len() > 1 {
        let role = messages.last().map(|m| m.role).unwrap_or(Role::User);
        let content = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        tracing::debug!(turns = messages.len(), "collapsing turns for single shot");
        messages = vec![TurnMessage { role, content }];
    }

    let (tools, tool_choice) = if tools.is_empty() {
        (None, ToolChoice::None)
    } else {
        (Some(tools.specs()), ToolChoice::Auto)
    };

    Ok(BackendRequest {
        model: config.model.clone(),
        temperature: config.temperature,
        messages,
        tools,
        tool_choice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::backend::{ToolOutcome, ToolSpec};
    use serde_json::json;

    fn log() -> Vec<Envelope> {
        vec![
            Envelope::from_text("admin", "welcome", Some(Role::System)),
            Envelope::from_text("alice", "hi there", None),
            Envelope::from_text("bob", "hello back", Some(Role::Assistant)),
        ]
    }

    #[test]
    fn test_input_role_maps_to_user() {
        let request = build_request(&log(), &SessionConfig::default(), &ToolRegistry::new()).unwrap();
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].role, Role::User);
    }

    #[test]
    fn test_tombstones_and_pending_input_are_skipped() {
        let mut envelopes = log();
        envelopes[1].tombstone();
        envelopes.push(Envelope::pending_input("carol"));
        let request =
            build_request(&envelopes, &SessionConfig::default(), &ToolRegistry::new()).unwrap();
        assert_eq!(request.messages.len(), 2);
        assert!(!request.messages.iter().any(|m| m.content.contains("hi there")));
    }

    #[test]
    fn test_single_shot_collapses_turns() {
        let config = SessionConfig {
            single_shot: true,
            ..SessionConfig::default()
        };
        let request = build_request(&log(), &config, &ToolRegistry::new()).unwrap();
        assert_eq!(request.messages.len(), 1);
        let only = &request.messages[0];
        assert_eq!(only.role, Role::Assistant);
        assert!(only.content.contains("welcome"));
        assert!(only.content.contains("hello back"));
    }

    #[test]
    fn test_tools_advertised_when_registered() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec {
                    name: "echo".to_string(),
                    description: "repeat".to_string(),
                    parameters: json!({}),
                },
                |_| {
                    Ok(ToolOutcome {
                        status: Some(true),
                        body: String::new(),
                    })
                },
            )
            .unwrap();
        let request = build_request(&log(), &SessionConfig::default(), &registry).unwrap();
        assert_eq!(request.tool_choice, ToolChoice::Auto);
        assert_eq!(request.tools.unwrap().len(), 1);
    }

    #[test]
    fn test_empty_registry_means_no_tools() {
        let request = build_request(&log(), &SessionConfig::default(), &ToolRegistry::new()).unwrap();
        assert!(request.tools.is_none());
        assert_eq!(request.tool_choice, ToolChoice::None);
    }
}
