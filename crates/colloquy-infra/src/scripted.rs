//! Deterministic scripted backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use colloquy_core::backend::ModelBackend;
use colloquy_types::backend::{BackendReply, BackendRequest};
use colloquy_types::error::BackendError;

/// Backend replaying a fixed queue of replies in order. When the queue
/// is drained it reports itself unavailable, which exercises the same
/// error path a dead remote host would.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<BackendReply>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = BackendReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    /// Shortcut for plain text replies.
    pub fn with_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|text| BackendReply {
            content: Some(text.to_string()),
            tool_calls: None,
        }))
    }

    pub fn push(&self, reply: BackendReply) {
        self.replies.lock().expect("reply queue lock").push_back(reply);
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("reply queue lock").len()
    }
}

impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, request: &BackendRequest) -> Result<BackendReply, BackendError> {
        tracing::debug!(model = %request.model, turns = request.messages.len(), "scripted submit");
        self.replies
            .lock()
            .expect("reply queue lock")
            .pop_front()
            .ok_or_else(|| BackendError::Unavailable("scripted reply queue drained".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::backend::{ToolChoice, TurnMessage};
    use colloquy_types::role::Role;

    fn request() -> BackendRequest {
        BackendRequest {
            model: "scripted".to_string(),
            temperature: 0.0,
            messages: vec![TurnMessage {
                role: Role::User,
                content: "hi".to_string(),
            }],
            tools: None,
            tool_choice: ToolChoice::None,
        }
    }

    #[tokio::test]
    async fn test_replies_in_order_then_unavailable() {
        let backend = ScriptedBackend::with_texts(&["first", "second"]);
        let one = backend.submit(&request()).await.unwrap();
        let two = backend.submit(&request()).await.unwrap();
        assert_eq!(one.content.as_deref(), Some("first"));
        assert_eq!(two.content.as_deref(), Some("second"));
        let err = backend.submit(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_push_refills_the_queue() {
        let backend = ScriptedBackend::with_texts(&[]);
        assert_eq!(backend.remaining(), 0);
        backend.push(BackendReply {
            content: Some("late".to_string()),
            tool_calls: None,
        });
        let reply = backend.submit(&request()).await.unwrap();
        assert_eq!(reply.content.as_deref(), Some("late"));
    }
}
