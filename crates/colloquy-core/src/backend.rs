//! The model backend port and reply interpretation.
//!
//! Contract only. Implementations live outside the core; the scripted
//! queue backend used in tests sits in the infra crate.

use regex::Regex;
use std::sync::LazyLock;

use colloquy_types::backend::{BackendReply, BackendRequest, ToolCall};
use colloquy_types::error::BackendError;
use colloquy_types::palette::{EXEC_WATERMARK, RED, RESET, WATERMARK};

/// Sentinel substituted when a reply carries neither text nor a tool
/// call. The turn still lands in the log.
pub const NO_REPLY: &str = "No text received!";

/// Generic markup pattern. A reply matching this leaked tag syntax that
/// should have stayed on our side of the wire.
static MARKUP_LEAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("markup pattern compiles"));

/// Port to an external language model.
///
/// Native async fn in trait (RPITIT, Rust 2024 edition). Callers take
/// `&impl ModelBackend`; no dynamic dispatch is needed on this seam.
pub trait ModelBackend: Send + Sync {
    /// Human-readable backend name (e.g. "anthropic", "scripted").
    fn name(&self) -> &str;

    /// Submit a fully assembled request and await the complete reply.
    /// No timeout or retry at this layer; failures surface synchronously.
    fn submit(
        &self,
        request: &BackendRequest,
    ) -> impl std::future::Future<Output = Result<BackendReply, BackendError>> + Send;
}

/// A backend reply interpreted for the conversation log.
#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub text: String,
    /// Narration attached when the model requested a tool call.
    pub instructs: Option<String>,
    pub watermark: &'static str,
    /// False when the reply leaked generic markup. Delivered anyway.
    pub legal_response: bool,
    pub tool_call: Option<ToolCall>,
}

/// Interpret a raw reply.
///
/// Absent text with no tool call becomes the [`NO_REPLY`] sentinel. A
/// tool call replaces the text with a red request banner and attaches an
/// execution-request narration; markup leakage is flagged but never
/// withheld.
pub fn parse_reply(reply: &BackendReply, speaker: &str, tool_names: &[String]) -> ParsedReply {
    if let Some(call) = reply.tool_calls.as_ref().and_then(|calls| calls.first()) {
        return ParsedReply {
            text: call_banner(call, tool_names),
            instructs: Some(call_narration(call, speaker)),
            watermark: EXEC_WATERMARK,
            legal_response: true,
            tool_call: Some(call.clone()),
        };
    }

    let text = match reply.content.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_REPLY.to_string(),
    };
    let legal_response = !MARKUP_LEAK.is_match(&text);
    if !legal_response {
        tracing::warn!(speaker, "reply contains markup leakage, delivering anyway");
    }
    ParsedReply {
        text,
        instructs: None,
        watermark: WATERMARK,
        legal_response,
        tool_call: None,
    }
}

/// Red banner shown in place of reply text when a tool call was
/// requested: call name, truncated arguments, and the names that were
/// actually on offer.
fn call_banner(call: &ToolCall, tool_names: &[String]) -> String {
    let mut args = Vec::new();
    match serde_json::from_str::<serde_json::Value>(&call.arguments_json) {
        Ok(serde_json::Value::Object(map)) => {
            for (key, value) in map {
                let rendered = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                if rendered.chars().count() >= 100 {
                    let cut: String = rendered.chars().take(100).collect();
                    args.push(format!("{key}={cut}...,\n"));
                } else {
                    args.push(format!("{key}={rendered},"));
                }
            }
        }
        _ => args.push(call.arguments_json.clone()),
    }
    let roster: String = tool_names
        .iter()
        .map(|name| format!("\n- {name}"))
        .collect();
    format!(
        "{RED}Assistant requests function call:{RESET}\n {}{} \navailable functions: \n{roster}",
        call.name,
        args.join(" "),
    )
}

fn call_narration(call: &ToolCall, speaker: &str) -> String {
    format!(
        "Function execution requested: {name}, Requested by: {speaker}\n\
         - name: {name}\n\
         - arguments: {args}\n\
         - executor: {speaker}\n",
        name = call.name,
        args = call.arguments_json,
    )
}
