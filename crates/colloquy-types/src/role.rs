//! Message roles for turn-structured dialogue.
//!
//! `input` is the role of raw interactive input before it is attributed;
//! the three provider-facing roles follow the usual chat-completion shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message within a conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Input,
}

impl Role {
    /// Whether messages of this role carry a watermark.
    pub fn is_watermarked(&self) -> bool {
        matches!(self, Role::Assistant)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Input
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Input => write!(f, "input"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "input" => Ok(Role::Input),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}
