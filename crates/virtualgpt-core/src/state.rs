//! UI-agnostic chat state types
//!
//! These structures are shared between the core logic and whatever surface
//! renders it (the terminal UI, test doubles), and don't depend on any
//! specific UI framework.

use serde::{Deserialize, Serialize};

/// Server-assigned conversation identifier.
pub type ConversationId = i64;

/// A single message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            created_at: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Assistant,
            created_at: None,
        }
    }
}

/// Who wrote a message. The backend tags assistant messages as `ai`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant", alias = "bot")]
    Assistant,
}

/// One entry of the conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
}

/// Which endpoint set a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientVariant {
    #[default]
    Authenticated,
    Guest,
}

impl ClientVariant {
    pub fn display_name(&self) -> &'static str {
        match self {
            ClientVariant::Authenticated => "Sesión iniciada",
            ClientVariant::Guest => "Invitado",
        }
    }

    pub fn has_conversations(&self) -> bool {
        matches!(self, ClientVariant::Authenticated)
    }
}
