//! Backend contract: JSON bodies exchanged with the chat server and the
//! [`ChatBackend`] seam the controllers talk through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::{ClientVariant, ConversationId, ConversationSummary, Message};

/// Body of `POST /chat`. `conversation_id` is sent as `null` for a new chat.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub conversation_id: Option<ConversationId>,
}

/// Body of `POST /guest_chat`
#[derive(Debug, Serialize)]
pub struct GuestChatRequest<'a> {
    pub message: &'a str,
}

/// Reply to either chat endpoint. The guest endpoint never sets an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
}

/// Response of `GET /conversation/{id}/messages`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationTranscript {
    pub title: String,
    pub messages: Vec<Message>,
}

/// Body of `PUT /conversation/{id}/edit`
#[derive(Debug, Serialize)]
pub struct RenameRequest<'a> {
    pub title: &'a str,
}

/// Shape shared by the edit and delete endpoints:
/// `{success, title?}` or `{success: false, error}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MutationResponse {
    /// Collapse into a result, turning `success: false` into
    /// [`ApiError::Rejected`] with the server's message.
    pub fn into_result(self) -> ApiResult<Option<String>> {
        if self.success {
            Ok(self.title)
        } else {
            Err(ApiError::Rejected(
                self.error.unwrap_or_else(|| "Error desconocido".to_string()),
            ))
        }
    }
}

/// A message ready to leave the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub variant: ClientVariant,
    pub text: String,
    pub conversation_id: Option<ConversationId>,
}

/// Everything the controllers need from the server.
///
/// Implemented over HTTP by [`crate::http::HttpBackend`]; tests script it
/// in memory.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat` or `POST /guest_chat` depending on the message variant.
    async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<ChatReply>;

    async fn conversation_messages(&self, id: ConversationId) -> ApiResult<ConversationTranscript>;

    /// Returns the title the server stored.
    async fn rename_conversation(&self, id: ConversationId, title: &str) -> ApiResult<String>;

    async fn delete_conversation(&self, id: ConversationId) -> ApiResult<()>;

    /// Conversation list as the server renders it, newest first.
    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>>;

    async fn logout(&self) -> ApiResult<()>;
}
