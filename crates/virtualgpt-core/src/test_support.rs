//! In-memory backend and recording view shared by the controller tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ChatBackend, ChatReply, ConversationTranscript, OutgoingMessage};
use crate::error::{ApiError, ApiResult};
use crate::state::{ConversationId, ConversationSummary, Message, Sender};
use crate::transcript::Welcome;
use crate::view::{ChatView, ViewState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send(OutgoingMessage),
    Messages(ConversationId),
    Rename(ConversationId, String),
    Delete(ConversationId),
    List,
    Logout,
}

/// Answers each call from a queue scripted by the test. An empty queue
/// answers with a transport-style failure.
#[derive(Default)]
pub struct ScriptedBackend {
    pub calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<ApiResult<ChatReply>>>,
    transcripts: Mutex<VecDeque<ApiResult<ConversationTranscript>>>,
    renames: Mutex<VecDeque<ApiResult<String>>>,
    deletes: Mutex<VecDeque<ApiResult<()>>>,
    lists: Mutex<VecDeque<ApiResult<Vec<ConversationSummary>>>>,
}

fn unscripted<T>() -> ApiResult<T> {
    Err(ApiError::Decode("no scripted response".to_string()))
}

impl ScriptedBackend {
    pub fn reply(self, result: ApiResult<ChatReply>) -> Self {
        self.replies.lock().unwrap().push_back(result);
        self
    }

    pub fn transcript(self, result: ApiResult<ConversationTranscript>) -> Self {
        self.transcripts.lock().unwrap().push_back(result);
        self
    }

    pub fn rename(self, result: ApiResult<String>) -> Self {
        self.renames.lock().unwrap().push_back(result);
        self
    }

    pub fn delete(self, result: ApiResult<()>) -> Self {
        self.deletes.lock().unwrap().push_back(result);
        self
    }

    pub fn list(self, result: ApiResult<Vec<ConversationSummary>>) -> Self {
        self.lists.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<ChatReply> {
        self.record(Call::Send(message.clone()));
        self.replies.lock().unwrap().pop_front().unwrap_or_else(unscripted)
    }

    async fn conversation_messages(&self, id: ConversationId) -> ApiResult<ConversationTranscript> {
        self.record(Call::Messages(id));
        self.transcripts.lock().unwrap().pop_front().unwrap_or_else(unscripted)
    }

    async fn rename_conversation(&self, id: ConversationId, title: &str) -> ApiResult<String> {
        self.record(Call::Rename(id, title.to_string()));
        self.renames.lock().unwrap().pop_front().unwrap_or_else(unscripted)
    }

    async fn delete_conversation(&self, id: ConversationId) -> ApiResult<()> {
        self.record(Call::Delete(id));
        self.deletes.lock().unwrap().pop_front().unwrap_or_else(unscripted)
    }

    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        self.record(Call::List);
        self.lists.lock().unwrap().pop_front().unwrap_or_else(unscripted)
    }

    async fn logout(&self) -> ApiResult<()> {
        self.record(Call::Logout);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Rendered(Sender, String),
    Transcript(Vec<String>),
    Welcome(Welcome),
    InputCleared,
    Busy(bool),
    Title(String),
    Active(Option<ConversationId>),
    Renamed(ConversationId, String),
    Removed(ConversationId),
    Alert(String),
    Refresh,
}

/// A [`ViewState`] that also logs every call in order.
pub struct RecordingView {
    pub state: ViewState,
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self {
            state: ViewState::new("U", 8),
            events: Vec::new(),
        }
    }

    pub fn with_conversations(items: &[(ConversationId, &str)]) -> Self {
        let mut view = Self::new();
        view.state.replace_items(
            items
                .iter()
                .map(|(id, title)| ConversationSummary { id: *id, title: title.to_string() })
                .collect(),
        );
        view
    }

    pub fn rendered(&self) -> Vec<(Sender, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Rendered(sender, text) => Some((*sender, text.clone())),
                _ => None,
            })
            .collect()
    }
}

impl ChatView for RecordingView {
    fn render_message(&mut self, message: Message, animate: bool) {
        self.events.push(ViewEvent::Rendered(message.sender, message.text.clone()));
        self.state.render_message(message, animate);
    }

    fn show_transcript(&mut self, messages: Vec<Message>) {
        self.events
            .push(ViewEvent::Transcript(messages.iter().map(|m| m.text.clone()).collect()));
        self.state.show_transcript(messages);
    }

    fn clear_and_show_welcome(&mut self, welcome: Welcome) {
        self.events.push(ViewEvent::Welcome(welcome));
        self.state.clear_and_show_welcome(welcome);
    }

    fn clear_input(&mut self) {
        self.events.push(ViewEvent::InputCleared);
        self.state.clear_input();
    }

    fn set_send_busy(&mut self, busy: bool) {
        self.events.push(ViewEvent::Busy(busy));
        self.state.set_send_busy(busy);
    }

    fn set_title(&mut self, title: &str) {
        self.events.push(ViewEvent::Title(title.to_string()));
        self.state.set_title(title);
    }

    fn set_active_item(&mut self, id: Option<ConversationId>) {
        self.events.push(ViewEvent::Active(id));
        self.state.set_active_item(id);
    }

    fn rename_item(&mut self, id: ConversationId, title: &str) {
        self.events.push(ViewEvent::Renamed(id, title.to_string()));
        self.state.rename_item(id, title);
    }

    fn remove_item(&mut self, id: ConversationId) {
        self.events.push(ViewEvent::Removed(id));
        self.state.remove_item(id);
    }

    fn replace_items(&mut self, items: Vec<ConversationSummary>) {
        self.state.replace_items(items);
    }

    fn first_item(&self) -> Option<ConversationId> {
        self.state.first_item()
    }

    fn close_sidebar_if_narrow(&mut self) {
        self.state.close_sidebar_if_narrow();
    }

    fn alert(&mut self, message: &str) {
        self.events.push(ViewEvent::Alert(message.to_string()));
        self.state.alert(message);
    }

    fn request_refresh(&mut self) {
        self.events.push(ViewEvent::Refresh);
        self.state.request_refresh();
    }
}
