//! The view binding the controllers drive, and [`ViewState`], an in-memory
//! rendering model that any frontend can draw from.

use std::collections::VecDeque;

use crate::conversations::ConversationList;
use crate::input::InputBox;
use crate::sidebar::{Sidebar, NARROW_VIEWPORT_WIDTH};
use crate::state::{ConversationId, ConversationSummary, Message};
use crate::transcript::{Transcript, Welcome};

/// Header title for a fresh chat.
pub const DEFAULT_TITLE: &str = "VirtualGPT";

/// Header title once the active conversation has been deleted.
pub const NO_SELECTION_TITLE: &str = "Selecciona una conversación";

/// What the send, select, rename and delete flows are allowed to touch.
pub trait ChatView {
    fn render_message(&mut self, message: Message, animate: bool);

    /// Replace the transcript with a loaded conversation, no transitions.
    fn show_transcript(&mut self, messages: Vec<Message>);

    fn clear_and_show_welcome(&mut self, welcome: Welcome);

    fn clear_input(&mut self);

    /// Disable and relabel the send control while a message is in flight.
    fn set_send_busy(&mut self, busy: bool);

    fn set_title(&mut self, title: &str);

    /// Mark one list entry active and every other inactive; `None` clears all.
    fn set_active_item(&mut self, id: Option<ConversationId>);

    fn rename_item(&mut self, id: ConversationId, title: &str);

    fn remove_item(&mut self, id: ConversationId);

    fn replace_items(&mut self, items: Vec<ConversationSummary>);

    fn first_item(&self) -> Option<ConversationId>;

    fn close_sidebar_if_narrow(&mut self);

    /// Modal notice; queued until the frontend shows it.
    fn alert(&mut self, message: &str);

    /// Reload the conversation list and reselect the active conversation.
    fn request_refresh(&mut self);
}

/// Everything a frontend needs to draw one chat screen
#[derive(Debug, Clone)]
pub struct ViewState {
    pub title: String,
    pub transcript: Transcript,
    pub conversations: ConversationList,
    pub sidebar: Sidebar,
    pub input: InputBox,
    pub send_busy: bool,
    pub user_initial: String,
    pub viewport_width: u16,
    pub narrow_width: u16,
    alerts: VecDeque<String>,
    refresh_requested: bool,
}

impl ViewState {
    pub fn new(user_initial: &str, max_input_height: u16) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            transcript: Transcript::new(),
            conversations: ConversationList::default(),
            sidebar: Sidebar::default(),
            input: InputBox::new(max_input_height),
            send_busy: false,
            user_initial: user_initial.to_string(),
            viewport_width: u16::MAX,
            narrow_width: NARROW_VIEWPORT_WIDTH,
            alerts: VecDeque::new(),
            refresh_requested: false,
        }
    }

    pub fn with_narrow_width(mut self, narrow_width: u16) -> Self {
        self.narrow_width = narrow_width;
        self
    }

    pub fn next_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    pub fn has_alert(&self) -> bool {
        !self.alerts.is_empty()
    }

    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }
}

impl ChatView for ViewState {
    fn render_message(&mut self, message: Message, animate: bool) {
        self.transcript.render(message, animate);
    }

    fn show_transcript(&mut self, messages: Vec<Message>) {
        self.transcript.replace(messages);
    }

    fn clear_and_show_welcome(&mut self, welcome: Welcome) {
        self.transcript.clear_and_show_welcome(welcome);
    }

    fn clear_input(&mut self) {
        self.input.clear();
    }

    fn set_send_busy(&mut self, busy: bool) {
        self.send_busy = busy;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_active_item(&mut self, id: Option<ConversationId>) {
        self.conversations.set_active(id);
    }

    fn rename_item(&mut self, id: ConversationId, title: &str) {
        self.conversations.rename(id, title);
    }

    fn remove_item(&mut self, id: ConversationId) {
        self.conversations.remove(id);
    }

    fn replace_items(&mut self, items: Vec<ConversationSummary>) {
        self.conversations.replace(items);
    }

    fn first_item(&self) -> Option<ConversationId> {
        self.conversations.first()
    }

    fn close_sidebar_if_narrow(&mut self) {
        self.sidebar.close_if_narrow(self.viewport_width, self.narrow_width);
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push_back(message.to_string());
    }

    fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }
}
