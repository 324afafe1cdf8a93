use std::future::Future;
use std::sync::Arc;

use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use virtualgpt_core::{
    ApiError, ApiResult, ChatBackend, ChatReply, ChatSession, ChatView, ClientVariant, Config,
    ConversationId, ConversationSummary, ConversationTranscript, InputBox, PendingDelete,
    PendingRename, PendingSelect, PendingSend, ViewState,
};

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Sidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPurpose {
    Startup,
    Refresh,
}

/// Result of a backend call made off the UI loop
#[derive(Debug)]
pub enum ApiEvent {
    Sent(ApiResult<ChatReply>),
    Loaded(PendingSelect, ApiResult<ConversationTranscript>),
    Renamed(PendingRename, ApiResult<String>),
    Deleted(PendingDelete, ApiResult<()>),
    Listed(ListPurpose, ApiResult<Vec<ConversationSummary>>),
    LoggedOut(ApiResult<()>),
}

/// Modal popups, in place of the browser's prompt/confirm/alert
#[derive(Debug)]
pub enum Dialog {
    Rename {
        id: ConversationId,
        current: String,
        input: InputBox,
    },
    ConfirmDelete {
        id: ConversationId,
        title: String,
    },
    ConfirmLogout,
    Alert(String),
}

pub const DELETE_PROMPT: &str =
    "¿Estás seguro de que quieres eliminar esta conversación? Esta acción no se puede deshacer.";
pub const LOGOUT_PROMPT: &str = "¿Estás seguro de que quieres cerrar sesión?";
pub const RENAME_PROMPT: &str = "Nuevo nombre para la conversación:";

pub struct App {
    // Core state
    pub should_quit: bool,
    pub session: ChatSession,
    pub view: ViewState,
    pub focus: Focus,
    pub dialog: Option<Dialog>,

    // Sidebar cursor (independent of the active conversation)
    pub list_state: ListState,

    // Transcript scrolling
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,
    follow_transcript: bool,

    // Animation state for the sending spinner
    pub animation_frame: u8,

    backend: Arc<dyn ChatBackend>,
    pending_send: Option<PendingSend>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: &Config,
        variant: ClientVariant,
        backend: Arc<dyn ChatBackend>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let initial = config.user_initial.clone().unwrap_or_else(|| match variant {
            ClientVariant::Authenticated => "U".to_string(),
            ClientVariant::Guest => "I".to_string(),
        });

        Self {
            should_quit: false,
            session: ChatSession::new(variant),
            view: ViewState::new(&initial, config.max_input_height).with_narrow_width(config.narrow_width),
            focus: Focus::Input,
            dialog: None,
            list_state: ListState::default(),
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            follow_transcript: true,
            animation_frame: 0,
            backend,
            pending_send: None,
            events,
        }
    }

    pub fn variant(&self) -> ClientVariant {
        self.session.variant()
    }

    /// Run `call` on its own task and deliver its result as an [`ApiEvent`].
    /// A panicking call is reported as a failed one.
    fn spawn_api<T, F, Fut>(&self, call: F, wrap: impl FnOnce(ApiResult<T>) -> ApiEvent + Send + 'static)
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn ChatBackend>) -> Fut,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let work = tokio::spawn(call(self.backend.clone()));
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = work
                .await
                .unwrap_or_else(|e| Err(ApiError::Task(e.to_string())));
            let _ = events.send(AppEvent::Api(wrap(result)));
        });
    }

    /// Load the conversation list and open the first entry.
    pub fn start(&mut self) {
        if self.variant().has_conversations() {
            self.request_list(ListPurpose::Startup);
        }
    }

    fn request_list(&self, purpose: ListPurpose) {
        self.spawn_api(
            |backend| async move { backend.list_conversations().await },
            move |result| ApiEvent::Listed(purpose, result),
        );
    }

    fn request_transcript(&self, pending: PendingSelect) {
        self.spawn_api(
            move |backend| async move { backend.conversation_messages(pending.id).await },
            move |result| ApiEvent::Loaded(pending, result),
        );
    }

    // Send flow

    pub fn submit_input(&mut self) {
        let text = self.view.input.value().to_string();
        let active = self.session.active();
        let Some(pending) = self.session.sender.begin(&text, active, &mut self.view) else {
            return;
        };

        let message = pending.message().clone();
        self.pending_send = Some(pending);
        self.follow_transcript = true;
        self.spawn_api(
            move |backend| async move { backend.send_message(&message).await },
            ApiEvent::Sent,
        );
    }

    pub fn is_sending(&self) -> bool {
        self.session.sender.is_in_flight()
    }

    // Conversation flows

    pub fn select_conversation(&mut self, id: ConversationId) {
        let pending = self.session.conversations.begin_select(id, &mut self.view);
        if !self.view.sidebar.is_open() && self.focus == Focus::Sidebar && self.is_narrow() {
            self.focus = Focus::Input;
        }
        self.request_transcript(pending);
    }

    pub fn select_under_cursor(&mut self) {
        if let Some(id) = self.cursor_conversation().map(|c| c.id) {
            self.select_conversation(id);
        }
    }

    pub fn new_chat(&mut self) {
        self.session.conversations.create(&mut self.view);
        self.focus = Focus::Input;
    }

    /// Conversation the sidebar cursor is on, falling back to the active one.
    pub fn cursor_conversation(&self) -> Option<&ConversationSummary> {
        let items = self.view.conversations.items();
        match self.focus {
            Focus::Sidebar => self.list_state.selected().and_then(|i| items.get(i)),
            Focus::Input => self.session.active().and_then(|id| self.view.conversations.get(id)),
        }
    }

    pub fn open_rename(&mut self) {
        if let Some(item) = self.cursor_conversation().cloned() {
            let mut input = InputBox::new(1);
            for c in item.title.chars() {
                input.insert_char(c);
            }
            self.dialog = Some(Dialog::Rename {
                id: item.id,
                current: item.title,
                input,
            });
        }
    }

    pub fn open_delete(&mut self) {
        if let Some(item) = self.cursor_conversation().cloned() {
            self.dialog = Some(Dialog::ConfirmDelete {
                id: item.id,
                title: item.title,
            });
        }
    }

    pub fn open_logout(&mut self) {
        if self.variant().has_conversations() {
            self.dialog = Some(Dialog::ConfirmLogout);
        }
    }

    /// `proposed` is `None` when the prompt was cancelled.
    pub fn rename(&mut self, id: ConversationId, current: &str, proposed: Option<&str>) {
        let Some(pending) = self.session.conversations.begin_rename(id, current, proposed) else {
            return;
        };
        let request = pending.clone();
        self.spawn_api(
            move |backend| async move { backend.rename_conversation(request.id, &request.title).await },
            move |result| ApiEvent::Renamed(pending, result),
        );
    }

    pub fn delete(&mut self, id: ConversationId, confirmed: bool) {
        let Some(pending) = self.session.conversations.begin_delete(id, confirmed) else {
            return;
        };
        self.spawn_api(
            move |backend| async move { backend.delete_conversation(pending.id).await },
            move |result| ApiEvent::Deleted(pending, result),
        );
    }

    pub fn logout(&mut self, confirmed: bool) {
        if self.session.begin_logout(confirmed) {
            self.spawn_api(|backend| async move { backend.logout().await }, ApiEvent::LoggedOut);
        }
    }

    /// Apply a finished backend call on the UI loop.
    pub fn apply(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Sent(result) => {
                if let Some(pending) = self.pending_send.take() {
                    let active = self.session.conversations.active_mut();
                    self.session.sender.finish(pending, result, active, &mut self.view);
                    self.follow_transcript = true;
                }
            }
            ApiEvent::Loaded(pending, result) => {
                if self.session.conversations.finish_select(pending, result, &mut self.view) {
                    self.follow_transcript = true;
                }
            }
            ApiEvent::Renamed(pending, result) => {
                self.session.conversations.finish_rename(pending, result, &mut self.view);
            }
            ApiEvent::Deleted(pending, result) => {
                if let Some(next) = self.session.conversations.finish_delete(pending, result, &mut self.view) {
                    self.request_transcript(next);
                }
                self.clamp_cursor();
            }
            ApiEvent::Listed(purpose, Ok(items)) => {
                let next = match purpose {
                    ListPurpose::Startup => self.session.list_loaded(items, &mut self.view),
                    ListPurpose::Refresh => self.session.list_reloaded(items, &mut self.view),
                };
                if let Some(next) = next {
                    self.request_transcript(next);
                }
                self.sync_cursor_to_active();
            }
            ApiEvent::Listed(_, Err(err)) => {
                log::error!("loading conversation list failed: {}", err);
                self.view.alert(&format!("No se pudo cargar la lista de conversaciones: {}", err));
            }
            ApiEvent::LoggedOut(result) => match self.session.finish_logout(result) {
                Ok(()) => self.should_quit = true,
                Err(err) => {
                    log::error!("logout failed: {}", err);
                    self.view.alert("Error al cerrar sesión");
                }
            },
        }
        self.after_update();
    }

    /// Follow-up work the controllers asked the view for.
    pub fn after_update(&mut self) {
        if self.view.take_refresh_request() {
            self.request_list(ListPurpose::Refresh);
        }
        if self.dialog.is_none() {
            if let Some(message) = self.view.next_alert() {
                self.dialog = Some(Dialog::Alert(message));
            }
        }
    }

    // Sidebar

    pub fn is_narrow(&self) -> bool {
        virtualgpt_core::sidebar::is_narrow(self.view.viewport_width, self.view.narrow_width)
    }

    /// The list is always shown on wide terminals and toggled on narrow ones.
    pub fn sidebar_visible(&self) -> bool {
        self.variant().has_conversations() && (!self.is_narrow() || self.view.sidebar.is_open())
    }

    pub fn toggle_sidebar(&mut self) {
        if !self.variant().has_conversations() {
            return;
        }
        self.view.sidebar.toggle();
        self.focus = if self.view.sidebar.is_open() {
            self.sync_cursor_to_active();
            Focus::Sidebar
        } else {
            Focus::Input
        };
    }

    pub fn close_sidebar(&mut self) {
        self.view.sidebar.close();
        self.focus = Focus::Input;
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input if self.sidebar_visible() => {
                self.sync_cursor_to_active();
                Focus::Sidebar
            }
            _ => Focus::Input,
        };
    }

    pub fn list_down(&mut self) {
        let len = self.view.conversations.len();
        if len == 0 {
            return;
        }
        let next = self.list_state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
        self.list_state.select(Some(next));
    }

    pub fn list_up(&mut self) {
        let next = self.list_state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
        if !self.view.conversations.is_empty() {
            self.list_state.select(Some(next));
        }
    }

    fn sync_cursor_to_active(&mut self) {
        let position = self
            .session
            .active()
            .and_then(|id| self.view.conversations.position(id))
            .or(if self.view.conversations.is_empty() { None } else { Some(0) });
        self.list_state.select(position);
    }

    fn clamp_cursor(&mut self) {
        let len = self.view.conversations.len();
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    // Transcript scrolling

    pub fn tick_animation(&mut self) {
        self.view.transcript.tick();
        if self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_transcript = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines);
    }

    /// Called by the renderer once the transcript's wrapped height is known.
    pub fn fit_transcript_scroll(&mut self, total_lines: u16) {
        if self.view.transcript.take_scroll_to_end() {
            self.follow_transcript = true;
        }

        let max_scroll = total_lines.saturating_sub(self.transcript_height);
        if self.follow_transcript || self.transcript_scroll >= max_scroll {
            self.transcript_scroll = max_scroll;
            self.follow_transcript = true;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use virtualgpt_core::{Message, OutgoingMessage, Sender, FALLBACK_REPLY};

    /// Answers from fixed data; new conversations get id 42.
    pub(crate) struct FakeBackend {
        pub list: Vec<ConversationSummary>,
        pub fail_sends: bool,
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<ChatReply> {
            if self.fail_sends {
                return Err(ApiError::Decode("offline".to_string()));
            }
            Ok(ChatReply {
                reply: format!("eco: {}", message.text),
                conversation_id: Some(message.conversation_id.unwrap_or(42)),
            })
        }

        async fn conversation_messages(&self, id: ConversationId) -> ApiResult<ConversationTranscript> {
            Ok(ConversationTranscript {
                title: format!("Chat {}", id),
                messages: vec![Message::user("hola"), Message::assistant("buenas")],
            })
        }

        async fn rename_conversation(&self, _id: ConversationId, title: &str) -> ApiResult<String> {
            Ok(title.to_string())
        }

        async fn delete_conversation(&self, _id: ConversationId) -> ApiResult<()> {
            Ok(())
        }

        async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
            Ok(self.list.clone())
        }

        async fn logout(&self) -> ApiResult<()> {
            Ok(())
        }
    }

    pub(crate) fn summaries(items: &[(ConversationId, &str)]) -> Vec<ConversationSummary> {
        items
            .iter()
            .map(|(id, title)| ConversationSummary { id: *id, title: title.to_string() })
            .collect()
    }

    pub(crate) fn test_app(
        variant: ClientVariant,
        backend: FakeBackend,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(&Config::new(), variant, Arc::new(backend), tx);
        (app, rx)
    }

    /// Deliver the next backend result to the app.
    pub(crate) async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        match rx.recv().await {
            Some(AppEvent::Api(event)) => app.apply(event),
            other => panic!("expected a backend event, got {:?}", other),
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.view.input.insert_char(c);
        }
    }

    #[tokio::test]
    async fn test_startup_opens_first_conversation() {
        let backend = FakeBackend { list: summaries(&[(7, "Chat A"), (3, "Chat B")]), fail_sends: false };
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend);

        app.start();
        pump(&mut app, &mut rx).await;
        assert_eq!(app.session.active(), Some(7));
        assert_eq!(app.list_state.selected(), Some(0));

        pump(&mut app, &mut rx).await;
        assert_eq!(app.view.title, "Chat 7");
        assert_eq!(app.view.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_first_message_adopts_and_refreshes_list() {
        let backend = FakeBackend {
            list: summaries(&[(42, "Nueva conversación"), (7, "Chat A")]),
            fail_sends: false,
        };
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend);

        type_text(&mut app, "Hola");
        app.submit_input();
        assert!(app.is_sending());
        assert!(app.view.input.is_empty());
        assert!(app.view.send_busy);

        // reply
        pump(&mut app, &mut rx).await;
        assert!(!app.is_sending());
        assert_eq!(app.session.active(), Some(42));

        // refreshed list, then the adopted conversation's transcript
        pump(&mut app, &mut rx).await;
        assert_eq!(app.view.conversations.len(), 2);
        assert!(app.view.conversations.is_active(42));
        pump(&mut app, &mut rx).await;
        assert_eq!(app.view.title, "Chat 42");
    }

    #[tokio::test]
    async fn test_guest_failure_shows_fallback_and_unlocks() {
        let backend = FakeBackend { list: Vec::new(), fail_sends: true };
        let (mut app, mut rx) = test_app(ClientVariant::Guest, backend);

        type_text(&mut app, "test");
        app.submit_input();
        type_text(&mut app, "otra");
        app.submit_input();

        pump(&mut app, &mut rx).await;

        let rendered: Vec<_> = app
            .view
            .transcript
            .entries()
            .iter()
            .map(|e| (e.message.sender, e.message.text.clone()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                (Sender::User, "test".to_string()),
                (Sender::Assistant, FALLBACK_REPLY.to_string()),
            ]
        );
        assert!(!app.is_sending());
        assert!(!app.view.send_busy);
        // the ignored second message stays in the box
        assert_eq!(app.view.input.value(), "otra");
    }

    #[tokio::test]
    async fn test_delete_active_only_conversation() {
        let backend = FakeBackend { list: summaries(&[(7, "Chat A")]), fail_sends: false };
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend);
        app.start();
        pump(&mut app, &mut rx).await;
        pump(&mut app, &mut rx).await;

        app.open_delete();
        assert!(matches!(app.dialog, Some(Dialog::ConfirmDelete { id: 7, .. })));
        app.dialog = None;
        app.delete(7, true);
        pump(&mut app, &mut rx).await;

        assert_eq!(app.session.active(), None);
        assert!(app.view.conversations.is_empty());
        assert_eq!(app.list_state.selected(), None);
        assert_eq!(app.view.title, virtualgpt_core::view::NO_SELECTION_TITLE);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rename_from_dialog_values() {
        let backend = FakeBackend { list: summaries(&[(7, "Chat A")]), fail_sends: false };
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend);
        app.start();
        pump(&mut app, &mut rx).await;
        pump(&mut app, &mut rx).await;

        app.rename(7, "Chat A", Some("   "));
        assert!(rx.try_recv().is_err());

        app.rename(7, "Chat A", Some("Recetas"));
        pump(&mut app, &mut rx).await;
        assert_eq!(app.view.conversations.get(7).map(|c| c.title.as_str()), Some("Recetas"));
        assert_eq!(app.view.title, "Recetas");
    }

    #[tokio::test]
    async fn test_confirmed_logout_quits() {
        let backend = FakeBackend { list: Vec::new(), fail_sends: false };
        let (mut app, mut rx) = test_app(ClientVariant::Authenticated, backend);
        app.select_conversation(7);
        pump(&mut app, &mut rx).await;

        app.logout(false);
        assert!(rx.try_recv().is_err());

        app.logout(true);
        pump(&mut app, &mut rx).await;
        assert!(app.should_quit);
        assert_eq!(app.session.active(), None);
    }

    #[test]
    fn test_sidebar_visibility_follows_width() {
        let backend = FakeBackend { list: Vec::new(), fail_sends: false };
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(&Config::new(), ClientVariant::Authenticated, Arc::new(backend), tx);

        app.view.viewport_width = 160;
        assert!(app.sidebar_visible());

        app.view.viewport_width = 80;
        assert!(!app.sidebar_visible());
        app.toggle_sidebar();
        assert!(app.sidebar_visible());
        assert_eq!(app.focus, Focus::Sidebar);

        let guest = FakeBackend { list: Vec::new(), fail_sends: false };
        let (tx, _rx) = mpsc::unbounded_channel();
        let guest_app = App::new(&Config::new(), ClientVariant::Guest, Arc::new(guest), tx);
        assert!(!guest_app.sidebar_visible());
    }
}
