use crate::api::ChatBackend;
use crate::conversations::{ConversationManager, PendingSelect};
use crate::error::ApiResult;
use crate::send::{SendCoordinator, SendOutcome};
use crate::state::{ClientVariant, ConversationId, ConversationSummary};
use crate::view::ChatView;

/// Per-client state: the send gate and the active conversation.
///
/// Independent sessions share nothing, so several clients can live in one
/// process.
#[derive(Debug)]
pub struct ChatSession {
    pub sender: SendCoordinator,
    pub conversations: ConversationManager,
}

impl ChatSession {
    pub fn new(variant: ClientVariant) -> Self {
        Self {
            sender: SendCoordinator::new(variant),
            conversations: ConversationManager::new(),
        }
    }

    pub fn variant(&self) -> ClientVariant {
        self.sender.variant()
    }

    pub fn active(&self) -> Option<ConversationId> {
        self.conversations.active()
    }

    pub async fn submit<B, V>(&mut self, raw: &str, backend: &B, view: &mut V) -> Option<SendOutcome>
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        let active = self.conversations.active_mut();
        self.sender.submit(raw, active, backend, view).await
    }

    /// Load the conversation list and open the first entry. Guests have no
    /// list and stay on the welcome placeholder.
    pub async fn start<B, V>(&mut self, backend: &B, view: &mut V) -> ApiResult<()>
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        if !self.variant().has_conversations() {
            return Ok(());
        }

        let items = backend.list_conversations().await?;
        if let Some(pending) = self.list_loaded(items, view) {
            let result = backend.conversation_messages(pending.id).await;
            self.conversations.finish_select(pending, result, view);
        }
        Ok(())
    }

    /// Install the startup list and pick the conversation to open.
    pub fn list_loaded<V>(&mut self, items: Vec<ConversationSummary>, view: &mut V) -> Option<PendingSelect>
    where
        V: ChatView + ?Sized,
    {
        log::info!("loaded {} conversations", items.len());
        view.replace_items(items);
        self.conversations.initial_select(view)
    }

    /// Reload the list after the server created a conversation.
    pub async fn refresh<B, V>(&mut self, backend: &B, view: &mut V) -> ApiResult<()>
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        let items = backend.list_conversations().await?;
        if let Some(pending) = self.list_reloaded(items, view) {
            let result = backend.conversation_messages(pending.id).await;
            self.conversations.finish_select(pending, result, view);
        }
        Ok(())
    }

    /// Install a reloaded list, keeping the active conversation if it is
    /// still listed.
    pub fn list_reloaded<V>(&mut self, items: Vec<ConversationSummary>, view: &mut V) -> Option<PendingSelect>
    where
        V: ChatView + ?Sized,
    {
        log::debug!("reloaded {} conversations", items.len());
        self.conversations.refresh(items, view)
    }

    /// Returns whether the session was ended.
    pub async fn logout<B>(&mut self, confirmed: bool, backend: &B) -> ApiResult<bool>
    where
        B: ChatBackend + ?Sized,
    {
        if !self.begin_logout(confirmed) {
            return Ok(false);
        }
        let result = backend.logout().await;
        self.finish_logout(result)?;
        Ok(true)
    }

    /// Whether a logout request should be sent.
    pub fn begin_logout(&self, confirmed: bool) -> bool {
        confirmed && self.variant().has_conversations()
    }

    pub fn finish_logout(&mut self, result: ApiResult<()>) -> ApiResult<()> {
        result?;
        *self.conversations.active_mut() = None;
        log::info!("logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatReply, ConversationTranscript};
    use crate::error::ApiError;
    use crate::state::{Message, Sender};
    use crate::test_support::{Call, RecordingView, ScriptedBackend};

    fn summary(id: ConversationId, title: &str) -> ConversationSummary {
        ConversationSummary { id, title: title.to_string() }
    }

    #[tokio::test]
    async fn test_start_opens_first_conversation() {
        let backend = ScriptedBackend::default()
            .list(Ok(vec![summary(5, "Reciente"), summary(2, "Antigua")]))
            .transcript(Ok(ConversationTranscript {
                title: "Reciente".to_string(),
                messages: vec![Message::user("hola"), Message::assistant("buenas")],
            }));
        let mut view = RecordingView::new();
        let mut session = ChatSession::new(ClientVariant::Authenticated);

        session.start(&backend, &mut view).await.unwrap();

        assert_eq!(session.active(), Some(5));
        assert_eq!(view.state.conversations.len(), 2);
        assert_eq!(view.state.title, "Reciente");
        assert_eq!(backend.calls(), vec![Call::List, Call::Messages(5)]);
    }

    #[tokio::test]
    async fn test_guest_start_touches_nothing() {
        let backend = ScriptedBackend::default();
        let mut view = RecordingView::new();
        let mut session = ChatSession::new(ClientVariant::Guest);

        session.start(&backend, &mut view).await.unwrap();
        assert!(backend.calls().is_empty());
        assert!(view.events.is_empty());
    }

    #[tokio::test]
    async fn test_first_message_then_refresh_reselects_new_conversation() {
        let backend = ScriptedBackend::default()
            .reply(Ok(ChatReply {
                reply: "Hola, ¿en qué ayudo?".to_string(),
                conversation_id: Some(42),
            }))
            .list(Ok(vec![summary(42, "Nueva conversación"), summary(7, "Chat A")]))
            .transcript(Ok(ConversationTranscript {
                title: "Nueva conversación".to_string(),
                messages: vec![Message::user("Hola"), Message::assistant("Hola, ¿en qué ayudo?")],
            }));
        let mut view = RecordingView::with_conversations(&[(7, "Chat A")]);
        let mut session = ChatSession::new(ClientVariant::Authenticated);

        let outcome = session.submit("Hola", &backend, &mut view).await;
        assert_eq!(outcome, Some(SendOutcome::Adopted(42)));
        assert!(view.state.take_refresh_request());

        session.refresh(&backend, &mut view).await.unwrap();
        assert_eq!(session.active(), Some(42));
        assert!(view.state.conversations.is_active(42));
        assert_eq!(view.state.transcript.len(), 2);
        assert_eq!(view.state.transcript.entries()[1].message.sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn test_logout_needs_confirmation() {
        let backend = ScriptedBackend::default();
        let mut session = ChatSession::new(ClientVariant::Authenticated);

        assert!(!session.logout(false, &backend).await.unwrap());
        assert!(backend.calls().is_empty());

        assert!(session.logout(true, &backend).await.unwrap());
        assert_eq!(backend.calls(), vec![Call::Logout]);
    }

    #[test]
    fn test_logout_clears_active_only_on_success() {
        let mut session = ChatSession::new(ClientVariant::Authenticated);
        *session.conversations.active_mut() = Some(7);

        assert!(session.finish_logout(Err(ApiError::Decode("offline".to_string()))).is_err());
        assert_eq!(session.active(), Some(7));

        session.finish_logout(Ok(())).unwrap();
        assert_eq!(session.active(), None);
    }

    #[test]
    fn test_guest_never_logs_out() {
        let session = ChatSession::new(ClientVariant::Guest);
        assert!(!session.begin_logout(true));
    }
}
