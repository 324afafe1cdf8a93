//! Conversation list model and the manager that switches, renames and
//! deletes conversations against the backend.

use crate::api::{ChatBackend, ConversationTranscript};
use crate::error::{ApiError, ApiResult};
use crate::state::{ConversationId, ConversationSummary};
use crate::transcript::Welcome;
use crate::view::{ChatView, DEFAULT_TITLE, NO_SELECTION_TITLE};

const RENAME_FAILED: &str = "Error al actualizar el nombre de la conversación";
const DELETE_FAILED: &str = "Error al eliminar la conversación";

/// The visible conversation list, in server order, with at most one entry
/// marked active.
#[derive(Debug, Clone, Default)]
pub struct ConversationList {
    items: Vec<ConversationSummary>,
    active: Option<ConversationId>,
}

impl ConversationList {
    pub fn new(items: Vec<ConversationSummary>) -> Self {
        Self { items, active: None }
    }

    pub fn items(&self) -> &[ConversationSummary] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active(&self) -> Option<ConversationId> {
        self.active
    }

    pub fn is_active(&self, id: ConversationId) -> bool {
        self.active == Some(id)
    }

    pub fn first(&self) -> Option<ConversationId> {
        self.items.first().map(|c| c.id)
    }

    pub fn get(&self, id: ConversationId) -> Option<&ConversationSummary> {
        self.items.iter().find(|c| c.id == id)
    }

    pub fn position(&self, id: ConversationId) -> Option<usize> {
        self.items.iter().position(|c| c.id == id)
    }

    pub fn set_active(&mut self, id: Option<ConversationId>) {
        self.active = id;
    }

    pub fn rename(&mut self, id: ConversationId, title: &str) -> bool {
        match self.items.iter_mut().find(|c| c.id == id) {
            Some(item) => {
                item.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ConversationId) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        if self.active == Some(id) {
            self.active = None;
        }
        self.items.len() != before
    }

    /// Swap in a freshly loaded list, keeping the active mark if the entry
    /// survived.
    pub fn replace(&mut self, items: Vec<ConversationSummary>) {
        self.items = items;
        if let Some(id) = self.active {
            if self.get(id).is_none() {
                self.active = None;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PendingSelect {
    pub id: ConversationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PendingRename {
    pub id: ConversationId,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PendingDelete {
    pub id: ConversationId,
}

/// Owns the active conversation pointer.
///
/// Each backend-facing operation comes in two halves: `begin_*` applies the
/// immediate effects and says what to request, `finish_*` applies the
/// response. The async wrappers run both halves around one backend call.
#[derive(Debug, Default)]
pub struct ConversationManager {
    active: Option<ConversationId>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<ConversationId> {
        self.active
    }

    pub fn active_mut(&mut self) -> &mut Option<ConversationId> {
        &mut self.active
    }

    pub fn begin_select<V>(&mut self, id: ConversationId, view: &mut V) -> PendingSelect
    where
        V: ChatView + ?Sized,
    {
        self.active = Some(id);
        view.set_active_item(Some(id));
        view.close_sidebar_if_narrow();
        PendingSelect { id }
    }

    /// Show the loaded conversation. A failure, or a response for a
    /// conversation that is no longer active, leaves the view as it was.
    pub fn finish_select<V>(
        &mut self,
        pending: PendingSelect,
        result: ApiResult<ConversationTranscript>,
        view: &mut V,
    ) -> bool
    where
        V: ChatView + ?Sized,
    {
        match result {
            Ok(_) if self.active != Some(pending.id) => {
                log::debug!("dropping transcript of conversation {}: no longer active", pending.id);
                false
            }
            Ok(transcript) => {
                view.set_title(&transcript.title);
                view.show_transcript(transcript.messages);
                true
            }
            Err(err) => {
                log::error!("Error loading conversation {}: {}", pending.id, err);
                false
            }
        }
    }

    pub async fn select<B, V>(&mut self, id: ConversationId, backend: &B, view: &mut V) -> bool
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        let pending = self.begin_select(id, view);
        let result = backend.conversation_messages(pending.id).await;
        self.finish_select(pending, result, view)
    }

    /// Start a new chat. Nothing is sent: the server creates the
    /// conversation on the first message.
    pub fn create<V>(&mut self, view: &mut V)
    where
        V: ChatView + ?Sized,
    {
        self.active = None;
        view.set_title(DEFAULT_TITLE);
        view.clear_and_show_welcome(Welcome::NewChat);
        view.set_active_item(None);
    }

    /// `proposed` is `None` when the user cancelled the prompt. Blank or
    /// unchanged titles need no request.
    pub fn begin_rename(&self, id: ConversationId, current_title: &str, proposed: Option<&str>) -> Option<PendingRename> {
        let title = proposed?.trim();
        if title.is_empty() || title == current_title {
            return None;
        }
        Some(PendingRename {
            id,
            title: title.to_string(),
        })
    }

    pub fn finish_rename<V>(&self, pending: PendingRename, result: ApiResult<String>, view: &mut V) -> bool
    where
        V: ChatView + ?Sized,
    {
        match result {
            Ok(title) => {
                view.rename_item(pending.id, &title);
                if self.active == Some(pending.id) {
                    view.set_title(&title);
                }
                true
            }
            Err(err) => {
                alert_failure(view, &err, RENAME_FAILED);
                false
            }
        }
    }

    pub async fn rename<B, V>(
        &self,
        id: ConversationId,
        current_title: &str,
        proposed: Option<&str>,
        backend: &B,
        view: &mut V,
    ) -> bool
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        let Some(pending) = self.begin_rename(id, current_title, proposed) else {
            return false;
        };
        let result = backend.rename_conversation(pending.id, &pending.title).await;
        self.finish_rename(pending, result, view)
    }

    pub fn begin_delete(&self, id: ConversationId, confirmed: bool) -> Option<PendingDelete> {
        confirmed.then_some(PendingDelete { id })
    }

    /// Drop the entry. When it was the active conversation the view falls
    /// back to the greeting and the first remaining entry, if any, is
    /// selected; the returned [`PendingSelect`] still has to be fetched.
    pub fn finish_delete<V>(&mut self, pending: PendingDelete, result: ApiResult<()>, view: &mut V) -> Option<PendingSelect>
    where
        V: ChatView + ?Sized,
    {
        if let Err(err) = result {
            alert_failure(view, &err, DELETE_FAILED);
            return None;
        }

        view.remove_item(pending.id);
        if self.active != Some(pending.id) {
            return None;
        }

        self.active = None;
        view.set_title(NO_SELECTION_TITLE);
        view.clear_and_show_welcome(Welcome::Greeting);

        view.first_item().map(|next| self.begin_select(next, view))
    }

    pub async fn delete<B, V>(&mut self, id: ConversationId, confirmed: bool, backend: &B, view: &mut V) -> bool
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        let Some(pending) = self.begin_delete(id, confirmed) else {
            return false;
        };
        let result = backend.delete_conversation(pending.id).await;
        let deleted = result.is_ok();

        if let Some(next) = self.finish_delete(pending, result, view) {
            let transcript = backend.conversation_messages(next.id).await;
            self.finish_select(next, transcript, view);
        }
        deleted
    }

    /// Startup: select the first listed conversation, if there is one.
    pub fn initial_select<V>(&mut self, view: &mut V) -> Option<PendingSelect>
    where
        V: ChatView + ?Sized,
    {
        view.first_item().map(|id| self.begin_select(id, view))
    }

    /// Install a reloaded list and reselect: the active conversation if it
    /// is listed, else the first entry.
    pub fn refresh<V>(&mut self, items: Vec<ConversationSummary>, view: &mut V) -> Option<PendingSelect>
    where
        V: ChatView + ?Sized,
    {
        let keep = self.active.filter(|id| items.iter().any(|c| c.id == *id));
        view.replace_items(items);
        match keep {
            Some(id) => Some(self.begin_select(id, view)),
            None => self.initial_select(view),
        }
    }
}

fn alert_failure<V>(view: &mut V, err: &ApiError, transport_message: &str)
where
    V: ChatView + ?Sized,
{
    match err {
        ApiError::Rejected(message) => view.alert(&format!("Error: {}", message)),
        other => {
            log::error!("{}: {}", transport_message, other);
            view.alert(transport_message);
        }
    }
}
