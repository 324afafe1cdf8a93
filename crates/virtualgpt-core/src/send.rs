use crate::api::{ChatBackend, ChatReply, OutgoingMessage};
use crate::error::ApiResult;
use crate::state::{ClientVariant, ConversationId, Message};
use crate::view::ChatView;

/// Rendered in place of a reply when the request fails for any reason.
pub const FALLBACK_REPLY: &str =
    "Lo siento, ocurrió un error al procesar tu mensaje. Por favor, inténtalo de nuevo.";

/// Proof that a send was started. Hand it back to
/// [`SendCoordinator::finish`] to settle the send.
#[derive(Debug)]
#[must_use = "a started send must be finished to release the send control"]
pub struct PendingSend {
    outgoing: OutgoingMessage,
}

impl PendingSend {
    pub fn message(&self) -> &OutgoingMessage {
        &self.outgoing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Replied,
    /// The reply opened a new conversation, which is now active.
    Adopted(ConversationId),
    Failed,
}

/// Serialises outgoing messages: at most one is in flight per coordinator.
#[derive(Debug)]
pub struct SendCoordinator {
    variant: ClientVariant,
    in_flight: bool,
}

impl SendCoordinator {
    pub fn new(variant: ClientVariant) -> Self {
        Self {
            variant,
            in_flight: false,
        }
    }

    pub fn variant(&self) -> ClientVariant {
        self.variant
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Echo the message locally, clear the input and lock the send control.
    ///
    /// Returns `None`, touching nothing, when a send is already in flight or
    /// the trimmed text is empty.
    pub fn begin<V>(&mut self, raw: &str, active: Option<ConversationId>, view: &mut V) -> Option<PendingSend>
    where
        V: ChatView + ?Sized,
    {
        if self.in_flight {
            log::debug!("send ignored: another message is in flight");
            return None;
        }

        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        view.render_message(Message::user(text), true);
        view.clear_input();

        self.in_flight = true;
        view.set_send_busy(true);

        let conversation_id = match self.variant {
            ClientVariant::Authenticated => active,
            ClientVariant::Guest => None,
        };

        Some(PendingSend {
            outgoing: OutgoingMessage {
                variant: self.variant,
                text: text.to_string(),
                conversation_id,
            },
        })
    }

    /// Render the reply (or the fallback), adopt a newly created
    /// conversation, then release the send control whatever happened.
    pub fn finish<V>(
        &mut self,
        pending: PendingSend,
        result: ApiResult<ChatReply>,
        active: &mut Option<ConversationId>,
        view: &mut V,
    ) -> SendOutcome
    where
        V: ChatView + ?Sized,
    {
        let outcome = match result {
            Ok(reply) => {
                view.render_message(Message::assistant(reply.reply), true);

                match (self.variant, *active, reply.conversation_id) {
                    (ClientVariant::Authenticated, None, Some(id)) => {
                        log::info!("conversation {} created by first message", id);
                        *active = Some(id);
                        view.request_refresh();
                        SendOutcome::Adopted(id)
                    }
                    _ => SendOutcome::Replied,
                }
            }
            Err(err) => {
                log::error!(
                    "sending message ({} chars) failed: {}",
                    pending.outgoing.text.chars().count(),
                    err
                );
                view.render_message(Message::assistant(FALLBACK_REPLY), true);
                SendOutcome::Failed
            }
        };

        self.in_flight = false;
        view.set_send_busy(false);
        outcome
    }

    /// `begin`, one backend call, `finish`.
    pub async fn submit<B, V>(
        &mut self,
        raw: &str,
        active: &mut Option<ConversationId>,
        backend: &B,
        view: &mut V,
    ) -> Option<SendOutcome>
    where
        B: ChatBackend + ?Sized,
        V: ChatView + ?Sized,
    {
        let pending = self.begin(raw, *active, view)?;
        let result = backend.send_message(pending.message()).await;
        Some(self.finish(pending, result, active, view))
    }
}
