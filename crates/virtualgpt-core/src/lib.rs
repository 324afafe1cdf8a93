pub mod api;
pub mod config;
pub mod conversations;
pub mod error;
pub mod http;
pub mod input;
pub mod send;
pub mod session;
pub mod sidebar;
pub mod state;
pub mod transcript;
pub mod view;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use api::{ChatBackend, ChatReply, ConversationTranscript, OutgoingMessage};
pub use config::Config;
pub use conversations::{ConversationList, ConversationManager, PendingDelete, PendingRename, PendingSelect};
pub use error::{ApiError, ApiResult};
pub use http::HttpBackend;
pub use input::{InputBox, InputKey};
pub use send::{PendingSend, SendCoordinator, SendOutcome, FALLBACK_REPLY};
pub use session::ChatSession;
pub use sidebar::Sidebar;
pub use state::{ClientVariant, ConversationId, ConversationSummary, Message, Sender};
pub use transcript::{Phase, Transcript, Welcome};
pub use view::{ChatView, ViewState};
