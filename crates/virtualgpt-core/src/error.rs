use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend call.
///
/// `Transport`, `Status` and `Decode` are network-level failures; the send
/// path replaces them with a fallback reply. `Rejected` carries the error
/// string of a `{"success": false, "error": ...}` response and is shown to
/// the user verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("{0}")]
    Rejected(String),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl ApiError {
    /// True for failures the backend reported itself, as opposed to ones
    /// where no usable answer arrived.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
