use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for every gateway call.
///
/// `AuthExpired` is handled centrally by the session hook and is never meant
/// to reach a per-view error banner; everything else is recovered locally by
/// the owning controller.
#[derive(Debug, Clone, Error)]
pub enum ConsoleError {
    #[error("session expired")]
    AuthExpired,
    #[error("request failed: {message}")]
    RequestFailed { message: String },
    #[error("server returned {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("rejected by server: {message}")]
    ValidationRejected { message: String },
    #[error("no such record")]
    NotFound,
    #[error("response decode failed: {message}")]
    Decode { message: String },
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

impl ConsoleError {
    /// Short message suitable for a view-level error banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthExpired => "session expired".to_string(),
            Self::RequestFailed { .. } | Self::Decode { .. } | Self::InvalidBaseUrl => {
                "request failed, please try again".to_string()
            }
            Self::Http { status, .. } => format!("request failed ({status})"),
            Self::ValidationRejected { message } => message.clone(),
            Self::NotFound => "no such record".to_string(),
        }
    }
}
