use crate::modules::store::StoreError;
use crate::modules::transport::TransportError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request failed: status={status} body={body}")]
    BadStatus { status: StatusCode, body: String },
    /// The token refresh failed; stored credentials are gone and the user must log in again.
    #[error("session expired: {0}")]
    SessionExpired(String),
    #[error("response parse failed: {0}")]
    Parse(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("history item has no identifier")]
    MissingIdentifier,
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::Endpoint(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(TransportError::Http(e))
    }
}
