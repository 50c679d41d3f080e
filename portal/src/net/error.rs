//! Error type shared by the REST client and its callers.

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    /// The backend answered 2xx but reported failure in its envelope.
    #[error("{0}")]
    Rejected(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("multipart body failed: {0}")]
    Multipart(String),
}

impl ApiError {
    /// HTTP status for [`ApiError::Status`], if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for a toast: the backend's own message when it sent one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::Status { body, .. } => serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(serde_json::Value::as_str).map(ToOwned::to_owned))
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        }
    }
}
