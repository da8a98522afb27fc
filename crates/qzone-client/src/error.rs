use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {url} was rejected as unauthorized")]
    Unauthorized { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid API base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ApiError {
    /// Short message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http(e) if e.is_timeout() => "The server took too long to respond.".to_string(),
            ApiError::Http(_) => "Could not reach the server. Check your connection.".to_string(),
            ApiError::Unauthorized { .. } => "Please sign in again.".to_string(),
            ApiError::Deserialize { .. } | ApiError::UnexpectedStatus { .. } => {
                "The server sent an unexpected response.".to_string()
            }
            ApiError::InvalidBaseUrl { .. } => "The app is misconfigured.".to_string(),
        }
    }
}
