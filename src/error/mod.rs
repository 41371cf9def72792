// Error Taxonomy Module
// Client-side failures split into precondition, transport and server classes

use reqwest::StatusCode;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the storefront client
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Cart operation attempted without an authenticated session.
    /// Raised before any network call is issued.
    #[error("please log in first")]
    NotAuthenticated,

    /// Quantity below 1, rejected before any network call
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),

    /// Network failure or request timeout
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response carrying a server-supplied message
    #[error("{message}")]
    Server { status: u16, message: String },

    /// HTTP 401. The session has already been reset when this is returned.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Login rejected by the server
    #[error("login failed: {0}")]
    Auth(String),

    /// Response body did not match the expected shape
    #[error("decode: {0}")]
    Decode(String),

    /// Credential store could not be read or written
    #[error("credential store: {0}")]
    Credential(String),
}

impl StoreError {
    /// Build a server error from a status code and raw response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return StoreError::Unauthorized {
                message: extract_message(status, body),
            };
        }

        StoreError::Server {
            status: status.as_u16(),
            message: extract_message(status, body),
        }
    }

    /// Whether this failure happened before anything was sent
    pub fn is_precondition(&self) -> bool {
        matches!(self, StoreError::NotAuthenticated | StoreError::InvalidQuantity(_))
    }

    /// HTTP status attached to the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Server { status, .. } => Some(*status),
            StoreError::Unauthorized { .. } => Some(401),
            StoreError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Pull the human-readable message out of an error body.
/// The API answers with `{"error": ".."}` for cart/user failures and
/// `{"message": ".."}` for login failures; anything else is passed through.
fn extract_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for field in ["error", "message"] {
            if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
        if let Some(msg) = value.as_str() {
            return msg.to_string();
        }
    }

    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
