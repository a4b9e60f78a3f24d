//! Transport error taxonomy.
//!
//! Every failure that leaves the transport stack is one of five variants.
//! Callers match on the variant to decide what the user sees; the set is
//! closed so those matches can be exhaustive.

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the transport stack.
///
/// `message` is the text we chose to show. `server_message` is what the
/// backend said, when it said anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 401 or 403. The caller should re-authenticate.
    #[error("{message}")]
    Auth {
        status_code: u16,
        message: String,
        server_message: Option<String>,
    },

    /// 404. The resource should be treated as absent.
    #[error("{message}")]
    NotFound {
        resource: String,
        message: String,
        server_message: Option<String>,
    },

    /// Any other 4xx/5xx, or a success body that could not be decoded.
    #[error("{message}")]
    Api {
        status_code: u16,
        message: String,
        server_message: Option<String>,
        body: Option<String>,
    },

    /// The backend was never reached or never answered.
    #[error("{message}")]
    Network { message: String, is_timeout: bool },

    /// The caller cancelled the operation.
    #[error("Operation cancelled{}", reason_suffix(.reason))]
    Cancelled { reason: Option<String> },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Network failure that is not a timeout.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            is_timeout: false,
        }
    }

    /// Network failure caused by a timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            is_timeout: true,
        }
    }

    pub fn cancelled(reason: Option<String>) -> Self {
        Self::Cancelled { reason }
    }

    /// HTTP status attached to the error, if the backend answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth { status_code, .. } | Self::Api { status_code, .. } => Some(*status_code),
            Self::NotFound { .. } => Some(404),
            Self::Network { .. } | Self::Cancelled { .. } => None,
        }
    }

    /// Text supplied by the backend, kept apart from our own message.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Auth { server_message, .. }
            | Self::NotFound { server_message, .. }
            | Self::Api { server_message, .. } => server_message.as_deref(),
            Self::Network { .. } | Self::Cancelled { .. } => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { is_timeout: true, .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Map a non-2xx status and its body onto the taxonomy.
    ///
    /// `resource` names what was requested (the URI path) and only shows up
    /// on `NotFound`.
    pub fn from_status(status_code: u16, body: &str, resource: &str) -> Self {
        let server_message = extract_server_message(body);
        let message = server_message
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", status_code));

        match status_code {
            401 | 403 => Self::Auth {
                status_code,
                message,
                server_message,
            },
            404 => Self::NotFound {
                resource: resource.to_string(),
                message,
                server_message,
            },
            _ => Self::Api {
                status_code,
                message,
                server_message,
                body: Some(body.to_string()),
            },
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::NotFound { .. } => "not_found",
            Self::Api { .. } => "api",
            Self::Network { is_timeout: true, .. } => "timeout",
            Self::Network { .. } => "network",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// First non-empty string among `message`, `error`, `detail` in a JSON object body.
fn extract_server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    ["message", "error", "detail"].iter().find_map(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToString::to_string)
    })
}
