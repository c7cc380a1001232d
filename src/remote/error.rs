//! Error taxonomy for calls to the remote order and auth services.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    /// HTTP 401 or 403. Ends the session.
    #[error("Authentication rejected (HTTP {status})")]
    Unauthorized { status: u16 },

    /// Any other non-success response, e.g. an illegal transition.
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Response decode error: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl RemoteError {
    /// Classifies a non-success response.
    ///
    /// The server's `{"status", "message", "timestamp"}` body supplies the
    /// message when present.
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 401 || status == 403 {
            return RemoteError::Unauthorized { status };
        }
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                let body = body.trim();
                if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.to_string()
                }
            });
        RemoteError::Rejected { status, message }
    }

    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, RemoteError::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RemoteError::from_status(401, "").is_auth_rejection());
        assert!(RemoteError::from_status(403, "{}").is_auth_rejection());

        let body = r#"{"status":400,"message":"Invalid status transition from SHIPPED to CANCELLED","timestamp":"2024-03-01T10:00:00Z"}"#;
        assert_eq!(
            RemoteError::from_status(400, body),
            RemoteError::Rejected {
                status: 400,
                message: "Invalid status transition from SHIPPED to CANCELLED".into()
            }
        );
        assert_eq!(
            RemoteError::from_status(502, "  "),
            RemoteError::Rejected { status: 502, message: "HTTP 502".into() }
        );
    }
}
