//! Session and authentication shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated session, as returned by login and registration.
///
/// All four fields are required; a session with any of them missing does
/// not exist.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub email: String,
    pub tenant_id: String,
    pub role: String,
}

impl Session {
    /// Tenant-scoped event topic, `orders/{tenantId}`.
    pub fn topic(&self) -> String {
        format!("orders/{}", self.tenant_id)
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::of(&self.token)
    }
}

/// Names the session a store write was issued under.
///
/// Two keys are equal only when they come from the same token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn of(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

// Keeps bearer tokens out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .field("tenant_id", &self.tenant_id)
            .field("role", &self.role)
            .finish()
    }
}

/// Authentication state observed by the rest of the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }
}

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub tenant_slug: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest").field("email", &self.email).finish_non_exhaustive()
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("tenant_slug", &self.tenant_slug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let session = Session {
            token: "secret-jwt".into(),
            email: "ops@acme.test".into(),
            tenant_id: "t-9".into(),
            role: "ROLE_USER".into(),
        };
        assert!(!format!("{:?}", session).contains("secret-jwt"));
        assert!(!format!("{:?}", session.key()).contains("secret-jwt"));
        assert_eq!(session.key(), SessionKey::of("secret-jwt"));
        assert_eq!(session.topic(), "orders/t-9");

        let login = LoginRequest { email: "ops@acme.test".into(), password: "hunter22".into() };
        assert!(!format!("{:?}", login).contains("hunter22"));
    }

    #[test]
    fn test_register_body_is_camel_case() {
        let body = RegisterRequest {
            email: "a@b.test".into(),
            password: "longenough".into(),
            tenant_slug: "acme".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tenantSlug"], "acme");
    }
}
