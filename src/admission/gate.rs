//! Admission gate
//!
//! Decides whether an upgrade request on the realtime path may become a
//! connection. Checks run in order and stop at the first failure:
//!
//! 1. the request must ask for a WebSocket upgrade (else 400)
//! 2. if auth is required, a bearer token must be present (else 401)
//! 3. the token must validate (else 403)
//!
//! Nothing is mutated before the gate says yes.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::token::{TokenError, TokenValidator};

/// Why an upgrade request was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The request did not ask for a protocol upgrade
    #[error("not a websocket upgrade request")]
    NotUpgrade,

    /// Auth is required and no bearer token was sent
    #[error("missing bearer token")]
    MissingToken,

    /// A bearer token was sent but did not validate
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The gateway is shutting down
    #[error("gateway is shutting down")]
    ShuttingDown,
}

impl AdmissionError {
    /// HTTP status for this rejection
    pub fn status(&self) -> StatusCode {
        match self {
            AdmissionError::NotUpgrade => StatusCode::BAD_REQUEST,
            AdmissionError::MissingToken => StatusCode::UNAUTHORIZED,
            AdmissionError::InvalidToken(_) => StatusCode::FORBIDDEN,
            AdmissionError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<TokenError> for AdmissionError {
    fn from(e: TokenError) -> Self {
        AdmissionError::InvalidToken(e.to_string())
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Validates upgrade requests before they are admitted
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    validator: Option<TokenValidator>,
}

impl AdmissionGate {
    /// Gate that admits any upgrade request anonymously
    pub fn open() -> Self {
        Self { validator: None }
    }

    /// Gate that requires a valid bearer token
    pub fn with_auth(validator: TokenValidator) -> Self {
        Self {
            validator: Some(validator),
        }
    }

    /// Check if a bearer token is required
    pub fn requires_auth(&self) -> bool {
        self.validator.is_some()
    }

    /// Run the admission checks
    ///
    /// Returns the authenticated identity, or `None` when auth is disabled.
    pub fn admit(&self, headers: &HeaderMap) -> Result<Option<String>, AdmissionError> {
        if !is_upgrade_request(headers) {
            return Err(AdmissionError::NotUpgrade);
        }

        let Some(ref validator) = self.validator else {
            return Ok(None);
        };

        let token = bearer_token(headers)?;
        let claims = validator.validate(token)?;

        Ok(Some(claims.sub))
    }
}

/// Check for `Connection: upgrade` and `Upgrade: websocket`
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    let upgrade_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));

    connection_upgrade && upgrade_websocket
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Result<&str, AdmissionError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AdmissionError::MissingToken)?;

    let value = value
        .to_str()
        .map_err(|_| AdmissionError::InvalidToken("authorization header is not ASCII".into()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AdmissionError::InvalidToken(
            "expected a bearer authorization header".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;

    use super::*;

    const SECRET: &[u8] = b"gate-test-secret";

    fn upgrade_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers
    }

    fn with_auth(mut headers: HeaderMap, value: &str) -> HeaderMap {
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_plain_request_is_bad_request() {
        let gate = AdmissionGate::open();
        let err = gate.admit(&HeaderMap::new()).unwrap_err();

        assert_eq!(err, AdmissionError::NotUpgrade);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_protocol_check_runs_before_auth() {
        let gate = AdmissionGate::with_auth(TokenValidator::new(SECRET));
        let err = gate.admit(&HeaderMap::new()).unwrap_err();
        assert_eq!(err, AdmissionError::NotUpgrade);
    }

    #[test]
    fn test_open_gate_is_anonymous() {
        let gate = AdmissionGate::open();
        assert_eq!(gate.admit(&upgrade_headers()), Ok(None));
        assert!(!gate.requires_auth());
    }

    #[test]
    fn test_missing_token_is_unauthorized() {
        let gate = AdmissionGate::with_auth(TokenValidator::new(SECRET));
        let err = gate.admit(&upgrade_headers()).unwrap_err();

        assert_eq!(err, AdmissionError::MissingToken);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_token_is_forbidden() {
        let gate = AdmissionGate::with_auth(TokenValidator::new(SECRET));

        for value in ["Bearer garbage", "Basic dXNlcjpwYXNz", "Bearer "] {
            let err = gate.admit(&with_auth(upgrade_headers(), value)).unwrap_err();
            assert_eq!(err.status(), StatusCode::FORBIDDEN, "header {:?}", value);
        }
    }

    #[test]
    fn test_expired_token_is_forbidden() {
        let validator = TokenValidator::new(SECRET);
        let claims = crate::admission::Claims {
            sub: "alice".into(),
            exp: chrono::Utc::now().timestamp() - 60,
            iat: 0,
        };
        let token = validator.issue_claims(&claims).unwrap();
        let gate = AdmissionGate::with_auth(validator);

        let err = gate
            .admit(&with_auth(upgrade_headers(), &format!("Bearer {}", token)))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_valid_token_sets_identity() {
        let validator = TokenValidator::new(SECRET);
        let token = validator.issue("alice", Duration::from_secs(60)).unwrap();
        let gate = AdmissionGate::with_auth(validator);

        let identity = gate
            .admit(&with_auth(upgrade_headers(), &format!("bearer {}", token)))
            .unwrap();
        assert_eq!(identity.as_deref(), Some("alice"));
    }

    #[test]
    fn test_upgrade_header_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(!is_upgrade_request(&headers));

        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
        assert!(is_upgrade_request(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_upgrade_request(&headers));
    }
}
