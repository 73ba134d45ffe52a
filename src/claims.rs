//! Claims assembly for session authorization tokens.
//!
//! Validates an untrusted join request and produces the normalized claims
//! set the video platform's join endpoint expects. The wire field names
//! (`iss`, `app_key`, `tpc`, `role_type`, ...) are part of the platform's
//! trust contract and must not change.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Credentials;

/// Maximum length of a session name accepted by the platform.
pub const MAX_SESSION_NAME_LEN: usize = 200;

/// A join request as received from the browser client. Untrusted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    /// Name of the session the caller wants to join.
    #[serde(default)]
    pub session_name: Option<String>,
    /// 1 = host, 0 = participant. Anything else is rejected.
    #[serde(default, deserialize_with = "lenient_int")]
    pub role: Option<i64>,
    /// Optional session password, forwarded into the token.
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_key: Option<String>,
    /// Optional display identity, forwarded into the token.
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_identity: Option<String>,
    /// Requested token validity in seconds. Ignored unless positive.
    #[serde(default, deserialize_with = "lenient_int")]
    pub expiration_seconds: Option<i64>,
}

/// Claims embedded in the tokens issued by Greenroom, which the video
/// platform's join endpoint verifies instead of prompting for a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer, always the application key.
    #[serde(rename = "iss")]
    pub issuer: String,
    /// The application key again; some consumers read this alias instead of `iss`.
    pub app_key: String,
    /// Session name, 1..=200 characters.
    #[serde(rename = "tpc")]
    pub topic: String,
    /// 1 = host, 0 = participant.
    pub role_type: i64,
    /// Session password, empty when the session has none.
    pub session_key: String,
    /// Display identity of the joining user, may be empty.
    pub user_identity: String,
    /// Issued at (UNIX timestamp).
    #[serde(rename = "iat")]
    pub issued_at: u64,
    /// Expiration time (UNIX timestamp).
    #[serde(rename = "exp")]
    pub expires_at: u64,
    /// Claims schema version expected by the platform.
    pub version: u32,
}

/// Why a join request was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field {0} exceeds the maximum length of {1} characters")]
    FieldTooLong(&'static str, usize),
    #[error("invalid value for field: {0}")]
    InvalidEnum(&'static str),
    #[error("signing credentials are not configured")]
    ConfigurationMissing,
}

/// Builds the claims set for a session join request.
///
/// Checks run in a fixed order and the first failure wins: session name
/// presence, session name length, role, then credentials. `session_key`,
/// `user_identity` and `expiration_seconds` are never rejected; anything
/// unusable falls back to its default, matching what the platform's own
/// sample backends do.
///
/// `now` is the current UNIX timestamp in seconds; the expiry is computed
/// relative to it, so `expires_at - issued_at` always equals the effective
/// validity duration.
pub fn build_session_claims(
    request: &JoinRequest,
    credentials: &Credentials,
    default_expires_in: u64,
    now: u64,
) -> Result<SessionClaims, ValidationError> {
    let session_name = request.session_name.as_deref().unwrap_or("");
    if session_name.trim().is_empty() {
        return Err(ValidationError::MissingField("sessionName"));
    }
    if session_name.chars().count() > MAX_SESSION_NAME_LEN {
        return Err(ValidationError::FieldTooLong(
            "sessionName",
            MAX_SESSION_NAME_LEN,
        ));
    }

    let role_type = match request.role {
        Some(role @ (0 | 1)) => role,
        _ => return Err(ValidationError::InvalidEnum("role")),
    };

    if !credentials.is_configured() {
        return Err(ValidationError::ConfigurationMissing);
    }

    let expires_in = match request.expiration_seconds {
        Some(seconds) if seconds > 0 => seconds as u64,
        _ => default_expires_in,
    };

    let claims = SessionClaims {
        issuer: credentials.app_key.clone(),
        app_key: credentials.app_key.clone(),
        topic: session_name.to_string(),
        role_type,
        session_key: request.session_key.clone().unwrap_or_default(),
        user_identity: request.user_identity.clone().unwrap_or_default(),
        issued_at: now,
        expires_at: now + expires_in,
        version: 1,
    };

    debug!("built claims for topic {}", claims.topic);
    Ok(claims)
}

/// Deserializes any JSON value, keeping only integers.
/// A float, string or null behaves exactly like an absent field.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_i64()))
}

/// Deserializes any JSON value, keeping only strings.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<Value>::deserialize(deserializer)?.and_then(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            app_key: "K".to_string(),
            app_secret: "S".to_string(),
        }
    }

    fn request(session_name: &str, role: i64) -> JoinRequest {
        JoinRequest {
            session_name: Some(session_name.to_string()),
            role: Some(role),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_minimal_request() {
        let claims = build_session_claims(&request("demo", 0), &credentials(), 7200, 1_700_000_000)
            .unwrap();

        assert_eq!(claims.issuer, "K");
        assert_eq!(claims.app_key, "K");
        assert_eq!(claims.topic, "demo");
        assert_eq!(claims.role_type, 0);
        assert_eq!(claims.session_key, "");
        assert_eq!(claims.user_identity, "");
        assert_eq!(claims.issued_at, 1_700_000_000);
        assert_eq!(claims.expires_at - claims.issued_at, 7200);
        assert_eq!(claims.version, 1);
    }

    #[test]
    fn test_requested_expiration_respected() {
        let req = JoinRequest {
            expiration_seconds: Some(600),
            ..request("demo", 1)
        };
        let claims = build_session_claims(&req, &credentials(), 7200, 1_700_000_000).unwrap();
        assert_eq!(claims.expires_at - claims.issued_at, 600);
    }

    #[test]
    fn test_non_positive_expiration_falls_back_to_default() {
        for seconds in [0, -60] {
            let req = JoinRequest {
                expiration_seconds: Some(seconds),
                ..request("demo", 1)
            };
            let claims = build_session_claims(&req, &credentials(), 3600, 1_700_000_000).unwrap();
            assert_eq!(claims.expires_at - claims.issued_at, 3600);
        }
    }

    #[test]
    fn test_optional_fields_forwarded() {
        let req = JoinRequest {
            session_key: Some("hunter2".to_string()),
            user_identity: Some("alice".to_string()),
            ..request("demo", 1)
        };
        let claims = build_session_claims(&req, &credentials(), 7200, 1_700_000_000).unwrap();
        assert_eq!(claims.session_key, "hunter2");
        assert_eq!(claims.user_identity, "alice");
    }

    #[test]
    fn test_session_name_length_boundary() {
        let at_limit = "x".repeat(MAX_SESSION_NAME_LEN);
        let claims =
            build_session_claims(&request(&at_limit, 0), &credentials(), 7200, 1_700_000_000)
                .unwrap();
        assert_eq!(claims.topic, at_limit);

        let over_limit = "x".repeat(MAX_SESSION_NAME_LEN + 1);
        let err = build_session_claims(&request(&over_limit, 0), &credentials(), 7200, 0)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::FieldTooLong("sessionName", MAX_SESSION_NAME_LEN)
        );
    }

    #[test]
    fn test_missing_session_name() {
        for name in ["", "   "] {
            let err = build_session_claims(&request(name, 0), &credentials(), 7200, 0)
                .unwrap_err();
            assert_eq!(err, ValidationError::MissingField("sessionName"));
        }

        let err = build_session_claims(&JoinRequest::default(), &credentials(), 7200, 0)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("sessionName"));
    }

    #[test]
    fn test_role_must_be_zero_or_one() {
        for role in [2, -1, 99] {
            let err = build_session_claims(&request("demo", role), &credentials(), 7200, 0)
                .unwrap_err();
            assert_eq!(err, ValidationError::InvalidEnum("role"));
        }

        let req = JoinRequest {
            session_name: Some("demo".to_string()),
            ..Default::default()
        };
        let err = build_session_claims(&req, &credentials(), 7200, 0).unwrap_err();
        assert_eq!(err, ValidationError::InvalidEnum("role"));
    }

    #[test]
    fn test_unconfigured_credentials_rejected() {
        let err = build_session_claims(&request("demo", 0), &Credentials::default(), 7200, 0)
            .unwrap_err();
        assert_eq!(err, ValidationError::ConfigurationMissing);
    }

    #[test]
    fn test_validation_order_input_errors_win() {
        // A bad session name is reported even when credentials are also missing.
        let err = build_session_claims(&request("", 0), &Credentials::default(), 7200, 0)
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("sessionName"));
    }

    #[test]
    fn test_lenient_request_deserialization() {
        // Wrong-typed optional fields behave like absent ones; only a role
        // that is an integer survives into the typed request.
        let req: JoinRequest = serde_json::from_value(json!({
            "sessionName": "demo",
            "role": "host",
            "sessionKey": 42,
            "userIdentity": ["alice"],
            "expirationSeconds": "soon",
        }))
        .unwrap();

        assert_eq!(req.session_name.as_deref(), Some("demo"));
        assert_eq!(req.role, None);
        assert_eq!(req.session_key, None);
        assert_eq!(req.user_identity, None);
        assert_eq!(req.expiration_seconds, None);

        let err = build_session_claims(&req, &credentials(), 7200, 0).unwrap_err();
        assert_eq!(err, ValidationError::InvalidEnum("role"));
    }

    #[test]
    fn test_claims_wire_names() {
        let claims = build_session_claims(&request("demo", 1), &credentials(), 7200, 1_700_000_000)
            .unwrap();
        let value = serde_json::to_value(&claims).unwrap();

        assert_eq!(value["iss"], json!("K"));
        assert_eq!(value["app_key"], json!("K"));
        assert_eq!(value["tpc"], json!("demo"));
        assert_eq!(value["role_type"], json!(1));
        assert_eq!(value["session_key"], json!(""));
        assert_eq!(value["user_identity"], json!(""));
        assert_eq!(value["iat"], json!(1_700_000_000u64));
        assert_eq!(value["exp"], json!(1_700_007_200u64));
        assert_eq!(value["version"], json!(1));
    }
}
