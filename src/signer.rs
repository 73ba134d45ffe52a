//! Compact token signing.
//!
//! Produces the three-segment `header.payload.signature` credential the
//! video platform verifies. Built directly from JSON + base64url +
//! HMAC-SHA256: this process is the sole minter of these tokens and never
//! verifies them itself, so a full JWT library would only add unused trust
//! machinery. HMAC-SHA256 is the only algorithm the platform accepts.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::claims::SessionClaims;

type HmacSha256 = Hmac<Sha256>;

/// Token header. One constant shape for every token we issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Signing algorithm, always "HS256".
    pub alg: String,
    /// Token type, always "JWT".
    pub typ: String,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Signs a claims set into the compact credential string.
///
/// Serialization of the header and claims cannot fail for these types, and
/// HMAC-SHA256 accepts keys of any length, so signing itself is infallible;
/// an empty secret is excluded by request validation before this point.
pub fn sign(header: &Header, claims: &SessionClaims, secret: &str) -> String {
    let encoded_header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap());
    let encoded_claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());

    let signing_input = format!("{encoded_header}.{encoded_claims}");
    let encoded_signature =
        URL_SAFE_NO_PAD.encode(signature(signing_input.as_bytes(), secret.as_bytes()));

    format!("{signing_input}.{encoded_signature}")
}

/// Computes the raw HMAC-SHA256 signature over arbitrary signing input.
pub fn signature(signing_input: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(signing_input);
    mac.finalize().into_bytes().to_vec()
}
