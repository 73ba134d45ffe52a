//! Logic for the `/token` endpoint.
//!
//! Validates the join request, assembles the claims set and returns the
//! signed credential. The caller passes the credential to the video
//! platform's join call unchanged.

use crate::claims::{self, JoinRequest, ValidationError};
use crate::signer::{self, Header};
use crate::{AppState, audit};
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Successful token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// The compact signed credential.
    pub token: String,
}

/// Error body returned for rejected requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler for the `POST /token` endpoint.
///
/// Validation failures are the caller's to fix and come back as 400 with a
/// descriptive message. Missing signing credentials are an operator
/// problem: the caller sees a generic 500 while the detail is logged here.
#[tracing::instrument(skip(state, request))]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    let claims = claims::build_session_claims(
        &request,
        &state.settings.credentials,
        state.settings.token_expires_in,
        unix_now(),
    )
    .map_err(|err| match err {
        ValidationError::ConfigurationMissing => {
            tracing::error!("refusing to issue token: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "token service is not configured".to_string(),
                }),
            )
        }
        _ => {
            audit!("rejected join request: {}", err);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
        }
    })?;

    let token = signer::sign(
        &Header::default(),
        &claims,
        &state.settings.credentials.app_secret,
    );

    audit!(
        "issued session token for topic: {}, role_type: {}",
        claims.topic,
        claims.role_type
    );
    Ok(Json(TokenResponse { token }))
}

/// Current UNIX timestamp in whole seconds.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
