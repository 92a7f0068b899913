use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use shared::protocol::{Interaction, InteractionKind, InteractionResponse};
use thiserror::Error;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{debug, warn};

use crate::app_state::AppState;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
enum SignatureError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("signature is not valid hex")]
    Encoding,
    #[error("signature does not match")]
    Mismatch,
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/interactions", post(interactions))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parses the hex encoded application public key.
pub(crate) fn parse_public_key(raw: &str) -> anyhow::Result<VerifyingKey> {
    let bytes = hex::decode(raw.trim()).context("public key is not valid hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes).context("public key is not a valid ed25519 key")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn interactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(error) = verify_signature(&state.verifying_key, &headers, &body) {
        warn!(%error, "rejected interaction request");
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(error) => {
            warn!(%error, "malformed interaction payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if interaction.kind == InteractionKind::Ping {
        return Json(InteractionResponse::pong()).into_response();
    }

    debug!(interaction = %interaction.id, kind = %interaction.kind, "interaction received");
    let dispatcher = Arc::clone(&state.dispatcher);
    tokio::spawn(async move {
        // Failures are logged and reported to the user by the dispatcher itself.
        let _ = dispatcher.dispatch(&interaction).await;
    });
    StatusCode::ACCEPTED.into_response()
}

fn verify_signature(
    key: &VerifyingKey,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), SignatureError> {
    let signature = header(headers, SIGNATURE_HEADER)?;
    let timestamp = header(headers, TIMESTAMP_HEADER)?;
    let signature = hex::decode(signature).map_err(|_| SignatureError::Encoding)?;
    let signature = Signature::from_slice(&signature).map_err(|_| SignatureError::Encoding)?;

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    key.verify(&message, &signature)
        .map_err(|_| SignatureError::Mismatch)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

#[cfg(test)]
#[path = "tests/interactions_tests.rs"]
mod tests;
