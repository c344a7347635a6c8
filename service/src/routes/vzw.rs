//! Handlers for the `/vzw` device-traffic routes.
//!
//! The credentialed handlers all follow the same shape: open one cache
//! connection, run the broker, make the carrier call, pass the carrier's
//! body through with a 202. The callback sink is the exception; it needs no
//! credentials and acknowledges unconditionally.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use serde::Deserialize;

use crate::middleware::credentials::ensure_credentials;
use crate::routes::{AppState, GatewayError, accepted_json};

/// Message sent when a request does not carry one.
pub(crate) const DEFAULT_NIDD_MESSAGE: &str = "Hello world!\n";

/// Optional knobs accepted in the NIDD send body.
#[derive(Debug, Default, Deserialize)]
struct NiddSendBody {
    /// Payload to deliver; the gateway base64-encodes it on the wire.
    message: Option<String>,
    /// Delivery deadline override in seconds.
    max_delivery_secs: Option<u32>,
}

/// Deliver a NIDD message to the configured device.
pub async fn send_nidd(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let options: NiddSendBody = if body.is_empty() {
        NiddSendBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| GatewayError::BadBody(e.to_string()))?
    };

    let message = options.message.as_deref().unwrap_or(DEFAULT_NIDD_MESSAGE);
    let max_delivery_secs = options
        .max_delivery_secs
        .unwrap_or(state.settings.max_delivery_secs);

    let mut conn = state.cache.connect().await?;
    let credentials = ensure_credentials(conn.as_mut(), state.carrier.as_ref()).await?;

    let reply = state
        .carrier
        .send_nidd_data(
            &credentials.auth_token,
            &credentials.session_token,
            &state.settings.device_mdn,
            max_delivery_secs,
            message.as_bytes(),
        )
        .await?;

    tracing::info!(device = %state.settings.device_mdn, "nidd message accepted by carrier");
    Ok(accepted_json(reply))
}

/// List the listeners registered for the account.
pub async fn list_listeners(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let mut conn = state.cache.connect().await?;
    let credentials = ensure_credentials(conn.as_mut(), state.carrier.as_ref()).await?;

    let reply = state
        .carrier
        .list_callback_listeners(&credentials.auth_token, &credentials.session_token)
        .await?;

    Ok(accepted_json(reply))
}

/// Register this gateway as the account's callback listener.
pub async fn register_listener(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let mut conn = state.cache.connect().await?;
    let credentials = ensure_credentials(conn.as_mut(), state.carrier.as_ref()).await?;

    let reply = state
        .carrier
        .register_callback_listener(
            &credentials.auth_token,
            &credentials.session_token,
            &state.settings.listener_name,
            &state.settings.callback_url,
        )
        .await?;

    tracing::info!(listener = %state.settings.listener_name, "callback listener registered");
    Ok(accepted_json(reply))
}

/// Remove the account's callback listener.
pub async fn remove_listener(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let mut conn = state.cache.connect().await?;
    let credentials = ensure_credentials(conn.as_mut(), state.carrier.as_ref()).await?;

    let reply = state
        .carrier
        .remove_callback_listener(
            &credentials.auth_token,
            &credentials.session_token,
            &state.settings.listener_name,
        )
        .await?;

    tracing::info!(listener = %state.settings.listener_name, "callback listener removed");
    Ok(accepted_json(reply))
}

/// Sink for carrier callbacks: acknowledge, log the payload, drop it.
pub async fn receive_callback(uri: Uri, body: Bytes) -> StatusCode {
    tracing::debug!(
        path = %uri.path(),
        bytes = body.len(),
        payload = %String::from_utf8_lossy(&body),
        "carrier callback received"
    );
    StatusCode::NO_CONTENT
}
