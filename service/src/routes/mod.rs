//! HTTP surface of the gateway.
//!
//! A fixed dispatch table: device traffic on `/vzw`-prefixed paths,
//! firmware delivery on `/firmware`-prefixed paths, a literal `Error 404`
//! text body for everything else. Handlers return [`GatewayError`] and the
//! status mapping happens here, before any response bytes go out.

pub mod firmware;
pub mod vzw;

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use thiserror::Error;

use crate::carrier::{CarrierError, ThingSpaceClient};
use crate::firmware::{ArtifactSource, FirmwareError};
use crate::middleware::cache::{CacheClient, CacheError};
use crate::middleware::credentials::CredentialError;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

pub(crate) const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub(crate) const JSON_UTF8: &str = "application/json; charset=utf-8";
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything a handler needs, shared across the worker pool.
///
/// All fields are immutable or internally synchronized. Per-request state,
/// meaning cache connections and outbound HTTP clients, is created inside
/// the handlers and dropped when they return.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub cache: CacheClient,
    pub carrier: Arc<ThingSpaceClient>,
    pub artifacts: Arc<dyn ArtifactSource>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler-level failure, mapped to a status before the response head is
/// committed.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Carrier(#[from] CarrierError),
    #[error(transparent)]
    Firmware(#[from] FirmwareError),
    #[error("invalid request body: {0}")]
    BadBody(String),
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Carrier(CarrierError::MessageTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(error = %self, status = %status, "request failed");
        (status, self.to_string()).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the gateway router.
///
/// `/vzw/nidd` and the listener path are fixed routes; the listener route's
/// method table yields a bare 405 for anything but GET, DELETE and POST.
/// Every other path goes through [`prefix_dispatch`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/vzw/nidd", any(vzw::send_nidd))
        .route(
            "/vzw/registered_callback_listeners",
            get(vzw::list_listeners)
                .delete(vzw::remove_listener)
                .post(vzw::register_listener),
        )
        .fallback(prefix_dispatch)
        .with_state(state)
}

/// Dispatch for everything off the fixed table, by raw path prefix rather
/// than by segment: any other `/vzw`-prefixed path (including `/vzw`
/// itself) is a carrier callback, any `/firmware`-prefixed path streams the
/// artifact.
async fn prefix_dispatch(State(state): State<AppState>, uri: Uri, body: Bytes) -> Response {
    let path = uri.path();
    if path.starts_with("/vzw") {
        vzw::receive_callback(uri, body).await.into_response()
    } else if path.starts_with("/firmware") {
        firmware::stream_artifact(State(state)).await.into_response()
    } else {
        not_found()
    }
}

/// Anything off the table gets a literal `Error 404` text body.
fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
        "Error 404",
    )
        .into_response()
}

/// 202 with the carrier's response body passed through untouched.
pub(crate) fn accepted_json(body: String) -> Response {
    (
        StatusCode::ACCEPTED,
        [(header::CONTENT_TYPE, JSON_UTF8)],
        body,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
