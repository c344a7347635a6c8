//! Read-through credential broker.
//!
//! The carrier wants two tokens on every authenticated call: a long-lived
//! OAuth access token and a shorter-lived M2M session token. Both live in
//! the cache store under fixed keys and refresh lazily: a handler asks the
//! broker, the broker reads the cache, mints whatever is missing and writes
//! it back with the matching TTL. Tokens are never revalidated up front; a
//! stale-but-unexpired token surfaces as a carrier error on use.

use std::future::Future;

use thiserror::Error;

use crate::carrier::CarrierError;
use crate::middleware::cache::{CacheConn, CacheError};

// ---------------------------------------------------------------------------
// Keys and lifetimes
// ---------------------------------------------------------------------------

/// Cache key of the carrier OAuth access token.
pub const AUTH_TOKEN_KEY: &str = "VZW_AUTH_TOKEN";

/// Cache key of the carrier M2M session token.
pub const SESSION_TOKEN_KEY: &str = "VZW_SESSION_TOKEN";

/// Access tokens live for an hour on the carrier side.
pub const AUTH_TOKEN_TTL_SECS: u64 = 3_600;

/// Session tokens idle out after twenty minutes on the carrier side.
pub const SESSION_TOKEN_TTL_SECS: u64 = 1_200;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The token pair every authenticated carrier call needs.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub auth_token: String,
    pub session_token: String,
}

/// Failures while resolving credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Mint(#[from] CarrierError),
}

/// Mints fresh tokens from the carrier.
///
/// Implemented by the carrier client; tests substitute recorders.
pub trait TokenMinter: Send + Sync {
    /// Obtain a fresh OAuth access token.
    fn mint_auth_token(&self) -> impl Future<Output = Result<String, CarrierError>> + Send;

    /// Obtain a fresh session token, authenticating with `auth_token`.
    fn mint_session_token(
        &self,
        auth_token: &str,
    ) -> impl Future<Output = Result<String, CarrierError>> + Send;
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

/// Resolve both tokens, minting and writing back whatever the cache lacks.
///
/// The auth token is always resolved first; the session mint authenticates
/// with whichever auth token this call just resolved. A cache read failure
/// aborts immediately, before any carrier traffic.
pub async fn ensure_credentials<M: TokenMinter>(
    conn: &mut dyn CacheConn,
    minter: &M,
) -> Result<Credentials, CredentialError> {
    let auth_token = match conn.get(AUTH_TOKEN_KEY).await? {
        Some(token) => token,
        None => {
            tracing::debug!("auth token missing or expired, minting a fresh one");
            let token = minter.mint_auth_token().await?;
            conn.set_ex(AUTH_TOKEN_KEY, &token, AUTH_TOKEN_TTL_SECS)
                .await?;
            token
        }
    };

    let session_token = match conn.get(SESSION_TOKEN_KEY).await? {
        Some(token) => token,
        None => {
            tracing::debug!("session token missing or expired, logging in again");
            let token = minter.mint_session_token(&auth_token).await?;
            conn.set_ex(SESSION_TOKEN_KEY, &token, SESSION_TOKEN_TTL_SECS)
                .await?;
            token
        }
    };

    Ok(Credentials {
        auth_token,
        session_token,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
