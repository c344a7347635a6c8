//! Credential cache client.
//!
//! A thin key-value facade over redis. Values are opaque strings, keys carry
//! a store-level `key:` prefix, and expiry is delegated entirely to the
//! store: the gateway writes entries with a TTL and otherwise only checks
//! presence. One connection is opened per gateway request and dropped when
//! the handler returns; nothing is pooled across requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Cache-store failures. `Connect` covers everything up to an established
/// connection, `Command` everything after.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connect failed: {0}")]
    Connect(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

// ---------------------------------------------------------------------------
// Backend traits
// ---------------------------------------------------------------------------

/// A boxed, pinned, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One live connection to the cache store.
///
/// A missing key reads as `None`. Implementations must also normalize an
/// empty stored value to `None`, so an expired entry and a never-written one
/// are indistinguishable to callers.
pub trait CacheConn: Send {
    fn get<'a>(&'a mut self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>>;

    fn set<'a>(&'a mut self, key: &'a str, value: &'a str)
    -> BoxFuture<'a, Result<(), CacheError>>;

    fn set_ex<'a>(
        &'a mut self,
        key: &'a str,
        value: &'a str,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}

/// Hands out fresh connections.
pub trait CacheBackend: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn CacheConn>, CacheError>>;
}

// ---------------------------------------------------------------------------
// Client facade
// ---------------------------------------------------------------------------

/// Cheaply cloneable handle to the configured cache backend.
#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn CacheBackend>,
}

impl CacheClient {
    /// Client backed by the redis instance at `url`.
    ///
    /// The URL is validated here; no connection is attempted until
    /// [`CacheClient::connect`].
    pub fn redis(url: &str) -> Result<Self, CacheError> {
        let backend = RedisBackend::open(url)?;
        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// Client over an arbitrary backend. Tests use this to substitute
    /// in-memory stores.
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Open a fresh connection for one request.
    pub async fn connect(&self) -> Result<Box<dyn CacheConn>, CacheError> {
        self.backend.connect().await
    }
}

// ---------------------------------------------------------------------------
// Redis backend
// ---------------------------------------------------------------------------

/// Prefix applied to every key at the store level.
const KEY_PREFIX: &str = "key:";

fn prefixed(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

/// Empty strings in the store count as absent entries.
fn normalize(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    fn open(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

impl CacheBackend for RedisBackend {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn CacheConn>, CacheError>> {
        Box::pin(async move {
            let conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| CacheError::Connect(e.to_string()))?;
            Ok(Box::new(RedisConn { conn }) as Box<dyn CacheConn>)
        })
    }
}

struct RedisConn {
    conn: redis::aio::MultiplexedConnection,
}

impl CacheConn for RedisConn {
    fn get<'a>(&'a mut self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CacheError>> {
        Box::pin(async move {
            let value: Option<String> = redis::cmd("GET")
                .arg(prefixed(key))
                .query_async(&mut self.conn)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            Ok(normalize(value))
        })
    }

    fn set<'a>(
        &'a mut self,
        key: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let _: () = redis::cmd("SET")
                .arg(prefixed(key))
                .arg(value)
                .query_async(&mut self.conn)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            Ok(())
        })
    }

    fn set_ex<'a>(
        &'a mut self,
        key: &'a str,
        value: &'a str,
        ttl_secs: u64,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            let _: () = redis::cmd("SET")
                .arg(prefixed(key))
                .arg(value)
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut self.conn)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
