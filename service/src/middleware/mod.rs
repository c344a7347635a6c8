//! Middleware layer for the gateway service.
//!
//! This layer sits between the HTTP handlers and the carrier client,
//! handling:
//! - **cache**: key-value credential cache client over redis
//! - **credentials**: read-through token broker with carrier-matched TTLs

pub mod cache;
pub mod credentials;

// Re-export commonly used types
pub use cache::{CacheClient, CacheError};
pub use credentials::{Credentials, ensure_credentials};
