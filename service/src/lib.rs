//! NIDD carrier gateway.
//!
//! Bridges an IoT device fleet to the Verizon ThingSpace APIs:
//! - **routes**: fixed HTTP dispatch table (device traffic, firmware, 404)
//! - **middleware**: credential cache client and read-through token broker
//! - **carrier**: outbound ThingSpace operations
//! - **firmware**: artifact acquisition and block-sized streaming
//!
//! Carrier credentials are cached in redis with carrier-matched lifetimes
//! and re-minted lazily; handlers never talk to the carrier without going
//! through the broker first.

pub mod carrier;
pub mod firmware;
pub mod middleware;
pub mod routes;
pub mod settings;
