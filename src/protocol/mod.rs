//! High-level components of the bridge: parameter catalog, serial transport,
//! shared cache, and the poller/responder pair.
pub mod bridge;
pub mod cache;
pub mod catalog;
pub mod transport;
