//! `surron-bridge` library: a `no_std` bridge between the BMS and ESC serial
//! buses of a Sur-Ron electric motorbike. The crate exposes the wire codec
//! (infra), the parameter catalog, the serial transport session, the shared
//! cache, and the two bridge roles (BMS poller, ESC responder).
#![no_std]
#[cfg(test)]
extern crate std;
//==================================================================================
/// Bus addresses, size limits and the fixed-capacity payload type.
pub mod core;
/// Tunables of the session, poller and responder.
pub mod config;
/// Frame, catalog, decode, cache and exchange errors.
pub mod error;
/// Byte-level wire codec: frames, checksum and field reader.
pub mod infra;
/// Bridge protocol: catalog, serial transport, shared cache and bridge roles.
pub mod protocol;
//==================================================================================
