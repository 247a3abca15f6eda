//! Abstraction traits used by the transport layer (serial port and timer).
pub mod bridge_timer;
pub mod serial_port;
