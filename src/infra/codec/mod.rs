//! Wire frame encoding/decoding and raw field access.
pub mod bytes;
pub mod frame;
