//! Byte-level infrastructure: the wire frame codec and the little-endian
//! reader used by the parameter decoders.
pub mod codec;
