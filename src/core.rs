//! Shared constants and buffer types used by the codec, the catalog and the
//! cache. Everything here is sized for the largest known parameter so no
//! layer needs an allocator.

/// Largest payload any known parameter carries, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Fixed frame header: command, address (2 bytes LE), parameter, length.
pub const HEADER_LEN: usize = 5;

/// Trailing additive checksum.
pub const CHECKSUM_LEN: usize = 1;

/// Largest frame the bus can carry (header + payload + checksum).
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN + CHECKSUM_LEN;

/// Bus address of the battery management system.
pub const BMS_ADDRESS: u16 = 0x116;

/// Bus address of the electronic speed controller.
pub const ESC_ADDRESS: u16 = 0x183;

/// Owned parameter data as carried by a frame or stored in the cache.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;
