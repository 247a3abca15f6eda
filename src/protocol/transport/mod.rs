//! Serial transport layer: the port and timer abstractions, and the
//! request/response session built on top of them.
//!
//! ## Timing Constants
//!
//! Both buses run at 9600 baud 8N1, roughly 960 bytes per second, and are
//! half-duplex: only one side may talk at a time.

pub mod session;
pub mod traits;

/// Deadline for each read of a response (header, then body) in ms.
///
/// # Timeout rationale
///
/// - 200 ms at ~960 bytes/s covers ~192 bytes, almost three maximal frames.
/// - The BMS sometimes needs more than 80 ms to answer while it refreshes its
///   display, so a tighter deadline drops valid answers.
pub const READ_TIMEOUT_MS: u32 = 200;

/// Send/receive attempts per register read before giving up.
pub const READ_TRIALS: u8 = 3;

/// Pause between two trials of the same read (ms).
///
/// The BMS falls back to standby after roughly three seconds without traffic,
/// so the pause must stay short; it still leaves a busy device time to recover.
pub const INTER_TRIAL_DELAY_MS: u32 = 100;
