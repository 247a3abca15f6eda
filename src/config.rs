//! Tunables of the bridge components.
//!
//! Every struct defaults to the timing the real buses were calibrated with,
//! see the constants in [`crate::protocol::transport`] and
//! [`crate::protocol::bridge`]. Firmware only overrides what differs.
use crate::core::{BMS_ADDRESS, ESC_ADDRESS};
use crate::protocol::bridge::{
    ATTEMPTS_PER_PARAMETER, ESC_RECEIVE_TIMEOUT_MS, FAST_CYCLE_PERIOD_MS, SLOW_CYCLE_DIVIDER,
    STALENESS_THRESHOLD_MS,
};
use crate::protocol::transport::{INTER_TRIAL_DELAY_MS, READ_TIMEOUT_MS, READ_TRIALS};

/// Request/response exchange settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig {
    /// Deadline for each of the header and body reads.
    pub read_timeout_ms: u32,
    /// Send/receive attempts per register read.
    pub trials: u8,
    /// Pause between two trials.
    pub inter_trial_delay_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: READ_TIMEOUT_MS,
            trials: READ_TRIALS,
            inter_trial_delay_ms: INTER_TRIAL_DELAY_MS,
        }
    }
}

/// BMS polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollerConfig {
    /// Target duration of one cycle.
    pub cycle_period_ms: u32,
    /// Slow parameters are polled every `slow_divider` cycles.
    pub slow_divider: u32,
    /// Register reads per parameter before it is skipped for the cycle.
    pub attempts_per_parameter: u8,
    /// Address the poller queries.
    pub bms_address: u16,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: FAST_CYCLE_PERIOD_MS,
            slow_divider: SLOW_CYCLE_DIVIDER,
            attempts_per_parameter: ATTEMPTS_PER_PARAMETER,
            bms_address: BMS_ADDRESS,
        }
    }
}

/// How the responder judges whether a cached value is too old to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StalenessPolicy {
    /// Age of the requested entry itself.
    #[default]
    PerEntry,
    /// Age of the most recent write to any entry.
    SharedLastUpdate,
}

/// ESC-side answering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResponderConfig {
    /// Idle receive deadline; the loop simply re-arms when it expires.
    pub receive_timeout_ms: u32,
    /// Oldest value still served to the ESC.
    pub staleness_threshold_ms: u64,
    pub staleness: StalenessPolicy,
    /// Read requests to this address are answered from the cache.
    pub bms_address: u16,
    /// Status frames from this address feed the ESC status table.
    pub esc_address: u16,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: ESC_RECEIVE_TIMEOUT_MS,
            staleness_threshold_ms: STALENESS_THRESHOLD_MS,
            staleness: StalenessPolicy::default(),
            bms_address: BMS_ADDRESS,
            esc_address: ESC_ADDRESS,
        }
    }
}

/// Whole-bridge settings, one field per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    pub bms_session: SessionConfig,
    pub esc_session: SessionConfig,
    pub poller: PollerConfig,
    pub responder: ResponderConfig,
}
