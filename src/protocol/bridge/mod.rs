//! The two long-running bridge roles and their shared driver.
//!
//! * [`poller::BmsPoller`] refreshes the [`ParameterCache`] from the BMS bus.
//! * [`responder::EscResponder`] answers the ESC bus from that cache.
//!
//! They own separate sessions (separate physical buses) and only meet in the
//! cache. [`run_bridge`] drives both on one executor task; firmware may as well
//! spawn `poller.run()` and `responder.run()` as two tasks.
//!
//! [`ParameterCache`]: crate::protocol::cache::ParameterCache
use embassy_sync::blocking_mutex::raw::RawMutex;
use futures_util::future::join;

use crate::protocol::catalog::BmsParameter;
use crate::protocol::transport::traits::{bridge_timer::BridgeTimer, serial_port::SerialPort};

pub mod poller;
pub mod responder;

use poller::BmsPoller;
use responder::EscResponder;

/// Target duration of one poll cycle (ms).
pub const FAST_CYCLE_PERIOD_MS: u32 = 1000;

/// The slow list is polled on every cycle number divisible by this.
pub const SLOW_CYCLE_DIVIDER: u32 = 5;

/// Outer register reads per parameter, each one already retried by the
/// session, before the parameter is skipped for the cycle.
pub const ATTEMPTS_PER_PARAMETER: u8 = 20;

/// Idle receive deadline on the ESC bus (ms). Long enough to mean "wait", the
/// loop re-arms it on expiry.
pub const ESC_RECEIVE_TIMEOUT_MS: u32 = 1_000_000;

/// Oldest cached value the responder still serves (ms).
pub const STALENESS_THRESHOLD_MS: u64 = 30_000;

/// Parameters the ESC itself reads often, plus live electrical values.
pub const DEFAULT_FAST_PARAMETERS: [BmsParameter; 4] = [
    BmsParameter::BatteryVoltage,
    BmsParameter::BatteryCurrent,
    BmsParameter::RemainingCapacity,
    BmsParameter::Statistics,
];

/// Remaining ESC-read parameters and slowly changing telemetry.
pub const DEFAULT_SLOW_PARAMETERS: [BmsParameter; 8] = [
    BmsParameter::Unknown7,
    BmsParameter::Temperatures,
    BmsParameter::BatteryPercent,
    BmsParameter::BmsStatus,
    BmsParameter::TotalCapacity,
    BmsParameter::ChargeCycles,
    BmsParameter::History,
    BmsParameter::CellVoltages1,
];

/// Run the poller and the responder concurrently, for ever.
pub async fn run_bridge<BP, BT, EP, ET, M>(
    poller: &mut BmsPoller<'_, BP, BT, M>,
    responder: &mut EscResponder<'_, EP, ET, M>,
) where
    BP: SerialPort,
    BT: BridgeTimer,
    EP: SerialPort,
    ET: BridgeTimer,
    M: RawMutex,
{
    #[cfg(feature = "defmt")]
    defmt::info!("Bridge started");
    join(poller.run(), responder.run()).await;
}
