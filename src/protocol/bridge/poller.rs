//! BMS side of the bridge: keeps the cache fresh by polling two parameter
//! lists on two cadences.
//!
//! Nothing is decoded here. Raw bytes go to the cache and consumers decode on
//! demand through the catalog.
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

use crate::config::PollerConfig;
use crate::protocol::cache::{ParameterCache, Partition};
use crate::protocol::catalog::BmsParameter;
use crate::protocol::transport::session::Session;
use crate::protocol::transport::traits::{bridge_timer::BridgeTimer, serial_port::SerialPort};

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u32,
    /// Whether the slow list was polled in this cycle.
    pub slow_polled: bool,
    /// Parameters whose cache entry was overwritten.
    pub refreshed: usize,
    /// Parameters skipped after every attempt failed; their previous value stays.
    pub failed: usize,
}

/// Periodic reader of the BMS, sole writer of the [`ParameterCache`].
pub struct BmsPoller<'a, P, T, M = CriticalSectionRawMutex>
where
    P: SerialPort,
    T: BridgeTimer,
    M: RawMutex,
{
    session: Session<P, T>,
    cache: &'a ParameterCache<M>,
    fast: &'a [BmsParameter],
    slow: &'a [BmsParameter],
    config: PollerConfig,
    /// Cycles completed so far.
    completed: u32,
}

impl<'a, P, T, M> BmsPoller<'a, P, T, M>
where
    P: SerialPort,
    T: BridgeTimer,
    M: RawMutex,
{
    pub fn new(
        session: Session<P, T>,
        cache: &'a ParameterCache<M>,
        fast: &'a [BmsParameter],
        slow: &'a [BmsParameter],
    ) -> Self {
        Self::with_config(session, cache, fast, slow, PollerConfig::default())
    }

    pub fn with_config(
        session: Session<P, T>,
        cache: &'a ParameterCache<M>,
        fast: &'a [BmsParameter],
        slow: &'a [BmsParameter],
        config: PollerConfig,
    ) -> Self {
        Self {
            session,
            cache,
            fast,
            slow,
            config,
            completed: 0,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Cycles completed so far.
    pub fn cycles(&self) -> u32 {
        self.completed
    }

    pub fn session_mut(&mut self) -> &mut Session<P, T> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<P, T> {
        self.session
    }

    /// Poll the fast list, and the slow list when the cycle number is a
    /// multiple of [`PollerConfig::slow_divider`].
    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle = self.completed.wrapping_add(1);
        let mut report = CycleReport {
            cycle,
            ..CycleReport::default()
        };

        let fast = self.fast;
        self.poll_list(Partition::Fast, fast, &mut report).await;

        if self.config.slow_divider != 0 && cycle % self.config.slow_divider == 0 {
            report.slow_polled = true;
            let slow = self.slow;
            self.poll_list(Partition::Slow, slow, &mut report).await;
        }

        self.completed = cycle;

        #[cfg(feature = "defmt")]
        defmt::debug!("Poll cycle done: {}", report);
        report
    }

    /// Poll for ever, one cycle per [`PollerConfig::cycle_period_ms`].
    ///
    /// A cycle running over its budget starts the next one immediately.
    pub async fn run(&mut self) {
        loop {
            let started = self.session.timer().now_ms();
            self.run_cycle().await;
            let elapsed = self.session.timer().now_ms().saturating_sub(started);

            let period = u64::from(self.config.cycle_period_ms);
            if elapsed < period {
                // Remainder is below `cycle_period_ms`, so it fits a u32.
                let remaining = (period - elapsed) as u32;
                self.session.timer_mut().delay_ms(remaining).await;
            }
        }
    }

    async fn poll_list(
        &mut self,
        partition: Partition,
        parameters: &[BmsParameter],
        report: &mut CycleReport,
    ) {
        for &parameter in parameters {
            if self.poll_parameter(partition, parameter).await {
                report.refreshed += 1;
            } else {
                report.failed += 1;
            }
        }
    }

    /// Read `parameter` into `partition`; `false` once every attempt failed.
    async fn poll_parameter(&mut self, partition: Partition, parameter: BmsParameter) -> bool {
        let address = self.config.bms_address;

        for _attempt in 0..self.config.attempts_per_parameter {
            let Some(data) = self.session.read_bms_parameter(address, parameter).await else {
                continue;
            };

            let now_ms = self.session.timer().now_ms();
            return match self.cache.store(partition, parameter.id(), &data, now_ms) {
                Ok(()) => true,
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("Cannot cache {}: {}", parameter, _err);
                    false
                }
            };
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Skipping {} for this cycle after {} attempts",
            parameter,
            self.config.attempts_per_parameter
        );
        false
    }
}
