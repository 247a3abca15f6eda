//! ESC side of the bridge: impersonates the BMS towards the ESC.
//!
//! The ESC keeps querying the BMS address as if the battery were directly
//! attached. Each request is answered from the [`ParameterCache`], and only
//! with data fresh enough to be trusted. The ESC also broadcasts Status frames
//! of its own; those are kept raw in the [`EscStatusTable`].
//!
//! The inbound path never retries: anything malformed or unexpected is dropped
//! and the loop waits for the next frame.
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};

use crate::config::{ResponderConfig, StalenessPolicy};
use crate::error::ExchangeError;
use crate::infra::codec::frame::{Command, Frame};
use crate::protocol::cache::{CacheEntry, EscStatusTable, ParameterCache};
use crate::protocol::transport::session::Session;
use crate::protocol::transport::traits::{bridge_timer::BridgeTimer, serial_port::SerialPort};

/// Why a read request went unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    /// Never read from the BMS since startup.
    Missing,
    /// Older than the staleness threshold under the configured policy.
    Stale { age_ms: u64 },
    /// Cached data does not have the length the ESC asked for.
    LengthMismatch { cached: u8 },
}

/// What the responder did with one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameOutcome {
    /// A ReadResponse carrying cached data was sent.
    Replied,
    /// Read request for the BMS left unanswered.
    Dropped(DropReason),
    /// Status frame of the ESC stored in the status table.
    StatusRecorded,
    /// Any other command/address combination.
    Ignored,
}

/// Answers ESC read requests from the cache and records ESC Status frames.
pub struct EscResponder<'a, P, T, M = CriticalSectionRawMutex>
where
    P: SerialPort,
    T: BridgeTimer,
    M: RawMutex,
{
    session: Session<P, T>,
    cache: &'a ParameterCache<M>,
    esc_status: &'a EscStatusTable<M>,
    config: ResponderConfig,
}

impl<'a, P, T, M> EscResponder<'a, P, T, M>
where
    P: SerialPort,
    T: BridgeTimer,
    M: RawMutex,
{
    pub fn new(
        session: Session<P, T>,
        cache: &'a ParameterCache<M>,
        esc_status: &'a EscStatusTable<M>,
    ) -> Self {
        Self::with_config(session, cache, esc_status, ResponderConfig::default())
    }

    pub fn with_config(
        session: Session<P, T>,
        cache: &'a ParameterCache<M>,
        esc_status: &'a EscStatusTable<M>,
        config: ResponderConfig,
    ) -> Self {
        Self {
            session,
            cache,
            esc_status,
            config,
        }
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    pub fn session_mut(&mut self) -> &mut Session<P, T> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<P, T> {
        self.session
    }

    /// Serve for ever. Receive errors are logged and the wait re-armed.
    pub async fn run(&mut self) {
        loop {
            match self.serve_once().await {
                Ok(_outcome) => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("ESC frame handled: {}", _outcome);
                }
                Err(ExchangeError::Timeout) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("No frame from the ESC, waiting again");
                }
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::info!(
                        "Failed to read packet from ESC: {}",
                        defmt::Debug2Format(&_err)
                    );
                }
            }
        }
    }

    /// Wait for one inbound frame and handle it.
    pub async fn serve_once(&mut self) -> Result<FrameOutcome, ExchangeError<P::Error>> {
        let frame = self
            .session
            .receive_frame(self.config.receive_timeout_ms)
            .await?;
        self.handle_frame(&frame).await
    }

    /// Dispatch one inbound frame.
    ///
    /// `Err` only reports a failure to transmit the reply.
    pub async fn handle_frame(
        &mut self,
        frame: &Frame,
    ) -> Result<FrameOutcome, ExchangeError<P::Error>> {
        match frame.command() {
            Command::ReadRequest if frame.address() == self.config.bms_address => {
                self.reply_from_cache(frame).await
            }
            Command::Status if frame.address() == self.config.esc_address => {
                Ok(self.record_status(frame))
            }
            _ => {
                #[cfg(feature = "defmt")]
                defmt::info!("Unknown packet from ESC: {}", frame);
                Ok(FrameOutcome::Ignored)
            }
        }
    }

    async fn reply_from_cache(
        &mut self,
        request: &Frame,
    ) -> Result<FrameOutcome, ExchangeError<P::Error>> {
        let parameter = request.parameter();
        let length = request.data_length();

        let Some(entry) = self.cache.lookup(parameter) else {
            #[cfg(feature = "defmt")]
            defmt::info!("Parameter {} missing", parameter);
            return Ok(FrameOutcome::Dropped(DropReason::Missing));
        };

        let age_ms = self.age_ms(&entry);
        if age_ms > self.config.staleness_threshold_ms {
            #[cfg(feature = "defmt")]
            defmt::info!("Parameter {} outdated ({} ms)", parameter, age_ms);
            return Ok(FrameOutcome::Dropped(DropReason::Stale { age_ms }));
        }

        if entry.data.len() != length as usize {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "Parameter {} cached with {} bytes, ESC asked {}",
                parameter,
                entry.data.len(),
                length
            );
            return Ok(FrameOutcome::Dropped(DropReason::LengthMismatch {
                cached: entry.data.len() as u8,
            }));
        }

        let response = Frame::read_response(request.address(), parameter, &entry.data)?;
        self.session.send_frame(&response).await?;
        Ok(FrameOutcome::Replied)
    }

    /// Age used for the staleness decision under the configured policy.
    fn age_ms(&self, entry: &CacheEntry) -> u64 {
        let now_ms = self.session.timer().now_ms();
        match self.config.staleness {
            StalenessPolicy::PerEntry => entry.age_ms(now_ms),
            StalenessPolicy::SharedLastUpdate => {
                let last = self
                    .cache
                    .last_update_ms()
                    .unwrap_or(entry.refreshed_at_ms);
                now_ms.saturating_sub(last)
            }
        }
    }

    fn record_status(&mut self, frame: &Frame) -> FrameOutcome {
        let data = frame.payload().unwrap_or(&[]);
        match self.esc_status.record(frame.parameter(), data) {
            Ok(()) => FrameOutcome::StatusRecorded,
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("ESC status {} not stored: {}", frame.parameter(), _err);
                FrameOutcome::Ignored
            }
        }
    }
}
