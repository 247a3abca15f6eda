//! One bus endpoint: frame send/receive with frame-boundary detection, and the
//! retrying register read used to poll a device.
//!
//! Receiving follows the header-first strategy imposed by the framing:
//!
//! 1. read exactly [`HEADER_LEN`] bytes;
//! 2. derive the remaining length from the command and length byte;
//! 3. read the rest and validate the whole frame.
//!
//! Any short read or malformed frame resets the port, since the byte stream
//! may have lost alignment with frame boundaries.
use crate::config::SessionConfig;
use crate::core::{Payload, HEADER_LEN, MAX_FRAME_LEN};
use crate::error::{ExchangeError, FrameError};
use crate::infra::codec::frame::{Command, Frame, Header};
use crate::protocol::catalog::BmsParameter;
use crate::protocol::transport::traits::{bridge_timer::BridgeTimer, serial_port::SerialPort};

/// Serial bus endpoint owning its port and timer.
pub struct Session<P: SerialPort, T: BridgeTimer> {
    port: P,
    timer: T,
    config: SessionConfig,
}

impl<P, T> Session<P, T>
where
    P: SerialPort,
    T: BridgeTimer,
{
    /// Session with the default bus timing.
    pub fn new(port: P, timer: T) -> Self {
        Self::with_config(port, timer, SessionConfig::default())
    }

    pub fn with_config(port: P, timer: T, config: SessionConfig) -> Self {
        Self {
            port,
            timer,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Give back the port and timer.
    pub fn into_parts(self) -> (P, T) {
        (self.port, self.timer)
    }

    //==================================================================================SEND
    /// Encode and transmit one frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<(), ExchangeError<P::Error>> {
        let mut buffer = [0u8; MAX_FRAME_LEN];
        let len = frame.encode(&mut buffer)?;
        self.port
            .write(&buffer[..len])
            .await
            .map_err(ExchangeError::Port)
    }

    //==================================================================================RECEIVE
    /// Wait up to `timeout_ms` for each part of the next frame.
    pub async fn receive_frame(
        &mut self,
        timeout_ms: u32,
    ) -> Result<Frame, ExchangeError<P::Error>> {
        let mut buffer = [0u8; MAX_FRAME_LEN];

        let header_read = self
            .port
            .read(&mut buffer[..HEADER_LEN], timeout_ms)
            .await
            .map_err(ExchangeError::Port)?;
        if header_read < HEADER_LEN {
            self.reset_port().await;
            return Err(ExchangeError::Timeout);
        }

        let header = match Header::decode(&buffer[..HEADER_LEN]) {
            Ok(header) => header,
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Invalid header {:#x}: {}", &buffer[..HEADER_LEN], err);
                self.reset_port().await;
                return Err(ExchangeError::InvalidData(err));
            }
        };

        let total = header.packet_length();
        let rest = header.remaining_length();
        let body_read = self
            .port
            .read(&mut buffer[HEADER_LEN..total], timeout_ms)
            .await
            .map_err(ExchangeError::Port)?;
        if body_read < rest {
            self.reset_port().await;
            return Err(ExchangeError::Timeout);
        }

        match Frame::decode(&buffer[..total]) {
            Ok(frame) => Ok(frame),
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::info!("Invalid frame: {}", err);
                self.reset_port().await;
                Err(ExchangeError::InvalidData(err))
            }
        }
    }

    async fn reset_port(&mut self) {
        if let Err(_err) = self.port.reset().await {
            #[cfg(feature = "defmt")]
            defmt::warn!("Serial port reset failed: {}", defmt::Debug2Format(&_err));
        }
    }

    //==================================================================================EXCHANGE
    /// One send/receive trial: flush stale input, send `request`, and accept
    /// only the ReadResponse that answers it.
    pub async fn exchange(&mut self, request: &Frame) -> Result<Frame, ExchangeError<P::Error>> {
        self.port.reset_input_buffer();
        self.send_frame(request).await?;

        let response = self.receive_frame(self.config.read_timeout_ms).await?;
        if answers(&response, request) {
            Ok(response)
        } else {
            #[cfg(feature = "defmt")]
            defmt::debug!("Wrong packet received: {}", response);
            Err(ExchangeError::MismatchedResponse)
        }
    }

    //==================================================================================READ_REGISTER
    /// Read `length` bytes of `parameter` from the device at `address`.
    ///
    /// Performs up to [`SessionConfig::trials`] exchanges separated by
    /// [`SessionConfig::inter_trial_delay_ms`]. Timeouts, malformed frames and
    /// answers to another request all count as a failed trial.
    ///
    /// Returns `Ok(None)` once every trial failed. `Err` only reports a request
    /// that cannot be built at all.
    pub async fn read_register(
        &mut self,
        address: u16,
        parameter: u8,
        length: u8,
    ) -> Result<Option<Payload>, FrameError> {
        let request = Frame::read_request(address, parameter, length)?;

        let trials = self.config.trials;
        for trial in 0..trials {
            if trial > 0 {
                self.timer.delay_ms(self.config.inter_trial_delay_ms).await;
            }

            match self.exchange(&request).await {
                Ok(response) => return Ok(response.into_payload()),
                Err(ExchangeError::Timeout) => {
                    #[cfg(feature = "defmt")]
                    log_trial_timeout(trial, trials);
                }
                Err(_err) => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Trial {} failed: {}", trial, defmt::Debug2Format(&_err));
                }
            }
        }

        Ok(None)
    }

    /// Raw data of a catalogued BMS parameter, or `None` after all trials failed.
    pub async fn read_bms_parameter(
        &mut self,
        address: u16,
        parameter: BmsParameter,
    ) -> Option<Payload> {
        // Catalog lengths never exceed the payload limit, so the request always builds.
        self.read_register(address, parameter.id(), parameter.length())
            .await
            .ok()
            .flatten()
    }
}

/// Last trial escalates to info, matching the point where the read is lost.
#[cfg(feature = "defmt")]
fn log_trial_timeout(trial: u8, trials: u8) {
    if trial + 1 < trials {
        defmt::debug!("Timeout on trial {}", trial);
    } else {
        defmt::info!("Timeout on trial {}", trial);
    }
}

/// Whether `response` is the ReadResponse to `request`.
fn answers(response: &Frame, request: &Frame) -> bool {
    response.command() == Command::ReadResponse
        && response.address() == request.address()
        && response.parameter() == request.parameter()
        && response.data_length() == request.data_length()
}
