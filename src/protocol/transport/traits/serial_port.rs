//! Minimal abstraction for an asynchronous half-duplex serial port. Allows the
//! library to plug into a microcontroller UART or a desktop serial device.
use futures_util::Future;

/// Contract to exchange raw bytes with one bus.
pub trait SerialPort {
    type Error: core::fmt::Debug;

    /// Transmit `data`. Resolves once the bytes are physically on the wire, so
    /// the caller can switch the transceiver back to receive.
    fn write<'a>(
        &'a mut self,
        data: &'a [u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;

    /// Fill `buffer` completely or give up after `timeout_ms`.
    ///
    /// Returns the number of bytes read; fewer than `buffer.len()` means the
    /// deadline expired.
    fn read<'a>(
        &'a mut self,
        buffer: &'a mut [u8],
        timeout_ms: u32,
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;

    /// Drop any bytes already received but not yet read.
    fn reset_input_buffer(&mut self);

    /// Reinitialise the device after a desynchronised or failed read.
    fn reset<'a>(&'a mut self) -> impl Future<Output = Result<(), Self::Error>> + 'a;
}
