//! Serial bus access used by a bank to push its state byte.

use crate::consts;
use crate::error::BusError;
use embedded_hal::spi::{Error as _, SpiDevice};
use log::{debug, trace};

/// Bus parameters negotiated before the first transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    /// Word size in bits. Only 8 is meaningful for a single state byte.
    pub bits_per_word: u8,
    /// Optional clock ceiling; `None` leaves the controller default.
    pub max_speed_hz: Option<u32>,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            bits_per_word: consts::BITS_PER_WORD,
            max_speed_hz: None,
        }
    }
}

/// Blocking, write-only access to the shift register.
///
/// Implementations assert chip-select for the duration of `write`.
pub trait Transport: Send {
    /// Applies the bus parameters. Called once, before the bank is created.
    fn configure(&mut self, params: &TransferParams) -> Result<(), BusError>;

    /// Writes `bytes` in one transaction.
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    /// Releases the underlying connection. Called at most once per bank.
    fn release(&mut self) {}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn configure(&mut self, params: &TransferParams) -> Result<(), BusError> {
        (**self).configure(params)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(bytes)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Adapts an embedded-hal [`SpiDevice`] to [`Transport`].
///
/// The SPI device owns chip-select handling and clock configuration, so
/// `configure` only checks that the requested word size is 8 bits.
#[derive(Debug)]
pub struct SpiTransport<D> {
    device: D,
}

impl<D: SpiDevice> SpiTransport<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Returns the wrapped SPI device.
    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D> Transport for SpiTransport<D>
where
    D: SpiDevice + Send,
{
    fn configure(&mut self, params: &TransferParams) -> Result<(), BusError> {
        if params.bits_per_word != consts::BITS_PER_WORD {
            return Err(BusError::Other(format!(
                "unsupported word size {} (SpiDevice transfers 8-bit words)",
                params.bits_per_word
            )));
        }
        if let Some(hz) = params.max_speed_hz {
            debug!("SPI clock {} Hz requested; left to the SpiDevice configuration", hz);
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        trace!("SPI write {:02X?}", bytes);
        self.device
            .write(bytes)
            .map_err(|e| BusError::Spi(e.kind()))
    }
}
