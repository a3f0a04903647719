//! # spi-shift-gpio
//!
//! Exposes an 8-bit serial-in/parallel-out shift register (74HC595 style)
//! wired to an SPI bus as a bank of write-only digital output lines.
//!
//! Each line change rewrites the whole state byte to the register in one
//! blocking transfer, so all outputs update together.
//!
//! ## Features
//!
//! *   [`ShiftRegisterBank`]: the state byte, its lock, and the transfer.
//!     *   Single-line writes (`set_line`) and masked writes (`set_lines`).
//!     *   Per-line [`OutputLine`] handles implementing `embedded_hal::digital::OutputPin`.
//!     *   Optional bring-up self-test (`0x55`, `0xAA`, `0x55`).
//! *   [`Transport`]: the bus seam, with [`SpiTransport`] for any
//!     `embedded_hal::spi::SpiDevice`.
//! *   [`BankRegistry`]: the line-registry seam, with the in-memory [`LineTable`]
//!     translating external line numbers to bank offsets.
//! *   [`attach`] / [`AttachedBank::detach`]: lifecycle with unconditional,
//!     idempotent teardown on failure.
//!
//! ## State Consistency
//!
//! The state byte is updated *before* the transfer and is **not** rolled back
//! if the transfer fails. An [`Error::Transfer`] therefore means "device state
//! unknown", not "device state unchanged". Retry policy belongs to the caller.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use spi_shift_gpio::{
//!     attach, BankConfig, BusError, DeviceDescription, LineTable, Result, TransferParams,
//!     Transport,
//! };
//!
//! struct LoggingBus;
//!
//! impl Transport for LoggingBus {
//!     fn configure(&mut self, _params: &TransferParams) -> std::result::Result<(), BusError> {
//!         Ok(())
//!     }
//!     fn write(&mut self, bytes: &[u8]) -> std::result::Result<(), BusError> {
//!         println!("SPI <- {:02X?}", bytes);
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let mut table = LineTable::new();
//!     let bank = attach(
//!         &DeviceDescription::new(12),
//!         LoggingBus,
//!         &mut table,
//!         &BankConfig::without_self_test(),
//!     )?;
//!
//!     bank.set_line(0, true)?; // writes 0x01
//!     bank.set_line(4, true)?; // writes 0x11
//!     bank.set_line(0, false)?; // writes 0x10
//!     Ok(())
//! }
//! ```
//!
//! ## Limitations
//!
//! *   Outputs are write-only; `state()` reports the in-memory byte, not a readback.
//! *   No interrupts or edge detection.
//! *   Suspend/resume and firmware-node probing return [`Error::Unsupported`].
//!
//! ## License
//!
//! This project is licensed under the WTFPL.

mod bank;
mod consts;
mod device;
mod error;
pub mod gpio;
pub mod registry;
pub mod transport;

pub use bank::{OutputLine, SelfTest, ShiftRegisterBank};
pub use device::{
    attach, matches_compatible, probe_firmware_node, AttachedBank, BankConfig, Describe,
    DeviceDescription,
};
pub use error::{BusError, Error, RegistryError, Result};
pub use gpio::{LineLevel, LineOffset};
pub use registry::{BankHandle, BankInfo, BankRegistry, LineTable, SetLineFn};
pub use transport::{SpiTransport, TransferParams, Transport};
// Re-export only essential public constants
pub use consts::{BITS_PER_WORD, COMPATIBLE, DEFAULT_LABEL, MAX_LINE_COUNT};
