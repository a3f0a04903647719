//! The shift-register line bank: one state byte, one lock, one transfer per change.

use crate::consts;
use crate::error::{Error, Result};
use crate::gpio::{self, LineLevel, LineOffset};
use crate::transport::Transport;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, trace, warn};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Bring-up sequence: write `pattern`, hold, write `!pattern`, hold, restore `pattern`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTest {
    pub pattern: u8,
    pub hold: Duration,
}

impl Default for SelfTest {
    fn default() -> Self {
        Self {
            pattern: consts::self_test::PATTERN,
            hold: consts::self_test::HOLD,
        }
    }
}

impl SelfTest {
    /// The bytes written, in order.
    pub fn steps(&self) -> [u8; 3] {
        [self.pattern, !self.pattern, self.pattern]
    }
}

// State and transport share one lock so the update and the write form a
// single critical section. `transport` is `None` once the bank is detached.
struct Inner<T> {
    state: u8,
    transport: Option<T>,
}

/// A bank of up to eight write-only output lines backed by a serial shift register.
///
/// Every line change rewrites the whole state byte to the device. Callers on
/// different threads are serialized by an internal mutex that is held across
/// the blocking bus write.
pub struct ShiftRegisterBank<T: Transport> {
    label: String,
    base: u32,
    line_count: u8,
    inner: Mutex<Inner<T>>,
}

impl<T: Transport> ShiftRegisterBank<T> {
    /// Creates an attached bank with state `0x00`. Nothing is written to the device.
    ///
    /// The transport is expected to be configured already.
    pub fn new(label: impl Into<String>, base: u32, line_count: u8, transport: T) -> Result<Self> {
        if line_count == 0 || line_count > consts::MAX_LINE_COUNT {
            return Err(Error::Configuration(format!(
                "line count {} out of range (1-{})",
                line_count,
                consts::MAX_LINE_COUNT
            )));
        }
        let label = label.into();
        debug!(
            "Created bank '{}': base={}, lines={}",
            label, base, line_count
        );
        Ok(Self {
            label,
            base,
            line_count,
            inner: Mutex::new(Inner {
                state: 0,
                transport: Some(transport),
            }),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// First external line number owned by this bank.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn line_count(&self) -> u8 {
        self.line_count
    }

    /// The in-memory state byte. This is the last byte written or attempted,
    /// not a readback from the device.
    pub fn state(&self) -> u8 {
        self.lock().state
    }

    /// Returns `false` once the transport has been released.
    pub fn is_attached(&self) -> bool {
        self.lock().transport.is_some()
    }

    /// Sets line `offset` to `value` and writes the full state byte.
    ///
    /// The state is updated before the write and is not rolled back if the
    /// write fails; an `Error::Transfer` means the device state is unknown.
    pub fn set_line(&self, offset: u32, value: bool) -> Result<()> {
        let line = LineOffset::new(offset, self.line_count)?;
        let level = LineLevel::from(value);
        let mut inner = self.lock();
        if inner.transport.is_none() {
            return Err(Error::Detached);
        }
        inner.state = line.apply(inner.state, level);
        trace!(
            "{}: line {} -> {:?}, state=0x{:02X}",
            self.label,
            line.number(),
            level,
            inner.state
        );
        self.flush(&mut inner)
    }

    /// Sets every line selected by `mask` to the matching bit of `bits`, with one write.
    ///
    /// Bits of `mask` beyond the bank's line count are rejected.
    pub fn set_lines(&self, mask: u8, bits: u8) -> Result<()> {
        let invalid = mask & !gpio::bank_mask(self.line_count);
        if invalid != 0 {
            return Err(Error::LineOutOfRange {
                offset: 7 - invalid.leading_zeros(),
                line_count: self.line_count,
            });
        }
        let mut inner = self.lock();
        if inner.transport.is_none() {
            return Err(Error::Detached);
        }
        inner.state = (inner.state & !mask) | (bits & mask);
        trace!(
            "{}: mask=0x{:02X} bits=0x{:02X}, state=0x{:02X}",
            self.label,
            mask,
            bits,
            inner.state
        );
        self.flush(&mut inner)
    }

    /// Returns an `OutputPin` handle for one line.
    pub fn line(&self, offset: u32) -> Result<OutputLine<'_, T>> {
        let offset = LineOffset::new(offset, self.line_count)?;
        Ok(OutputLine { bank: self, offset })
    }

    /// Runs the bring-up sequence, stopping at the first failed write.
    pub fn run_self_test(&self, test: &SelfTest) -> Result<()> {
        debug!(
            "{}: self-test pattern 0x{:02X}, hold {:?}",
            self.label, test.pattern, test.hold
        );
        for (i, byte) in test.steps().into_iter().enumerate() {
            if i > 0 && !test.hold.is_zero() {
                thread::sleep(test.hold);
            }
            self.write_state(byte)?;
        }
        Ok(())
    }

    /// Releases the transport. Returns `true` if this call released it.
    ///
    /// Safe to call any number of times; later calls do nothing.
    pub fn release(&self) -> bool {
        let mut inner = self.lock();
        match inner.transport.take() {
            Some(mut transport) => {
                transport.release();
                debug!("{}: transport released", self.label);
                true
            }
            None => false,
        }
    }

    // Replaces the whole state byte and writes it.
    fn write_state(&self, byte: u8) -> Result<()> {
        let mut inner = self.lock();
        if inner.transport.is_none() {
            return Err(Error::Detached);
        }
        inner.state = byte;
        self.flush(&mut inner)
    }

    // Writes the current state byte. Caller holds the lock.
    fn flush(&self, inner: &mut Inner<T>) -> Result<()> {
        let byte = inner.state;
        let transport = inner.transport.as_mut().ok_or(Error::Detached)?;
        match transport.write(&[byte]) {
            Ok(()) => {
                trace!("{}: wrote 0x{:02X}", self.label, byte);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "{}: transfer of 0x{:02X} failed: {}; device state unknown",
                    self.label, byte, e
                );
                Err(Error::Transfer(e))
            }
        }
    }

    // A panic inside a transfer leaves the state byte intact, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> Drop for ShiftRegisterBank<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Transport> fmt::Debug for ShiftRegisterBank<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ShiftRegisterBank")
            .field("label", &self.label)
            .field("base", &self.base)
            .field("line_count", &self.line_count)
            .field("state", &format_args!("0x{:02X}", inner.state))
            .field("attached", &inner.transport.is_some())
            .finish()
    }
}

/// One output line of a bank, usable anywhere an embedded-hal `OutputPin` is expected.
pub struct OutputLine<'a, T: Transport> {
    bank: &'a ShiftRegisterBank<T>,
    offset: LineOffset,
}

impl<T: Transport> OutputLine<'_, T> {
    pub fn offset(&self) -> u8 {
        self.offset.number()
    }

    pub fn set_level(&mut self, level: LineLevel) -> Result<()> {
        self.bank
            .set_line(u32::from(self.offset.number()), level.into())
    }
}

impl<T: Transport> ErrorType for OutputLine<'_, T> {
    type Error = Error;
}

impl<T: Transport> OutputPin for OutputLine<'_, T> {
    fn set_low(&mut self) -> Result<()> {
        self.set_level(LineLevel::Low)
    }

    fn set_high(&mut self) -> Result<()> {
        self.set_level(LineLevel::High)
    }
}
