use crate::consts;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Low,
    High,
}

impl From<bool> for LineLevel {
    fn from(value: bool) -> Self {
        if value {
            LineLevel::High
        } else {
            LineLevel::Low
        }
    }
}

impl From<LineLevel> for bool {
    fn from(level: LineLevel) -> Self {
        level == LineLevel::High
    }
}

/// A zero-based line offset within one bank (0-7).
/// Use `LineOffset::new(offset, line_count)` to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineOffset(u8);

impl LineOffset {
    /// Creates a new LineOffset, returning an error if `offset >= line_count`.
    pub fn new(offset: u32, line_count: u8) -> Result<Self> {
        let line_count = line_count.min(consts::MAX_LINE_COUNT);
        if offset < u32::from(line_count) {
            Ok(LineOffset(offset as u8))
        } else {
            Err(Error::LineOutOfRange { offset, line_count })
        }
    }

    /// Returns the underlying offset.
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Returns the bit mask (1 << offset) within the state byte.
    #[inline]
    pub fn mask(&self) -> u8 {
        1u8 << self.0
    }

    /// Applies `level` to this line's bit in `state`.
    #[inline]
    pub fn apply(&self, state: u8, level: LineLevel) -> u8 {
        match level {
            LineLevel::High => state | self.mask(),
            LineLevel::Low => state & !self.mask(),
        }
    }
}

/// Builds the mask covering the first `line_count` lines.
pub(crate) fn bank_mask(line_count: u8) -> u8 {
    match line_count {
        0 => 0,
        n if n >= consts::MAX_LINE_COUNT => 0xFF,
        n => (1u8 << n) - 1,
    }
}
