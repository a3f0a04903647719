//! Internal constants and defaults.

use std::time::Duration;

/// Number of output lines on one 8-bit shift register.
pub const MAX_LINE_COUNT: u8 = 8;

/// Word size negotiated with the bus. The whole state goes out as one word.
pub const BITS_PER_WORD: u8 = 8;

/// Label used when the configuration does not provide one.
pub const DEFAULT_LABEL: &str = "traspi";

/// Firmware-node compatible strings this driver binds to.
pub const COMPATIBLE: &[&str] = &["mg,traspi"];

// --- Bring-up self-test ---
pub mod self_test {
    use super::Duration;

    /// Alternating pattern written first; its complement follows.
    pub const PATTERN: u8 = 0x55;
    /// Time each pattern is held so the toggling is visible on the outputs.
    pub const HOLD: Duration = Duration::from_millis(1000);
}

// --- Line registry ---
pub mod registry {
    /// Size of the external line numbering space.
    pub const LINE_SPACE: u32 = 512;
    /// Maximum number of banks a `LineTable` will hold.
    pub const MAX_BANKS: usize = 64;
}
