use thiserror::Error;

/// Errors that can occur while attaching or driving a shift-register bank.
///
/// Configuration and registry errors are fatal to attachment. Transfer
/// errors are returned to whoever issued the line change.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid device description or transfer parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The serial bus failed to write the state byte.
    ///
    /// The in-memory state was already updated when this is returned, so the
    /// device state must be treated as unknown.
    #[error("Transfer failed: {0}")]
    Transfer(#[from] BusError),
    /// The line registry rejected the bank.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    /// Line offset is not below the bank's line count. No transfer was made.
    #[error("Line offset {offset} out of range (bank has {line_count} lines)")]
    LineOutOfRange {
        /// The offset that was requested.
        offset: u32,
        /// Number of lines the bank owns.
        line_count: u8,
    },
    /// The bank has been torn down and its transport released.
    #[error("Bank is detached")]
    Detached,
    /// The requested lifecycle hook is not implemented for this device.
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Result type alias for bank operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Bus-level failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The controller did not finish the transaction in time.
    #[error("bus timeout")]
    Timeout,
    /// The device did not respond.
    #[error("device not responding")]
    NotResponding,
    /// The bus controller is busy with another transaction.
    #[error("controller busy")]
    Busy,
    /// Error reported by an embedded-hal SPI device.
    #[error("SPI error: {0:?}")]
    Spi(embedded_hal::spi::ErrorKind),
    /// Any other transport-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Reasons a line registry can refuse a bank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The requested line numbers overlap a bank that is already registered.
    #[error("Lines {base}+{count} collide with bank registered at base {existing_base}")]
    Collision {
        /// Base index of the rejected bank.
        base: u32,
        /// Line count of the rejected bank.
        count: u8,
        /// Base index of the bank already holding those lines.
        existing_base: u32,
    },
    /// The requested range does not fit in the registry's numbering space.
    #[error("Lines {base}+{count} exceed the registry's line space")]
    InvalidRange {
        /// Base index of the rejected bank.
        base: u32,
        /// Line count of the rejected bank.
        count: u8,
    },
    /// No registered bank owns this line number.
    #[error("No bank owns line {0}")]
    UnknownLine(u32),
    /// No more banks can be registered.
    #[error("Registry is full")]
    Full,
}

impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

pub(crate) fn bad_config(message: impl Into<String>) -> Error {
    Error::Configuration(message.into())
}
