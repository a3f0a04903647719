//! Attaching a shift-register bank to a transport and a line registry, and tearing it down.

use crate::bank::{SelfTest, ShiftRegisterBank};
use crate::consts;
use crate::error::{bad_config, Error, Result};
use crate::registry::{BankHandle, BankInfo, BankRegistry, SetLineFn};
use crate::transport::{TransferParams, Transport};
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Weak};

/// Where the bank lives in the external line numbering space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescription {
    /// First external line number. Zero is treated as missing.
    pub base: u32,
    pub count: u8,
}

impl DeviceDescription {
    pub fn new(base: u32) -> Self {
        Self {
            base,
            count: consts::MAX_LINE_COUNT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base == 0 {
            return Err(bad_config("missing or zero base line number"));
        }
        if self.count == 0 || self.count > consts::MAX_LINE_COUNT {
            return Err(Error::Configuration(format!(
                "line count {} out of range (1-{})",
                self.count,
                consts::MAX_LINE_COUNT
            )));
        }
        Ok(())
    }
}

/// Supplies the device description at attach time. `None` means absent.
pub trait Describe {
    fn describe(&self) -> Option<DeviceDescription>;
}

impl Describe for DeviceDescription {
    fn describe(&self) -> Option<DeviceDescription> {
        Some(*self)
    }
}

impl Describe for Option<DeviceDescription> {
    fn describe(&self) -> Option<DeviceDescription> {
        *self
    }
}

/// Whether a firmware-node compatible string names this device.
pub fn matches_compatible(compatible: &str) -> bool {
    consts::COMPATIBLE.contains(&compatible)
}

/// Building a description from a firmware node is not implemented; supply a
/// [`DeviceDescription`] directly instead.
pub fn probe_firmware_node(_compatible: &str) -> Result<DeviceDescription> {
    Err(Error::Unsupported("firmware-node probe"))
}

/// Attach-time settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig {
    pub label: String,
    /// Bring-up sequence run before registration; `None` skips it.
    pub self_test: Option<SelfTest>,
    pub transfer: TransferParams,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            label: consts::DEFAULT_LABEL.to_string(),
            self_test: Some(SelfTest::default()),
            transfer: TransferParams::default(),
        }
    }
}

impl BankConfig {
    /// Default settings without the bring-up sequence.
    pub fn without_self_test() -> Self {
        Self {
            self_test: None,
            ..Self::default()
        }
    }
}

enum Phase<T: Transport> {
    Attached {
        bank: Arc<ShiftRegisterBank<T>>,
        handle: BankHandle,
    },
    Detached,
}

/// A bank that is configured, optionally self-tested, and registered.
///
/// Dropping it detaches it.
pub struct AttachedBank<T: Transport, R: BankRegistry> {
    phase: Phase<T>,
    registry: R,
}

/// Brings up a bank: describe, validate, configure the bus, build the bank,
/// run the self-test, register.
///
/// Every failure releases the transport exactly once and leaves nothing
/// registered.
pub fn attach<T, R>(
    describe: &impl Describe,
    mut transport: T,
    mut registry: R,
    config: &BankConfig,
) -> Result<AttachedBank<T, R>>
where
    T: Transport + 'static,
    R: BankRegistry,
{
    let desc = match describe.describe() {
        Some(desc) => desc,
        None => {
            transport.release();
            return Err(bad_config("missing device description"));
        }
    };
    if let Err(e) = desc.validate() {
        warn!("{}: {}", config.label, e);
        transport.release();
        return Err(e);
    }
    if let Err(e) = transport.configure(&config.transfer) {
        warn!("{}: bus setup failed: {}", config.label, e);
        transport.release();
        return Err(Error::Transfer(e));
    }

    let bank = Arc::new(ShiftRegisterBank::new(
        config.label.clone(),
        desc.base,
        desc.count,
        transport,
    )?);

    if let Some(test) = &config.self_test {
        if let Err(e) = bank.run_self_test(test) {
            warn!("{}: self-test failed: {}", config.label, e);
            bank.release();
            return Err(e);
        }
    }

    let info = BankInfo {
        label: config.label.clone(),
        base: desc.base,
        count: desc.count,
    };
    let handle = match registry.register_bank(info, set_line_fn(&bank)) {
        Ok(handle) => handle,
        Err(e) => {
            warn!("{}: registration failed: {}", config.label, e);
            bank.release();
            return Err(e.into());
        }
    };
    debug!(
        "{}: attached at base {} ({} lines)",
        config.label, desc.base, desc.count
    );

    Ok(AttachedBank {
        phase: Phase::Attached { bank, handle },
        registry,
    })
}

// The registry only holds a weak reference, so detaching drops the bank.
fn set_line_fn<T: Transport + 'static>(bank: &Arc<ShiftRegisterBank<T>>) -> SetLineFn {
    let weak: Weak<ShiftRegisterBank<T>> = Arc::downgrade(bank);
    Arc::new(move |offset: u32, value: bool| -> Result<()> {
        match weak.upgrade() {
            Some(bank) => bank.set_line(offset, value),
            None => Err(Error::Detached),
        }
    })
}

impl<T: Transport, R: BankRegistry> AttachedBank<T, R> {
    /// The live bank, or `Error::Detached`.
    pub fn bank(&self) -> Result<&Arc<ShiftRegisterBank<T>>> {
        match &self.phase {
            Phase::Attached { bank, .. } => Ok(bank),
            Phase::Detached => Err(Error::Detached),
        }
    }

    pub fn handle(&self) -> Option<BankHandle> {
        match &self.phase {
            Phase::Attached { handle, .. } => Some(*handle),
            Phase::Detached => None,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.phase, Phase::Attached { .. })
    }

    /// Shortcut for `bank()?.set_line(offset, value)`.
    pub fn set_line(&self, offset: u32, value: bool) -> Result<()> {
        self.bank()?.set_line(offset, value)
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Unregisters the bank and releases its transport. Later calls do nothing.
    pub fn detach(&mut self) {
        if let Phase::Attached { bank, handle } =
            std::mem::replace(&mut self.phase, Phase::Detached)
        {
            self.registry.unregister_bank(handle);
            bank.release();
            debug!("{}: detached", bank.label());
        }
    }

    /// Power-management suspend. Not implemented for this device.
    pub fn suspend(&self) -> Result<()> {
        Err(Error::Unsupported("suspend"))
    }

    /// Power-management resume. Not implemented for this device.
    pub fn resume(&self) -> Result<()> {
        Err(Error::Unsupported("resume"))
    }
}

impl<T: Transport, R: BankRegistry> Drop for AttachedBank<T, R> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T: Transport, R: BankRegistry> fmt::Debug for AttachedBank<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phase {
            Phase::Attached { bank, handle } => f
                .debug_struct("AttachedBank")
                .field("bank", bank)
                .field("handle", handle)
                .finish(),
            Phase::Detached => f.write_str("AttachedBank(Detached)"),
        }
    }
}
