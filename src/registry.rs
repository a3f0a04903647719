//! Registration of line banks in an external line-number space.

use crate::consts;
use crate::error::{RegistryError, Result};
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Callback a registry uses to drive a line: `(zero_based_offset, value)`.
pub type SetLineFn = Arc<dyn Fn(u32, bool) -> Result<()> + Send + Sync>;

/// What a bank tells the registry about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankInfo {
    pub label: String,
    /// First external line number.
    pub base: u32,
    pub count: u8,
}

impl BankInfo {
    /// Whether external line `line` falls inside this bank.
    pub fn contains(&self, line: u32) -> bool {
        line >= self.base && u64::from(line) < self.end()
    }

    fn end(&self) -> u64 {
        u64::from(self.base) + u64::from(self.count)
    }

    fn overlaps(&self, other: &BankInfo) -> bool {
        u64::from(self.base) < other.end() && u64::from(other.base) < self.end()
    }
}

/// Opaque token returned by a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BankHandle(u64);

impl BankHandle {
    pub fn new(id: u64) -> Self {
        BankHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A generic digital-output registry that banks attach to.
pub trait BankRegistry {
    /// Registers a bank. On error nothing is retained.
    fn register_bank(
        &mut self,
        info: BankInfo,
        set_fn: SetLineFn,
    ) -> std::result::Result<BankHandle, RegistryError>;

    /// Removes a bank. Unknown handles are ignored.
    fn unregister_bank(&mut self, handle: BankHandle);
}

impl<R: BankRegistry + ?Sized> BankRegistry for &mut R {
    fn register_bank(
        &mut self,
        info: BankInfo,
        set_fn: SetLineFn,
    ) -> std::result::Result<BankHandle, RegistryError> {
        (**self).register_bank(info, set_fn)
    }

    fn unregister_bank(&mut self, handle: BankHandle) {
        (**self).unregister_bank(handle)
    }
}

// Lets several attached banks share one registry.
impl<R: BankRegistry> BankRegistry for Arc<Mutex<R>> {
    fn register_bank(
        &mut self,
        info: BankInfo,
        set_fn: SetLineFn,
    ) -> std::result::Result<BankHandle, RegistryError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register_bank(info, set_fn)
    }

    fn unregister_bank(&mut self, handle: BankHandle) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unregister_bank(handle)
    }
}

struct Entry {
    handle: BankHandle,
    info: BankInfo,
    set_fn: SetLineFn,
}

/// In-memory registry mapping external line numbers to banks.
///
/// Rejects banks whose lines overlap an existing bank or fall outside
/// `0..LINE_SPACE`.
pub struct LineTable {
    entries: Vec<Entry>,
    next_id: u64,
    line_space: u32,
}

impl Default for LineTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LineTable {
    pub fn new() -> Self {
        Self::with_line_space(consts::registry::LINE_SPACE)
    }

    /// Creates a table accepting line numbers `0..line_space`.
    pub fn with_line_space(line_space: u32) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            line_space,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Info for every registered bank, in registration order.
    pub fn banks(&self) -> impl Iterator<Item = &BankInfo> + '_ {
        self.entries.iter().map(|e| &e.info)
    }

    /// Finds the bank owning `line` and the zero-based offset within it.
    pub fn lookup(&self, line: u32) -> Option<(BankHandle, u32)> {
        self.entries
            .iter()
            .find(|e| e.info.contains(line))
            .map(|e| (e.handle, line - e.info.base))
    }

    /// Drives external line `line` through the owning bank's callback.
    pub fn set_value(&self, line: u32, value: bool) -> Result<()> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.info.contains(line))
            .ok_or(RegistryError::UnknownLine(line))?;
        (entry.set_fn)(line - entry.info.base, value)
    }
}

impl BankRegistry for LineTable {
    fn register_bank(
        &mut self,
        info: BankInfo,
        set_fn: SetLineFn,
    ) -> std::result::Result<BankHandle, RegistryError> {
        if info.count == 0 || info.end() > u64::from(self.line_space) {
            return Err(RegistryError::InvalidRange {
                base: info.base,
                count: info.count,
            });
        }
        if let Some(existing) = self.entries.iter().find(|e| e.info.overlaps(&info)) {
            warn!(
                "Bank '{}' at {}+{} collides with '{}'",
                info.label, info.base, info.count, existing.info.label
            );
            return Err(RegistryError::Collision {
                base: info.base,
                count: info.count,
                existing_base: existing.info.base,
            });
        }
        if self.entries.len() >= consts::registry::MAX_BANKS {
            return Err(RegistryError::Full);
        }
        let handle = BankHandle::new(self.next_id);
        self.next_id += 1;
        debug!(
            "Registered bank '{}' as {:?}: lines {}..{}",
            info.label,
            handle,
            info.base,
            info.end()
        );
        self.entries.push(Entry {
            handle,
            info,
            set_fn,
        });
        Ok(handle)
    }

    fn unregister_bank(&mut self, handle: BankHandle) {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        if self.entries.len() == before {
            debug!("unregister_bank: {:?} not registered", handle);
        } else {
            debug!("Unregistered bank {:?}", handle);
        }
    }
}

impl fmt::Debug for LineTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTable")
            .field("banks", &self.banks().collect::<Vec<_>>())
            .field("line_space", &self.line_space)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn info(base: u32, count: u8) -> BankInfo {
        BankInfo {
            label: format!("bank@{}", base),
            base,
            count,
        }
    }

    fn noop() -> SetLineFn {
        Arc::new(|_: u32, _: bool| -> Result<()> { Ok(()) })
    }

    #[test]
    fn overlapping_banks_collide() {
        let mut table = LineTable::new();
        table.register_bank(info(12, 8), noop()).unwrap();
        assert_eq!(
            table.register_bank(info(19, 8), noop()),
            Err(RegistryError::Collision {
                base: 19,
                count: 8,
                existing_base: 12
            })
        );
        assert!(table.register_bank(info(20, 8), noop()).is_ok());
        assert!(table.register_bank(info(4, 8), noop()).is_ok());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn range_must_fit_line_space() {
        let mut table = LineTable::with_line_space(16);
        assert_eq!(
            table.register_bank(info(12, 8), noop()),
            Err(RegistryError::InvalidRange { base: 12, count: 8 })
        );
        assert!(table.register_bank(info(8, 8), noop()).is_ok());
    }

    #[test]
    fn set_value_translates_line_to_offset() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let mut table = LineTable::new();
        table
            .register_bank(
                info(12, 8),
                Arc::new(move |offset: u32, value: bool| -> Result<()> {
                    sink.lock().unwrap().push((offset, value));
                    Ok(())
                }),
            )
            .unwrap();

        table.set_value(12, true).unwrap();
        table.set_value(19, false).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![(0, true), (7, false)]);
        assert!(matches!(
            table.set_value(20, true),
            Err(Error::Registry(RegistryError::UnknownLine(20)))
        ));
        assert_eq!(table.lookup(15).map(|(_, off)| off), Some(3));
    }

    #[test]
    fn unregister_frees_lines() {
        let mut table = LineTable::new();
        let handle = table.register_bank(info(12, 8), noop()).unwrap();
        table.unregister_bank(handle);
        table.unregister_bank(handle);
        assert!(table.is_empty());
        assert!(table.register_bank(info(12, 8), noop()).is_ok());
    }
}
