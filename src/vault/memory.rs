//! In-memory vault used as an injected test double.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{CredentialVault, VaultError};

/// Single-slot vault backed by process memory.
///
/// Carries call counters so tests can assert on write volume (for example,
/// that a burst of jar notifications coalesces into exactly one save), and
/// an "unavailable" switch to simulate a sandboxed keychain.
#[derive(Default)]
pub struct MemoryVault {
    slot: Mutex<Option<Vec<u8>>>,
    unavailable: AtomicBool,
    save_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryVault {
    /// Creates an empty, available vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vault whose backend reports unavailable on every operation.
    #[must_use]
    pub fn unavailable() -> Self {
        let vault = Self::default();
        vault.unavailable.store(true, Ordering::SeqCst);
        vault
    }

    /// Toggles backend availability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `save` calls observed.
    #[must_use]
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls observed.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), VaultError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::Unavailable);
        }
        Ok(())
    }
}

impl CredentialVault for MemoryVault {
    fn has_entry(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }

    fn save(&self, blob: &[u8]) -> Result<(), VaultError> {
        self.check_available()?;
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(blob.to_vec());
        }
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>, VaultError> {
        self.check_available()?;
        Ok(self.slot.lock().map(|slot| slot.clone()).unwrap_or_default())
    }

    fn delete(&self) -> Result<(), VaultError> {
        self.check_available()?;
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
