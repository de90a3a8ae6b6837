//! Keychain-backed vault implementation.
//!
//! One `keyring::Entry` addressed by `(service, account)` holds the archive
//! blob directly. Keyring backends can panic on broken platform setups
//! (locked keychains, missing D-Bus), so every call is wrapped in
//! `catch_unwind` and a panic reads as "backend unavailable".

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, instrument};

use super::{CredentialVault, VaultError};

/// Vault storing its single slot in the platform keychain.
pub struct KeyringVault {
    service: String,
    account: String,
}

impl KeyringVault {
    /// Creates a vault addressing the keychain entry for
    /// `(service, account)`.
    #[must_use]
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, VaultError> {
        catch_unwind(|| keyring::Entry::new(&self.service, &self.account))
            .map_err(|_| VaultError::Unavailable)?
            .map_err(map_keyring_error)
    }
}

impl CredentialVault for KeyringVault {
    fn has_entry(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }

    #[instrument(level = "debug", skip_all, fields(service = %self.service, account = %self.account, bytes = blob.len()))]
    fn save(&self, blob: &[u8]) -> Result<(), VaultError> {
        let entry = self.entry()?;
        catch_unwind(AssertUnwindSafe(|| entry.set_secret(blob)))
            .map_err(|_| VaultError::Unavailable)?
            .map_err(map_keyring_error)?;
        debug!("saved vault entry");
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(service = %self.service, account = %self.account))]
    fn load(&self) -> Result<Option<Vec<u8>>, VaultError> {
        let entry = self.entry()?;
        let result = catch_unwind(AssertUnwindSafe(|| entry.get_secret()))
            .map_err(|_| VaultError::Unavailable)?;

        match result {
            Ok(blob) => {
                debug!(bytes = blob.len(), "loaded vault entry");
                Ok(Some(blob))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("vault entry absent");
                Ok(None)
            }
            Err(error) => Err(map_keyring_error(error)),
        }
    }

    #[instrument(level = "debug", skip_all, fields(service = %self.service, account = %self.account))]
    fn delete(&self) -> Result<(), VaultError> {
        let entry = self.entry()?;
        let result = catch_unwind(AssertUnwindSafe(|| entry.delete_credential()))
            .map_err(|_| VaultError::Unavailable)?;

        match result {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!("deleted vault entry");
                Ok(())
            }
            Err(error) => Err(map_keyring_error(error)),
        }
    }
}

fn map_keyring_error(error: keyring::Error) -> VaultError {
    match error {
        keyring::Error::NoStorageAccess(_) => VaultError::Unavailable,
        other => VaultError::Backend(other.to_string()),
    }
}
