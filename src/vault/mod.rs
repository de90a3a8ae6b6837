//! Durable, secure, single-slot credential storage.
//!
//! The vault is the source of truth for the persisted session: exactly one
//! opaque blob per `(service, account)` identity. The live jar is volatile
//! across process lifecycle events; the vault is not.

mod keyring;
mod memory;

pub use keyring::KeyringVault;
pub use memory::MemoryVault;

/// Errors for vault operations.
///
/// The split matters to callers: an unavailable backend means "no session,
/// ask the user to sign in", while an unexpected failure is logged and
/// otherwise treated the same way. Neither is fatal to the host application.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Platform secure storage is not reachable in the current execution
    /// context (sandboxing, missing signing entitlement, headless session).
    #[error("secure credential storage is not accessible in this environment")]
    Unavailable,

    /// The backend failed in a way it should not have.
    #[error("credential storage backend failure: {0}")]
    Backend(String),
}

/// Single-slot key/value store holding one opaque blob.
///
/// `save` is an atomic upsert: it updates the entry when present and inserts
/// it otherwise, never leaving a partial or duplicate entry behind. Absence
/// of the entry is a normal state, not an error.
pub trait CredentialVault: Send + Sync {
    /// Returns whether the slot currently holds an entry.
    ///
    /// Backend failures read as "no entry"; callers that need the
    /// distinction use [`CredentialVault::load`].
    fn has_entry(&self) -> bool;

    /// Atomically writes the blob into the slot.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the backend is unavailable or the write
    /// fails.
    fn save(&self, blob: &[u8]) -> Result<(), VaultError>;

    /// Reads the slot. `Ok(None)` when no entry exists.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the backend is unavailable or the read
    /// fails.
    fn load(&self) -> Result<Option<Vec<u8>>, VaultError>;

    /// Removes the entry. Removing an absent entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] when the backend is unavailable or the delete
    /// fails.
    fn delete(&self) -> Result<(), VaultError>;
}
