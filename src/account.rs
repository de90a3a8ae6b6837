//! Multi-account addressing over one signed-in browser session.
//!
//! Two independent schemes layer on the same cookie jar:
//!
//! - **Index addressing**: the `X-Goog-AuthUser` header selects which of the
//!   densely-packed signed-in identities (0, 1, 2, …) a request uses.
//! - **Brand addressing**: an opaque identity token carried in the request
//!   body selects a brand channel within that session.
//!
//! When a brand token is set it governs which identity is acted upon, while
//! the index header still selects the browser session whose cookies back the
//! request.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Header carrying the signed-in account index.
pub const AUTH_USER_HEADER: &str = "X-Goog-AuthUser";

/// Accounts are assumed densely packed from index 0; a misbehaving endpoint
/// must not turn discovery into an unbounded scan.
const MAX_PROBED_INDICES: u32 = 10;

/// Errors for account discovery.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The introspection endpoint could not be reached.
    #[error("account endpoint unavailable: {0}")]
    Unavailable(String),

    /// The endpoint answered with something the client could not use.
    #[error("account endpoint returned an unusable response: {0}")]
    BadResponse(String),
}

/// Introspection result for one account index.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    /// Display name of the signed-in identity at this index.
    pub display_name: String,
}

/// One brand identity available inside the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandAccount {
    /// Display name shown in the account switcher.
    pub display_name: String,
    /// Opaque identity token carried in the request body.
    pub token: String,
}

/// Boundary to the remote account-introspection API.
///
/// The transport is a black box; implementations attach whatever auth
/// material the call needs and hand back decoded results.
#[async_trait]
pub trait AccountEndpoint: Send + Sync {
    /// Introspects the account at `index`. `Ok(None)` means no account
    /// exists at that index.
    async fn account_info(&self, index: u32) -> Result<Option<AccountInfo>, AccountError>;

    /// Lists the brand identities available in the current session.
    async fn list_brand_accounts(&self) -> Result<Vec<BrandAccount>, AccountError>;
}

/// Current addressing selection plus discovery over an injected endpoint.
pub struct AccountAddressing {
    endpoint: Box<dyn AccountEndpoint>,
    auth_user_index: AtomicU32,
    brand_token: RwLock<Option<String>>,
}

impl AccountAddressing {
    /// Creates an addressing layer over the given endpoint, selecting the
    /// primary identity (index 0, no brand token).
    #[must_use]
    pub fn new(endpoint: Box<dyn AccountEndpoint>) -> Self {
        Self {
            endpoint,
            auth_user_index: AtomicU32::new(0),
            brand_token: RwLock::new(None),
        }
    }

    /// Discovers which account indices exist.
    ///
    /// Probes 0, 1, 2, … and records an index as present when introspection
    /// succeeds with a non-empty display name. Probing stops at the first
    /// miss (accounts are densely packed from 0) and is capped at
    /// `MAX_PROBED_INDICES`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError`] only when the very first probe fails to
    /// reach the endpoint; later transport failures end the scan with the
    /// indices found so far.
    #[instrument(level = "debug", skip(self))]
    pub async fn discover_indices(&self) -> Result<Vec<u32>, AccountError> {
        let mut found = Vec::new();

        for index in 0..MAX_PROBED_INDICES {
            match self.endpoint.account_info(index).await {
                Ok(Some(info)) if !info.display_name.trim().is_empty() => {
                    debug!(index, "account index present");
                    found.push(index);
                }
                Ok(_) => break,
                Err(probe_error) => {
                    if found.is_empty() && index == 0 {
                        return Err(probe_error);
                    }
                    warn!(index, error = %probe_error, "account probe failed, stopping scan");
                    break;
                }
            }
        }

        debug!(accounts = found.len(), "account index discovery finished");
        Ok(found)
    }

    /// Fetches the brand identities available in the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError`] when the list call fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn discover_brand_accounts(&self) -> Result<Vec<BrandAccount>, AccountError> {
        let accounts = self.endpoint.list_brand_accounts().await?;
        debug!(accounts = accounts.len(), "brand account discovery finished");
        Ok(accounts)
    }

    /// Selects the signed-in account index used for subsequent requests.
    pub fn set_auth_user_index(&self, index: u32) {
        self.auth_user_index.store(index, Ordering::SeqCst);
    }

    /// The currently selected account index (0 = primary identity).
    #[must_use]
    pub fn auth_user_index(&self) -> u32 {
        self.auth_user_index.load(Ordering::SeqCst)
    }

    /// Selects a brand identity for subsequent requests.
    pub fn select_brand_account(&self, token: impl Into<String>) {
        if let Ok(mut current) = self.brand_token.write() {
            *current = Some(token.into());
        }
    }

    /// Clears the brand selection, returning to the session's own identity.
    pub fn clear_brand_account(&self) {
        if let Ok(mut current) = self.brand_token.write() {
            *current = None;
        }
    }

    /// The active brand identity token, if one is selected.
    #[must_use]
    pub fn brand_token(&self) -> Option<String> {
        self.brand_token
            .read()
            .map(|current| current.clone())
            .unwrap_or_default()
    }
}
