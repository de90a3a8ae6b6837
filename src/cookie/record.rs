//! Cookie record data model.
//!
//! A [`CookieRecord`] mirrors one entry of the embedded web surface's live
//! cookie jar. Records are identified by `(name, domain, path)`; the jar
//! deduplicates on that identity, so a later write replaces an earlier one.

use std::fmt;

/// A single cookie as seen by the live jar and the persisted archive.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive session material.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    /// The domain the cookie belongs to (e.g., `.youtube.com`).
    pub domain: String,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Unix timestamp for expiry. `None` means the cookie has no expiry.
    pub expires_at: Option<u64>,
    /// Whether the jar marked this as a session-lifetime cookie.
    pub session_only: bool,
    /// Cookie value (sensitive — never log).
    value: String,
}

impl CookieRecord {
    /// Creates a new cookie record.
    #[must_use]
    pub fn new(
        name: String,
        value: String,
        domain: String,
        path: String,
        expires_at: Option<u64>,
        session_only: bool,
    ) -> Self {
        Self {
            name,
            domain,
            path,
            expires_at,
            session_only,
            value,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive — avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The jar identity of this record.
    ///
    /// Two records with the same identity refer to the same jar slot.
    #[must_use]
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.name, &self.domain, &self.path)
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieRecord")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("expires_at", &self.expires_at)
            .field("session_only", &self.session_only)
            .field("value", &"[REDACTED]")
            .finish()
    }
}
