//! Live cookie jar boundary.
//!
//! The jar itself belongs to the embedded web surface; this crate only reads
//! it snapshot-style and writes individual records during restore. The trait
//! is the seam where an embedder bridges its webview's jar; [`MemoryJar`]
//! backs tests and headless tooling.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::cookie::CookieRecord;

/// Snapshot-read / record-write access to the live cookie jar.
///
/// Implementations own their internal synchronization; callers never hold a
/// long-lived lock across the jar.
pub trait CookieJar: Send + Sync {
    /// Returns a snapshot of every record currently in the jar.
    fn all_cookies(&self) -> Vec<CookieRecord>;

    /// Writes one record into the jar, replacing any record with the same
    /// `(name, domain, path)` identity.
    fn set_cookie(&self, record: CookieRecord);
}

/// In-process jar with the same identity-replace semantics as a browser jar.
#[derive(Default)]
pub struct MemoryJar {
    records: RwLock<HashMap<(String, String, String), CookieRecord>>,
}

impl MemoryJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every record. Mirrors a webview profile wipe on sign-out.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }
}

impl CookieJar for MemoryJar {
    fn all_cookies(&self) -> Vec<CookieRecord> {
        self.records
            .read()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    fn set_cookie(&self, record: CookieRecord) {
        let key = (
            record.name.clone(),
            record.domain.clone(),
            record.path.clone(),
        );
        if let Ok(mut records) = self.records.write() {
            records.insert(key, record);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(name: &str, value: &str, domain: &str, path: &str) -> CookieRecord {
        CookieRecord::new(
            name.to_string(),
            value.to_string(),
            domain.to_string(),
            path.to_string(),
            None,
            true,
        )
    }

    #[test]
    fn test_set_then_snapshot() {
        let jar = MemoryJar::new();
        jar.set_cookie(record("SID", "v1", ".youtube.com", "/"));
        jar.set_cookie(record("HSID", "v2", ".youtube.com", "/"));

        let snapshot = jar.all_cookies();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_same_identity_replaces() {
        let jar = MemoryJar::new();
        jar.set_cookie(record("SID", "old", ".youtube.com", "/"));
        jar.set_cookie(record("SID", "new", ".youtube.com", "/"));

        let snapshot = jar.all_cookies();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].value(), "new");
    }

    #[test]
    fn test_different_path_is_distinct_identity() {
        let jar = MemoryJar::new();
        jar.set_cookie(record("SID", "a", ".youtube.com", "/"));
        jar.set_cookie(record("SID", "b", ".youtube.com", "/music"));
        assert_eq!(jar.all_cookies().len(), 2);
    }

    #[test]
    fn test_clear_empties_jar() {
        let jar = MemoryJar::new();
        jar.set_cookie(record("SID", "v", ".youtube.com", "/"));
        jar.clear();
        assert!(jar.all_cookies().is_empty());
    }
}
