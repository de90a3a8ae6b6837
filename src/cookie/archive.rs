//! Portable cookie archive codec.
//!
//! The archive is the only representation of a cookie set that is ever
//! persisted, so it uses an explicit versioned framing instead of any
//! platform's native object serialization: a 4-byte magic, one version byte,
//! then a JSON array of records.

use serde::{Deserialize, Serialize};

use super::CookieRecord;

const MAGIC: &[u8; 4] = b"YTMC";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 5;

/// Errors for archive encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Payload is too short or does not start with the archive magic.
    #[error("archive payload is invalid")]
    InvalidHeader,

    /// Payload declares a version this build does not understand.
    #[error("unsupported archive version {found} (expected {VERSION})")]
    UnsupportedVersion {
        /// Version byte found in the payload.
        found: u8,
    },

    /// Record serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Serialized form of a [`CookieRecord`] inside the archive payload.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    name: String,
    value: String,
    domain: String,
    path: String,
    expires_at: Option<u64>,
    session_only: bool,
}

impl StoredRecord {
    fn from_record(record: &CookieRecord) -> Self {
        Self {
            name: record.name.clone(),
            value: record.value().to_string(),
            domain: record.domain.clone(),
            path: record.path.clone(),
            expires_at: record.expires_at,
            session_only: record.session_only,
        }
    }

    fn into_record(self) -> CookieRecord {
        CookieRecord::new(
            self.name,
            self.value,
            self.domain,
            self.path,
            self.expires_at,
            self.session_only,
        )
    }
}

/// Encodes a cookie record set into an archive blob.
///
/// Returns `Ok(None)` for an empty record set: "nothing worth persisting" is
/// deliberately not representable as a valid archive, so storage layers never
/// write an empty session over a previously good one.
///
/// # Errors
///
/// Returns [`ArchiveError::Json`] when record serialization fails.
pub fn encode(records: &[CookieRecord]) -> Result<Option<Vec<u8>>, ArchiveError> {
    if records.is_empty() {
        return Ok(None);
    }

    let stored = records
        .iter()
        .map(StoredRecord::from_record)
        .collect::<Vec<_>>();
    let payload = serde_json::to_vec(&stored)?;

    let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
    output.extend_from_slice(MAGIC);
    output.push(VERSION);
    output.extend_from_slice(&payload);
    Ok(Some(output))
}

/// Decodes an archive blob back into cookie records.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidHeader`] when the blob is truncated or the
/// magic does not match, [`ArchiveError::UnsupportedVersion`] for a version
/// byte from a different build, and [`ArchiveError::Json`] when the record
/// payload fails to parse.
pub fn decode(bytes: &[u8]) -> Result<Vec<CookieRecord>, ArchiveError> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ArchiveError::InvalidHeader);
    }

    let version = bytes[MAGIC.len()];
    if version != VERSION {
        return Err(ArchiveError::UnsupportedVersion { found: version });
    }

    let stored = serde_json::from_slice::<Vec<StoredRecord>>(&bytes[HEADER_LEN..])?;
    Ok(stored.into_iter().map(StoredRecord::into_record).collect())
}
