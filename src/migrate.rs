//! One-time migration of the legacy plaintext cookie file into the vault.
//!
//! Earlier releases wrote session cookies to an unsecured JSON file on disk.
//! On every process start the migrator moves that file's contents into the
//! credential vault exactly once: a populated vault short-circuits the whole
//! sequence, and the artifact is only deleted after the vault write has been
//! read back successfully. Until verification passes, the file remains the
//! fallback copy of the user's session.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::cookie::{self, CookieRecord};
use crate::policy;
use crate::vault::CredentialVault;

/// Result of a migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Legacy cookies were moved into the vault and verified.
    Migrated,
    /// Nothing was migrated: already done, nothing to migrate, or the
    /// attempt failed and the legacy artifact was retained as fallback.
    NotMigrated,
}

/// Cookie entry as written by the legacy client (camelCase JSON).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    name: String,
    value: String,
    domain: String,
    #[serde(default = "default_path")]
    path: String,
    #[serde(default)]
    expires_at: Option<u64>,
    #[serde(default)]
    session_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

impl LegacyRecord {
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

/// Migrates the legacy cookie file at `legacy_path` into `vault`.
///
/// Safe to call on every process start: once the vault holds an entry the
/// call returns immediately without touching the filesystem. With
/// `preserve_legacy` set (diagnostics mode) the artifact is kept read-only
/// on disk even after a successful migration.
#[instrument(level = "debug", skip(vault), fields(legacy_path = %legacy_path.display()))]
pub fn migrate(
    vault: &dyn CredentialVault,
    legacy_path: &Path,
    preserve_legacy: bool,
    now: u64,
) -> MigrationOutcome {
    // Already migrated on a previous launch - terminal state.
    if vault.has_entry() {
        debug!("vault already populated, skipping legacy migration");
        return MigrationOutcome::NotMigrated;
    }

    if !legacy_path.exists() {
        debug!("no legacy cookie file present");
        return MigrationOutcome::NotMigrated;
    }

    let records = match read_legacy_records(legacy_path) {
        Ok(records) => records,
        Err(reason) => {
            error!(reason = %reason, "legacy cookie file is corrupted, deleting it");
            remove_artifact(legacy_path);
            return MigrationOutcome::NotMigrated;
        }
    };

    let valid = records
        .into_iter()
        .filter(|record| policy::is_valid_auth_cookie(record, now))
        .collect::<Vec<_>>();

    if valid.is_empty() {
        info!("legacy cookie file holds no valid auth cookies");
        if !preserve_legacy {
            remove_artifact(legacy_path);
        }
        return MigrationOutcome::NotMigrated;
    }

    let Ok(Some(blob)) = cookie::archive::encode(&valid) else {
        // Unreachable with a non-empty set unless serialization itself
        // failed; the artifact stays as fallback.
        error!("failed to encode legacy cookies for the vault");
        return MigrationOutcome::NotMigrated;
    };

    if let Err(save_error) = vault.save(&blob) {
        error!(error = %save_error, "vault save failed, retaining legacy cookie file");
        return MigrationOutcome::NotMigrated;
    }

    // Read back before destroying the only other copy of the session.
    if !verify_vault_round_trip(vault) {
        error!("vault verification failed after save, retaining legacy cookie file");
        return MigrationOutcome::NotMigrated;
    }

    info!(cookies = valid.len(), "migrated legacy cookies into the vault");
    if preserve_legacy {
        debug!("diagnostics mode, keeping legacy cookie file on disk");
    } else {
        remove_artifact(legacy_path);
    }
    MigrationOutcome::Migrated
}

fn read_legacy_records(path: &Path) -> Result<Vec<CookieRecord>, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let legacy = serde_json::from_slice::<Vec<LegacyRecord>>(&bytes).map_err(|e| e.to_string())?;
    Ok(legacy.into_iter().map(LegacyRecord::into_record).collect())
}

fn verify_vault_round_trip(vault: &dyn CredentialVault) -> bool {
    match vault.load() {
        Ok(Some(blob)) => match cookie::archive::decode(&blob) {
            Ok(records) => !records.is_empty(),
            Err(decode_error) => {
                warn!(error = %decode_error, "vault read-back did not decode");
                false
            }
        },
        Ok(None) => false,
        Err(load_error) => {
            warn!(error = %load_error, "vault read-back failed");
            false
        }
    }
}

fn remove_artifact(path: &Path) {
    if let Err(remove_error) = fs::remove_file(path) {
        warn!(error = %remove_error, "failed to delete legacy cookie file");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::vault::MemoryVault;

    const NOW: u64 = 1_700_000_000;

    fn write_legacy(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("cookies.json");
        fs::write(&path, contents).unwrap();
        path
    }

    fn legacy_json_valid() -> &'static str {
        r#"[
            {"name": "SAPISID", "value": "secret-1", "domain": ".youtube.com", "path": "/", "expiresAt": 4102444800, "sessionOnly": false},
            {"name": "PREF", "value": "noise", "domain": ".youtube.com", "path": "/", "expiresAt": null, "sessionOnly": true}
        ]"#
    }

    #[test]
    fn test_migrates_valid_cookies_and_deletes_artifact() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(&dir, legacy_json_valid());
        let vault = MemoryVault::new();

        let outcome = migrate(&vault, &path, false, NOW);

        assert_eq!(outcome, MigrationOutcome::Migrated);
        assert!(!path.exists(), "artifact should be deleted after verification");

        let blob = vault.load().unwrap().unwrap();
        let records = cookie::archive::decode(&blob).unwrap();
        assert_eq!(records.len(), 1, "only the whitelisted cookie migrates");
        assert_eq!(records[0].name, "SAPISID");
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(&dir, legacy_json_valid());
        let vault = MemoryVault::new();

        assert_eq!(migrate(&vault, &path, false, NOW), MigrationOutcome::Migrated);
        let saves_after_first = vault.save_calls();

        // Even with a fresh artifact on disk, a populated vault wins.
        let path2 = write_legacy(&dir, legacy_json_valid());
        assert_eq!(
            migrate(&vault, &path2, false, NOW),
            MigrationOutcome::NotMigrated
        );
        assert_eq!(vault.save_calls(), saves_after_first, "no second vault write");
        assert!(path2.exists(), "short-circuit must not touch the filesystem");
    }

    #[test]
    fn test_missing_artifact_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let vault = MemoryVault::new();
        let outcome = migrate(&vault, &dir.path().join("absent.json"), false, NOW);
        assert_eq!(outcome, MigrationOutcome::NotMigrated);
        assert_eq!(vault.save_calls(), 0);
    }

    #[test]
    fn test_corrupted_artifact_is_deleted() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(&dir, "{definitely not a cookie array");
        let vault = MemoryVault::new();

        let outcome = migrate(&vault, &path, false, NOW);

        assert_eq!(outcome, MigrationOutcome::NotMigrated);
        assert!(!path.exists(), "corrupt artifact should be deleted");
        assert_eq!(vault.save_calls(), 0);
    }

    #[test]
    fn test_all_expired_deletes_artifact() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(
            &dir,
            r#"[{"name": "SAPISID", "value": "old", "domain": ".youtube.com", "path": "/", "expiresAt": 1000, "sessionOnly": false}]"#,
        );
        let vault = MemoryVault::new();

        let outcome = migrate(&vault, &path, false, NOW);

        assert_eq!(outcome, MigrationOutcome::NotMigrated);
        assert!(!path.exists(), "nothing worth keeping");
        assert_eq!(vault.save_calls(), 0);
    }

    #[test]
    fn test_all_expired_preserved_in_diagnostics_mode() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(
            &dir,
            r#"[{"name": "SAPISID", "value": "old", "domain": ".youtube.com", "path": "/", "expiresAt": 1000, "sessionOnly": false}]"#,
        );
        let vault = MemoryVault::new();

        let outcome = migrate(&vault, &path, true, NOW);

        assert_eq!(outcome, MigrationOutcome::NotMigrated);
        assert!(path.exists(), "diagnostics mode retains the artifact");
    }

    #[test]
    fn test_unavailable_vault_retains_artifact() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(&dir, legacy_json_valid());
        let vault = MemoryVault::unavailable();

        let outcome = migrate(&vault, &path, false, NOW);

        assert_eq!(outcome, MigrationOutcome::NotMigrated);
        assert!(path.exists(), "artifact is the only remaining session copy");
    }

    #[test]
    fn test_successful_migration_preserves_artifact_in_diagnostics_mode() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(&dir, legacy_json_valid());
        let vault = MemoryVault::new();

        let outcome = migrate(&vault, &path, true, NOW);

        assert_eq!(outcome, MigrationOutcome::Migrated);
        assert!(path.exists(), "diagnostics mode retains the artifact");
        assert!(vault.has_entry());
    }

    #[test]
    fn test_missing_path_field_defaults_to_root() {
        let dir = TempDir::new().unwrap();
        let path = write_legacy(
            &dir,
            r#"[{"name": "SID", "value": "v", "domain": ".youtube.com", "expiresAt": null}]"#,
        );
        let vault = MemoryVault::new();

        assert_eq!(migrate(&vault, &path, false, NOW), MigrationOutcome::Migrated);
        let records = cookie::archive::decode(&vault.load().unwrap().unwrap()).unwrap();
        assert_eq!(records[0].path, "/");
    }
}
