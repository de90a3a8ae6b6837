//! Session synchronization between the live cookie jar and the vault.
//!
//! The live jar is volatile across process and container lifecycle events,
//! so the vault is treated as the source of truth. On startup the
//! synchronizer migrates any legacy artifact, restores the persisted archive
//! into the jar, and from then on coalesces jar-change notifications into
//! debounced background writes. Lookups for the request-signing path read
//! the jar directly.
//!
//! All mutable synchronizer state (the debounce deadline) lives on a single
//! actor task fed by a command channel; the restore guard is an atomic flag
//! checked before a notification ever reaches the channel. Vault and legacy
//! file I/O runs on the blocking pool, never on the thread delivering jar
//! notifications.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::cookie::{self, ArchiveError, CookieRecord};
use crate::jar::CookieJar;
use crate::migrate;
use crate::policy;
use crate::vault::{CredentialVault, VaultError};

/// Default quiescence window between a jar change and the backup write.
/// Tunable; affects write volume, not correctness.
const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(3);

/// Errors surfaced by synchronizer operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Vault operation failed.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Archive encoding failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The synchronizer task or a blocking worker is gone.
    #[error("session synchronizer worker is no longer running")]
    WorkerGone,
}

/// Result of an explicit or debounced backup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The filtered cookie set was written to the vault.
    Saved {
        /// Number of cookies in the written archive.
        cookies: usize,
    },
    /// No valid auth cookies were visible; nothing was written so a
    /// previously-good session is never clobbered by an empty one.
    SkippedEmpty,
    /// Restore was still running; the backup was not performed.
    SkippedRestoring,
}

/// Configuration for a [`SessionSynchronizer`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiescence window for coalescing jar-change notifications.
    pub debounce: Duration,
    /// Request domains whose cookies are persisted: the service's own
    /// domain and its auth-cookie-bearing parent. A jar record is kept when
    /// its cookie domain matches any of these.
    pub sync_domains: Vec<String>,
    /// Location of the legacy plaintext cookie file, if migration applies.
    pub legacy_store: Option<PathBuf>,
    /// Diagnostics mode: keep the legacy artifact on disk after migration.
    pub preserve_legacy: bool,
    /// Diagnostics mode: mirror every written archive blob to this path for
    /// offline tooling. Write-only; never read back.
    pub mirror_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            sync_domains: vec![
                "music.youtube.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            legacy_store: None,
            preserve_legacy: false,
            mirror_path: None,
        }
    }
}

enum Command {
    JarChanged,
    BackupNow(oneshot::Sender<Result<BackupOutcome, SyncError>>),
    SignOut(oneshot::Sender<Result<(), SyncError>>),
}

struct Shared {
    jar: Arc<dyn CookieJar>,
    vault: Arc<dyn CredentialVault>,
    config: SyncConfig,
    restore_in_progress: AtomicBool,
    initialized: AtomicBool,
}

/// Keeps the live jar and the vault in sync and answers auth lookups.
///
/// Cheap to clone; all clones address the same actor task. Construct with
/// [`SessionSynchronizer::new`], then call
/// [`initialize`](SessionSynchronizer::initialize) once during startup.
#[derive(Clone)]
pub struct SessionSynchronizer {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionSynchronizer {
    /// Creates the synchronizer and spawns its owning task.
    ///
    /// The synchronizer starts with restore pending: jar-change
    /// notifications are dropped until [`initialize`] completes, so a
    /// half-installed restore can never be read back and persisted.
    ///
    /// [`initialize`]: SessionSynchronizer::initialize
    #[must_use]
    pub fn new(
        jar: Arc<dyn CookieJar>,
        vault: Arc<dyn CredentialVault>,
        config: SyncConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            jar,
            vault,
            config,
            restore_in_progress: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
        });

        tokio::spawn(run_actor(Arc::clone(&shared), rx));

        Self { shared, tx }
    }

    /// Runs the startup sequence: legacy migration, then restore of the
    /// persisted archive into the live jar.
    ///
    /// Every failure path is non-fatal and logged; the worst outcome is that
    /// the user appears signed out and re-authenticates through the normal
    /// login flow. A second call is a logged no-op.
    #[instrument(level = "debug", skip(self))]
    pub async fn initialize(&self) {
        if self.shared.initialized.swap(true, Ordering::SeqCst) {
            warn!("session synchronizer already initialized, ignoring duplicate call");
            return;
        }

        if let Some(legacy_path) = self.shared.config.legacy_store.clone() {
            let vault = Arc::clone(&self.shared.vault);
            let preserve = self.shared.config.preserve_legacy;
            let now = policy::unix_now();
            let outcome = tokio::task::spawn_blocking(move || {
                migrate::migrate(vault.as_ref(), &legacy_path, preserve, now)
            })
            .await;
            match outcome {
                Ok(outcome) => debug!(?outcome, "legacy migration finished"),
                Err(join_error) => warn!(error = %join_error, "legacy migration worker failed"),
            }
        }

        self.restore().await;
        self.shared.restore_in_progress.store(false, Ordering::SeqCst);
    }

    /// Delivers a jar-change notification.
    ///
    /// The embedder calls this from the web surface's cookie-change hook.
    /// Notifications during restore are ignored entirely; afterwards each
    /// one re-arms the debounce window.
    pub fn notify_jar_changed(&self) {
        if self.shared.restore_in_progress.load(Ordering::SeqCst) {
            trace!("jar change during restore, ignoring");
            return;
        }
        if self.tx.send(Command::JarChanged).is_err() {
            debug!("synchronizer task is gone, dropping jar change");
        }
    }

    /// Performs a backup immediately, without waiting for quiescence.
    ///
    /// Used right after the login flow reports success, closing the race
    /// between "user just signed in" and "process killed before the
    /// debounce fires".
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the vault write fails or the synchronizer
    /// task is gone.
    pub async fn backup_now(&self) -> Result<BackupOutcome, SyncError> {
        let (ack, response) = oneshot::channel();
        self.tx
            .send(Command::BackupNow(ack))
            .map_err(|_| SyncError::WorkerGone)?;
        response.await.map_err(|_| SyncError::WorkerGone)?
    }

    /// Deletes the persisted session and cancels any pending backup.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the vault delete fails or the
    /// synchronizer task is gone.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        let (ack, response) = oneshot::channel();
        self.tx
            .send(Command::SignOut(ack))
            .map_err(|_| SyncError::WorkerGone)?;
        response.await.map_err(|_| SyncError::WorkerGone)?
    }

    /// Returns the signing secret visible to requests against `domain`.
    #[must_use]
    pub fn get_auth_secret(&self, domain: &str) -> Option<String> {
        let records = self.cookies_for_domain(domain);
        policy::select_auth_secret(&records, policy::unix_now()).map(ToString::to_string)
    }

    /// Builds the `Cookie` header value for requests against `domain`.
    ///
    /// Records are joined as `name=value` pairs in jar order; `None` when
    /// no cookie matches.
    #[must_use]
    pub fn build_cookie_header(&self, domain: &str) -> Option<String> {
        let records = self.cookies_for_domain(domain);
        if records.is_empty() {
            return None;
        }
        Some(
            records
                .iter()
                .map(|record| format!("{}={}", record.name, record.value()))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn cookies_for_domain(&self, domain: &str) -> Vec<CookieRecord> {
        self.shared
            .jar
            .all_cookies()
            .into_iter()
            .filter(|record| policy::matches_domain(&record.domain, domain))
            .collect()
    }

    async fn restore(&self) {
        let vault = Arc::clone(&self.shared.vault);
        let loaded = tokio::task::spawn_blocking(move || vault.load()).await;

        let blob = match loaded {
            Err(join_error) => {
                warn!(error = %join_error, "vault worker failed during restore");
                return;
            }
            Ok(Err(vault_error)) => {
                warn!(
                    error = %vault_error,
                    "vault not readable, starting without a persisted session"
                );
                return;
            }
            Ok(Ok(None)) => {
                info!("no persisted session in the vault");
                return;
            }
            Ok(Ok(Some(blob))) => blob,
        };

        let records = match cookie::archive::decode(&blob) {
            Ok(records) => records,
            Err(decode_error) => {
                // The vault is expected to be robust; a corrupt entry is
                // treated as absent but never auto-deleted.
                error!(
                    error = %decode_error,
                    "persisted session failed to decode, leaving vault entry in place"
                );
                return;
            }
        };

        if records.is_empty() {
            debug!("persisted archive held no records");
            return;
        }

        let count = records.len();
        for record in records {
            self.shared.jar.set_cookie(record);
        }

        // Read the jar back: restore only counts if an auth cookie is
        // actually visible now.
        let now = policy::unix_now();
        let visible = self
            .shared
            .jar
            .all_cookies()
            .iter()
            .any(|record| policy::is_valid_auth_cookie(record, now));
        if visible {
            info!(cookies = count, "restored persisted session into the live jar");
        } else {
            warn!(
                cookies = count,
                "restore installed records but no valid auth cookie is visible, user may need to sign in"
            );
        }
    }
}

async fn run_actor(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut deadline: Option<Instant> = None;

    loop {
        // Copies the current deadline; the block is rebuilt each iteration.
        let backup_timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            command = rx.recv() => match command {
                None => break,
                Some(Command::JarChanged) => {
                    if shared.restore_in_progress.load(Ordering::SeqCst) {
                        trace!("jar change raced restore completion, ignoring");
                        continue;
                    }
                    // Re-arming the deadline is the debounce cancellation:
                    // only a full quiescence window triggers a write.
                    deadline = Some(Instant::now() + shared.config.debounce);
                    trace!("jar changed, debounce window re-armed");
                }
                Some(Command::BackupNow(ack)) => {
                    deadline = None;
                    let result = perform_backup(&shared).await;
                    let _ = ack.send(result);
                }
                Some(Command::SignOut(ack)) => {
                    deadline = None;
                    let result = perform_sign_out(&shared).await;
                    let _ = ack.send(result);
                }
            },
            () = backup_timer => {
                deadline = None;
                match perform_backup(&shared).await {
                    Ok(outcome) => debug!(?outcome, "debounced backup finished"),
                    Err(backup_error) => {
                        warn!(error = %backup_error, "debounced backup failed");
                    }
                }
            }
        }
    }

    debug!("session synchronizer task stopped");
}

async fn perform_backup(shared: &Arc<Shared>) -> Result<BackupOutcome, SyncError> {
    if shared.restore_in_progress.load(Ordering::SeqCst) {
        debug!("backup requested during restore, skipping");
        return Ok(BackupOutcome::SkippedRestoring);
    }

    let now = policy::unix_now();
    let relevant = shared
        .jar
        .all_cookies()
        .into_iter()
        .filter(|record| {
            shared
                .config
                .sync_domains
                .iter()
                .any(|domain| policy::matches_domain(&record.domain, domain))
        })
        .filter(|record| policy::is_valid_auth_cookie(record, now))
        .collect::<Vec<_>>();

    if relevant.is_empty() {
        // Absence of fresh auth cookies does not mean the user signed out;
        // the notification may have fired for an unrelated site.
        debug!("no valid auth cookies in the jar, skipping vault write");
        return Ok(BackupOutcome::SkippedEmpty);
    }

    let count = relevant.len();
    let Some(blob) = cookie::archive::encode(&relevant)? else {
        return Ok(BackupOutcome::SkippedEmpty);
    };

    let vault = Arc::clone(&shared.vault);
    let mirror_path = shared.config.mirror_path.clone();
    tokio::task::spawn_blocking(move || {
        vault.save(&blob)?;
        if let Some(mirror_path) = mirror_path {
            if let Err(mirror_error) = std::fs::write(&mirror_path, &blob) {
                warn!(
                    error = %mirror_error,
                    path = %mirror_path.display(),
                    "failed to write diagnostics mirror"
                );
            }
        }
        Ok::<(), SyncError>(())
    })
    .await
    .map_err(|_| SyncError::WorkerGone)??;

    info!(cookies = count, "persisted session cookies to the vault");
    Ok(BackupOutcome::Saved { cookies: count })
}

async fn perform_sign_out(shared: &Arc<Shared>) -> Result<(), SyncError> {
    let vault = Arc::clone(&shared.vault);
    tokio::task::spawn_blocking(move || vault.delete())
        .await
        .map_err(|_| SyncError::WorkerGone)??;
    info!("deleted persisted session from the vault");
    Ok(())
}
