//! Converging an install root onto the server's desired state
//!
//! A pass fetches the desired state, uninstalls every cached packet that is
//! no longer wanted, then installs every wanted packet that is not cached.
//! Uninstalling first keeps two variants of the same app from holding the
//! same ports or service names at once.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError};
use std::time::Duration;

use fleetpack_api::{DesiredState, Labels};
use fleetpack_packet::{Packet, hash_bytes};
use fleetpack_pkg::Installer;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{self, PacketCache};
use crate::error::{AgentError, Result};
use crate::source::PacketSource;

/// A per-packet failure that did not stop the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Hash of the packet being applied or removed
    pub hash: String,
    /// Rendered error
    pub error: String,
}

/// What a single pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Hashes installed and cached
    pub installed: Vec<String>,
    /// Hashes uninstalled and dropped from the cache
    pub uninstalled: Vec<String>,
    /// Unwanted hashes kept because their app failed to resolve
    pub kept: Vec<String>,
    /// Per-item failures, in the order they happened
    pub failed: Vec<ItemFailure>,
}

impl PassReport {
    /// Whether the pass changed nothing on disk
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.installed.is_empty() && self.uninstalled.is_empty() && self.failed.is_empty()
    }

    /// Whether every item succeeded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, hash: &str, err: &AgentError) {
        self.failed.push(ItemFailure {
            hash: hash.to_string(),
            error: err.to_string(),
        });
    }
}

/// Reconciles one install root against a packet source
pub struct Reconciler {
    source: Arc<dyn PacketSource>,
    installer: Arc<dyn Installer>,
    cache: PacketCache,
    root: PathBuf,
    labels: Labels,
    /// Held for the whole pass so two passes never apply to the root at once.
    /// Shared by every reconciler in the process that targets the same root.
    pass_lock: Arc<Mutex<()>>,
}

/// The pass lock for an install root, keyed by its absolute path
fn root_lock(root: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let key = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let mut locks = LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn PacketSource>,
        installer: Arc<dyn Installer>,
        cache: PacketCache,
        root: impl Into<PathBuf>,
        labels: Labels,
    ) -> Self {
        let root = root.into();
        Self {
            pass_lock: root_lock(&root),
            source,
            installer,
            cache,
            root,
            labels,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Run one fetch, uninstall, install pass
    ///
    /// Per-packet failures are logged and collected in the report; the pass
    /// carries on with the next packet.
    ///
    /// # Errors
    /// Returns an error only when the desired state cannot be fetched or the
    /// cache cannot be listed. Nothing is applied in that case.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn run_once(&self) -> Result<PassReport> {
        let _guard = self.pass_lock.lock().await;

        let desired = self.source.desired_state(&self.labels).await?;
        if desired.is_partial() {
            for err in &desired.errors {
                warn!(app = %err.app, message = %err.message, "app did not resolve");
            }
        }

        let mut report = PassReport::default();
        self.uninstall_pass(&desired, &mut report).await?;
        self.install_pass(&desired, &mut report).await;

        if report.is_noop() {
            debug!("installed packets already match desired state");
        } else {
            info!(
                installed = report.installed.len(),
                uninstalled = report.uninstalled.len(),
                failed = report.failed.len(),
                "reconciliation pass finished"
            );
        }
        Ok(report)
    }

    /// Run passes every `interval` until `shutdown` resolves
    ///
    /// The first pass starts immediately. A failed pass is logged and the
    /// loop waits for the next tick.
    pub async fn run_until(&self, interval: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("reconciliation loop stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "reconciliation pass failed");
                    }
                }
            }
        }
    }

    async fn uninstall_pass(&self, desired: &DesiredState, report: &mut PassReport) -> Result<()> {
        let wanted = desired.hashes();
        let unresolved = desired.unresolved_names();

        for hash in self.cache.hashes().await? {
            if wanted.contains(hash.as_str()) {
                continue;
            }

            let packet = match self.cache.load(&hash).await {
                Ok(packet) => packet,
                Err(e) => {
                    // Cannot be uninstalled without its payload listing
                    error!(hash = %hash, error = %e, "dropping unreadable cached packet");
                    report.fail(&hash, &e);
                    if let Err(e) = self.cache.remove(&hash).await {
                        error!(hash = %hash, error = %e, "failed to drop cached packet");
                    }
                    continue;
                }
            };

            if unresolved.contains(packet.name.as_str()) {
                info!(
                    name = %packet.name,
                    hash = %hash,
                    "keeping packet while its app does not resolve"
                );
                report.kept.push(hash);
                continue;
            }

            match self.uninstall_one(&packet, &hash).await {
                Ok(()) => {
                    info!(name = %packet.name, hash = %hash, "uninstalled packet");
                    report.uninstalled.push(hash);
                }
                Err(e) => {
                    error!(name = %packet.name, hash = %hash, error = %e, "uninstall failed");
                    report.fail(&hash, &e);
                }
            }
        }

        Ok(())
    }

    async fn install_pass(&self, desired: &DesiredState, report: &mut PassReport) {
        let mut seen = BTreeSet::new();

        for app in &desired.apps {
            if !seen.insert(app.hash.as_str()) || self.cache.contains(&app.hash).await {
                continue;
            }

            match self.install_one(&app.hash).await {
                Ok(()) => {
                    info!(name = %app.name, hash = %app.hash, "installed packet");
                    report.installed.push(app.hash.clone());
                }
                Err(e) => {
                    error!(name = %app.name, hash = %app.hash, error = %e, "install failed");
                    report.fail(&app.hash, &e);
                }
            }
        }
    }

    /// Uninstall one packet, then drop it from the cache
    ///
    /// The cache entry outlives a failed uninstall, so it is retried on the
    /// next pass.
    async fn uninstall_one(&self, packet: &Packet, hash: &str) -> Result<()> {
        self.installer.uninstall(packet, &self.root).await?;
        self.cache.remove(hash).await
    }

    /// Fetch, verify, install, then cache one packet
    ///
    /// The cache entry is written last, so a failed install is retried on
    /// the next pass.
    async fn install_one(&self, hash: &str) -> Result<()> {
        let bytes = self.source.packet_data(hash).await?;

        let actual = hash_bytes(&bytes);
        if actual != hash {
            return Err(AgentError::Integrity {
                expected: hash.to_string(),
                actual,
            });
        }

        let packet = cache::decode(bytes.clone()).await?;
        let applied = self.installer.install(&packet, &self.root).await?;
        debug!(hash = %hash, entries = applied.entries(), "payload applied");
        self.cache.store(hash, &bytes).await
    }
}
