use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

use super::error::FreshnessResult;
use super::refresher::{RefreshTarget, VectorRefresher};
use crate::store::{EntityStore, FreshnessQueue, QueueEntry, QueueKind, QueueReason};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_LEASE: Duration = Duration::from_secs(120);
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    pub batch_size: usize,
    /// How long a claimed entry stays invisible to other workers.
    pub lease: Duration,
    /// Pause between drain passes that found nothing to do.
    pub idle_sleep: Duration,
    /// Queues drained on each pass, in order.
    pub kinds: Vec<QueueKind>,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            lease: DEFAULT_LEASE,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            kinds: vec![QueueKind::Query, QueueKind::Item],
        }
    }
}

impl FreshnessConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        self.batch_size = batch_size;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<QueueKind>) -> Self {
        self.kinds = kinds;
        self
    }
}

/// Counts from one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub claimed: usize,
    pub refreshed: usize,
    /// Checksum unchanged; completed without re-embedding.
    pub unchanged: usize,
    /// Entity no longer exists; completed.
    pub missing: usize,
    /// Left in the queue for a later claim.
    pub failed: usize,
}

impl DrainReport {
    fn merge(&mut self, other: DrainReport) {
        self.claimed += other.claimed;
        self.refreshed += other.refreshed;
        self.unchanged += other.unchanged;
        self.missing += other.missing;
        self.failed += other.failed;
    }
}

enum EntryOutcome {
    Refreshed,
    Unchanged,
    Missing,
}

/// Drains the freshness queue.
///
/// Reads entities from an uncached store: the checksum comparison needs current rows.
pub struct FreshnessWorker {
    entities: Arc<dyn EntityStore>,
    queue: Arc<dyn FreshnessQueue>,
    refresher: Arc<dyn VectorRefresher>,
    config: FreshnessConfig,
    shutdown: Arc<AtomicBool>,
}

impl FreshnessWorker {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        queue: Arc<dyn FreshnessQueue>,
        refresher: Arc<dyn VectorRefresher>,
        config: FreshnessConfig,
    ) -> Self {
        Self {
            entities,
            queue,
            refresher,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &FreshnessConfig {
        &self.config
    }

    /// Asks a running loop to stop after its current pass.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Claims and processes one batch of `kind`.
    pub async fn drain_once(&self, kind: QueueKind) -> FreshnessResult<DrainReport> {
        let entries = self
            .queue
            .claim(kind, self.config.batch_size, self.config.lease)
            .await?;

        let mut report = DrainReport {
            claimed: entries.len(),
            ..Default::default()
        };

        for entry in &entries {
            match self.process(entry).await {
                Ok(EntryOutcome::Refreshed) => report.refreshed += 1,
                Ok(EntryOutcome::Unchanged) => report.unchanged += 1,
                Ok(EntryOutcome::Missing) => report.missing += 1,
                Err(e) => {
                    warn!(
                        entry_id = %entry.id,
                        kind = %entry.kind,
                        entity_id = %entry.entity_id,
                        error = %e,
                        "Freshness refresh failed; entry left for retry"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.claimed > 0 {
            debug!(kind = %kind, ?report, "Drained freshness batch");
        }
        Ok(report)
    }

    /// One pass over every configured queue.
    pub async fn drain_all(&self) -> FreshnessResult<DrainReport> {
        let mut total = DrainReport::default();
        for kind in &self.config.kinds {
            total.merge(self.drain_once(*kind).await?);
        }
        Ok(total)
    }

    /// Drains until [`shutdown`](Self::shutdown) is called, sleeping when a pass finds nothing.
    pub async fn run(&self) {
        info!(
            batch_size = self.config.batch_size,
            lease_secs = self.config.lease.as_secs(),
            "Freshness worker started"
        );

        while !self.is_shutdown() {
            let idle = match self.drain_all().await {
                Ok(report) => report.claimed == 0,
                Err(e) => {
                    warn!(error = %e, "Freshness drain pass failed");
                    true
                }
            };
            if idle && !self.is_shutdown() {
                time::sleep(self.config.idle_sleep).await;
            }
        }

        info!("Freshness worker stopped");
    }

    /// Spawns [`run`](Self::run) on the runtime.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn process(&self, entry: &QueueEntry) -> FreshnessResult<EntryOutcome> {
        let Some(target) = self.load(entry).await? else {
            self.queue.complete(entry).await?;
            return Ok(EntryOutcome::Missing);
        };

        // Manual entries force a rebuild even when the text is unchanged.
        if entry.reason != QueueReason::Manual && target.is_unchanged() {
            self.queue.complete(entry).await?;
            return Ok(EntryOutcome::Unchanged);
        }

        self.refresher.refresh(&target).await?;
        self.queue
            .record_checksum(entry.kind, target.id(), &target.current_checksum())
            .await?;
        self.queue.complete(entry).await?;
        Ok(EntryOutcome::Refreshed)
    }

    async fn load(&self, entry: &QueueEntry) -> FreshnessResult<Option<RefreshTarget>> {
        Ok(match entry.kind {
            QueueKind::Query => self
                .entities
                .profile(&entry.entity_id)
                .await?
                .map(RefreshTarget::Profile),
            QueueKind::Item => self
                .entities
                .postings(std::slice::from_ref(&entry.entity_id))
                .await?
                .into_iter()
                .next()
                .map(RefreshTarget::Posting),
        })
    }
}
