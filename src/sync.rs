//! Sync scheduler: forced/periodic re-synchronization of all sources with
//! per-source rate limiting and an all-settle fan-out. One failing source
//! lands in `errors[]`, the rest keep going.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::error::EngineResult;
use crate::fetch::ArticleFetcher;
use crate::model::Source;
use crate::sources::SourceRegistry;
use crate::store::SqliteStore;

/// Default per-source refresh interval when the caller does not pass one.
const DEFAULT_MAX_AGE_MINUTES: u64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncOptions {
    /// Sync even when a source was refreshed within `max_age`.
    #[serde(default)]
    pub force: bool,
    /// Restrict the sync to these source names.
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    /// Maximum age in minutes before a source is refreshed again.
    #[serde(default)]
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncResult {
    pub success: bool,
    pub sources_processed: usize,
    pub news_added: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub last_sync_times: HashMap<String, DateTime<Utc>>,
    pub total_sources: usize,
    pub active_sources: usize,
}

pub struct SyncService {
    store: SqliteStore,
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn ArticleFetcher>,
    last_sync: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SyncService {
    pub fn new(
        store: SqliteStore,
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn ArticleFetcher>,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
            last_sync: Mutex::new(HashMap::new()),
        }
    }

    /// Run one sync pass. Eligible sources fetch and persist in parallel;
    /// every outcome is collected (all-settle), a failing source appends to
    /// `errors` without aborting its siblings, and `last_sync` advances only
    /// for sources that completed successfully.
    pub async fn sync_news(&self, options: SyncOptions) -> EngineResult<SyncResult> {
        let started = Instant::now();
        let now = Utc::now();
        let max_age_minutes = options.max_age.unwrap_or(DEFAULT_MAX_AGE_MINUTES);

        let mut sources = self.registry.active_sources().await?;
        if let Some(names) = &options.sources {
            sources.retain(|s| names.iter().any(|n| n == &s.name));
        }
        sources.retain(|s| options.force || self.is_due(&s.id, now, max_age_minutes));

        let outcomes = join_all(sources.iter().map(|s| self.sync_source(s))).await;

        let mut result = SyncResult {
            success: true,
            sources_processed: 0,
            news_added: 0,
            errors: Vec::new(),
            duration_ms: 0,
        };

        for (source, outcome) in sources.iter().zip(outcomes) {
            match outcome {
                Ok(added) => {
                    result.sources_processed += 1;
                    result.news_added += added;
                    self.mark_synced(&source.id, Utc::now());
                    let _ = self.store.touch_source(&source.id, Utc::now());
                    tracing::info!(source = %source.name, added, "source sync complete");
                }
                Err(e) => {
                    result.errors.push(format!("{}: {e}", source.name));
                    counter!("sync_source_errors_total").increment(1);
                    tracing::warn!(source = %source.name, error = %e, "source sync failed");
                }
            }
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        counter!("sync_runs_total").increment(1);
        gauge!("sync_last_run_ts").set(now.timestamp() as f64);
        tracing::info!(
            processed = result.sources_processed,
            added = result.news_added,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "sync pass complete"
        );
        Ok(result)
    }

    /// Last successful sync time per source plus registry counts.
    pub async fn sync_status(&self) -> EngineResult<SyncStatus> {
        let sources = self.registry.list_sources(false).await?;
        let active = sources.iter().filter(|s| s.is_active).count();
        let last_sync_times = self
            .last_sync
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default();
        Ok(SyncStatus {
            last_sync_times,
            total_sources: sources.len(),
            active_sources: active,
        })
    }

    /// Retention cleanup passthrough. Failures are logged and reported as
    /// zero deletions, matching the scheduler's never-fatal posture.
    pub fn cleanup_old_data(&self, days_old: u32) -> u64 {
        match self.store.cleanup_older_than(days_old) {
            Ok(deleted) => {
                tracing::info!(days_old, deleted, "retention cleanup complete");
                deleted
            }
            Err(e) => {
                tracing::error!(days_old, error = %e, "retention cleanup failed");
                0
            }
        }
    }

    /// One immediate sync, then a fixed-interval loop until the handle is
    /// aborted at shutdown. Tick errors are logged, never fatal.
    pub fn start_periodic_sync(self: Arc<Self>, interval_minutes: u64) -> JoinHandle<()> {
        tracing::info!(interval_minutes, "starting periodic sync");
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_minutes * 60));
            loop {
                ticker.tick().await;
                if let Err(e) = self.sync_news(SyncOptions::default()).await {
                    tracing::error!(error = %e, "periodic sync failed");
                }
            }
        })
    }

    async fn sync_source(&self, source: &Source) -> Result<usize, String> {
        let items = self
            .fetcher
            .fetch(source)
            .await
            .map_err(|e| e.to_string())?;
        if items.is_empty() {
            tracing::debug!(source = %source.name, "no new content");
            return Ok(0);
        }
        let outcome = self
            .store
            .save_articles(&items)
            .map_err(|e| e.to_string())?;
        Ok(outcome.inserted)
    }

    fn is_due(&self, source_id: &str, now: DateTime<Utc>, max_age_minutes: u64) -> bool {
        let last = self
            .last_sync
            .lock()
            .ok()
            .and_then(|m| m.get(source_id).copied());
        match last {
            // Never synced before.
            None => true,
            Some(at) => now - at >= chrono::Duration::minutes(max_age_minutes as i64),
        }
    }

    fn mark_synced(&self, source_id: &str, at: DateTime<Utc>) {
        if let Ok(mut m) = self.last_sync.lock() {
            m.insert(source_id.to_string(), at);
        }
    }
}
