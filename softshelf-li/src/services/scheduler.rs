//! Unattended scan scheduling
//!
//! The one caller that composes the pipeline end to end: scan every
//! configured path, reconcile, auto-match the fresh `scanned` backlog, and
//! record the run. Explicit lifecycle (start/stop via cancellation token),
//! injectable clock, and status reporting; no global state.
//!
//! The cron dispatch mechanism itself is an external concern; the trigger
//! here is a fixed interval derived from configuration.

use crate::config::ExclusionRules;
use crate::db::{ledger, scan_history};
use crate::models::summary::{MatchSummary, ScanSummary};
use crate::services::auto_matcher::{AutoMatcher, MatchOptions};
use crate::services::scanner::Scanner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use softshelf_common::events::{EventBus, ShelfEvent};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Roots scanned on every tick
    pub scan_paths: Vec<PathBuf>,
    /// Time between ticks
    pub interval: Duration,
    /// Whether the auto-matcher runs after scanning
    pub auto_match: bool,
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub scan: ScanSummary,
    pub matching: MatchSummary,
}

/// Point-in-time scheduler status for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub interval_secs: u64,
    pub scan_paths: Vec<PathBuf>,
    pub auto_match: bool,
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_run_report: Option<RunReport>,
}

/// Injectable time source so tests control the recorded run times.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Default)]
struct SchedulerState {
    is_running: bool,
    last_run_time: Option<DateTime<Utc>>,
    last_run_report: Option<RunReport>,
    cancel: Option<CancellationToken>,
}

/// Periodic scan-and-match driver.
pub struct IngestScheduler {
    db: SqlitePool,
    scanner: Scanner,
    matcher: AutoMatcher,
    events: EventBus,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    state: Arc<RwLock<SchedulerState>>,
}

impl IngestScheduler {
    pub fn new(
        db: SqlitePool,
        rules: ExclusionRules,
        matcher: AutoMatcher,
        events: EventBus,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            scanner: Scanner::new(db.clone(), rules),
            db,
            matcher,
            events,
            config,
            clock: Arc::new(SystemClock),
            state: Arc::new(RwLock::new(SchedulerState::default())),
        }
    }

    /// Replace the time source (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one full scan-and-match cycle now.
    pub async fn run_once(&self, scan_type: &str) -> RunReport {
        tracing::info!(scan_type = %scan_type, "Starting scheduled run");

        let history_id = scan_history::start(
            &self.db,
            scan_type,
            &self.config.scan_paths,
            self.config.auto_match,
        )
        .await
        .ok();

        let mut scan = ScanSummary::default();
        for path in &self.config.scan_paths {
            match self.scanner.scan(path).await {
                Ok(summary) => scan.absorb(summary),
                Err(e) => {
                    let message = format!("Failed to scan {}: {}", path.display(), e);
                    tracing::error!(path = %path.display(), error = %e, "Scan path failed");
                    scan.errors.push(message);
                }
            }
        }

        let matching = if self.config.auto_match {
            match ledger::list_unresolved_scanned(&self.db).await {
                Ok(entries) if !entries.is_empty() => {
                    self.matcher
                        .match_entries(entries, &MatchOptions::default())
                        .await
                }
                Ok(_) => MatchSummary::default(),
                Err(e) => {
                    let mut summary = MatchSummary::default();
                    summary.errors.push(format!("Backlog query failed: {}", e));
                    summary
                }
            }
        } else {
            MatchSummary::default()
        };

        let report = RunReport { scan, matching };

        if let Some(id) = history_id {
            let status = if report.scan.errors.is_empty() && report.matching.errors.is_empty() {
                "completed"
            } else {
                "completed_with_errors"
            };
            scan_history::finish(&self.db, id, &report.scan, &report.matching, status, None)
                .await
                .ok();
        }

        self.events
            .emit(ShelfEvent::ScanCompleted {
                new_entries: report.scan.new_products,
                deleted_versions: report.scan.deleted_versions,
                deleted_products: report.scan.deleted_products,
                error_count: report.scan.errors.len() + report.matching.errors.len(),
                timestamp: self.clock.now(),
            })
            .ok();

        let mut state = self.state.write().await;
        state.last_run_time = Some(self.clock.now());
        state.last_run_report = Some(report.clone());
        drop(state);

        tracing::info!(
            new_entries = report.scan.new_products,
            matched = report.matching.matched,
            queued = report.matching.queued_for_review,
            errors = report.scan.errors.len() + report.matching.errors.len(),
            "Scheduled run complete"
        );

        report
    }

    /// Start the periodic loop. Returns immediately; the loop runs until
    /// [`stop`](Self::stop) is called.
    pub async fn start(self: &Arc<Self>) {
        let mut state = self.state.write().await;
        if state.is_running {
            tracing::warn!("Scheduler already running");
            return;
        }
        let token = CancellationToken::new();
        state.is_running = true;
        state.cancel = Some(token.clone());
        drop(state);

        let scheduler = Arc::clone(self);
        let interval = self.config.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        scheduler.run_once("scheduled").await;
                    }
                }
            }
            let mut state = scheduler.state.write().await;
            state.is_running = false;
            state.cancel = None;
            tracing::info!("Scheduler stopped");
        });

        tracing::info!(
            interval_secs = interval.as_secs(),
            paths = self.config.scan_paths.len(),
            auto_match = self.config.auto_match,
            "Scheduler started"
        );
    }

    /// Stop the periodic loop.
    pub async fn stop(&self) {
        let state = self.state.read().await;
        if let Some(token) = &state.cancel {
            token.cancel();
        }
    }

    /// Current status snapshot.
    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.read().await;
        SchedulerStatus {
            is_running: state.is_running,
            interval_secs: self.config.interval.as_secs(),
            scan_paths: self.config.scan_paths.clone(),
            auto_match: self.config.auto_match,
            last_run_time: state.last_run_time,
            last_run_report: state.last_run_report.clone(),
        }
    }
}
