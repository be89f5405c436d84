//! Batch progress tracker
//!
//! One tracker instance owns one submission batch: the token/row registry,
//! the per-file state machine, and the `completed` set all live on the
//! instance, so concurrent batches cannot interfere. The poll loop is a
//! single cooperative task; each tick issues one combined progress request
//! for the entire batch, and a tick that fires while the previous request
//! is still in flight is skipped, so at most one request is ever
//! outstanding.

pub mod patch;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use vfp_common::api::{ProgressResponse, Token};
use vfp_common::{Error, Result};

use crate::client::ValidationBackend;

pub use patch::{RowPatch, TerminalCells};

const PROGRESS_FAILED: i32 = -2;
const PROGRESS_DONE: i32 = 100;

/// Per-file state machine
///
/// `Queued` and `Running` are non-terminal; `Complete` and `Failed` are
/// terminal and no further update applies once either is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Waiting for a validation worker (progress -1)
    Queued,
    /// Being validated (0 <= progress < 100)
    Running(u8),
    /// Finished successfully (progress 100)
    Complete,
    /// Terminated with an internal error (progress -2)
    Failed,
}

impl FileState {
    pub fn from_progress(value: i32) -> FileState {
        match value {
            PROGRESS_FAILED => FileState::Failed,
            v if v < 0 => FileState::Queued,
            v if v >= PROGRESS_DONE => FileState::Complete,
            v => FileState::Running(v as u8),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Complete | FileState::Failed)
    }
}

/// One row registration: a submission token and the caller's row identity
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub token: Token,
    pub row_id: u64,
}

/// Tuning knobs for the poll loop
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Base poll period
    pub poll_interval: Duration,
    /// Consecutive transport failures before the period starts doubling
    pub backoff_threshold: u32,
    /// Cap on the backoff multiplier
    pub backoff_cap: u32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            backoff_threshold: 5,
            backoff_cap: 8,
        }
    }
}

struct RowEntry {
    token: Token,
    row_id: u64,
    state: FileState,
}

/// Cooperative cancellation handle for one tracker
#[derive(Debug, Clone)]
pub struct StopHandle {
    live: Arc<AtomicBool>,
}

impl StopHandle {
    /// Lower the liveness flag. The loop observes it at the top of its next
    /// tick; an in-flight request is allowed to complete and its result is
    /// discarded.
    pub fn stop(&self) {
        if self.live.swap(false, Ordering::Relaxed) {
            debug!("Batch tracker stop requested");
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }
}

/// Tracks one batch of submitted files until every file is terminal
pub struct BatchTracker<B: ?Sized> {
    backend: Arc<B>,
    rows: Vec<RowEntry>,
    /// Rows already finalized; membership here is what makes finalize
    /// at-most-once per token
    completed: HashSet<Token>,
    patches: mpsc::UnboundedSender<RowPatch>,
    live: Arc<AtomicBool>,
    options: TrackerOptions,
    consecutive_failures: u32,
}

impl<B: ValidationBackend + ?Sized> BatchTracker<B> {
    /// Build the row registry for a batch. Tokens and row ids must be
    /// unique within the batch.
    pub fn new(
        backend: Arc<B>,
        batch: Vec<BatchRow>,
        patches: mpsc::UnboundedSender<RowPatch>,
        options: TrackerOptions,
    ) -> Result<(Self, StopHandle)> {
        if batch.is_empty() {
            return Err(Error::InvalidInput("empty batch".to_string()));
        }

        let mut seen_tokens = HashSet::new();
        let mut seen_rows = HashSet::new();
        for row in &batch {
            if !seen_tokens.insert(row.token.clone()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate token in batch: {}",
                    row.token
                )));
            }
            if !seen_rows.insert(row.row_id) {
                return Err(Error::InvalidInput(format!(
                    "duplicate row id in batch: {}",
                    row.row_id
                )));
            }
        }

        let live = Arc::new(AtomicBool::new(true));
        let handle = StopHandle { live: live.clone() };

        let rows = batch
            .into_iter()
            .map(|row| RowEntry {
                token: row.token,
                row_id: row.row_id,
                state: FileState::Queued,
            })
            .collect();

        Ok((
            Self {
                backend,
                rows,
                completed: HashSet::new(),
                patches,
                live,
                options,
                consecutive_failures: 0,
            },
            handle,
        ))
    }

    /// Run the poll loop until every file is terminal or the stop handle
    /// is used. The first poll is issued immediately.
    pub async fn run(mut self) {
        let base = self.options.poll_interval;
        let mut period = base;
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(files = self.rows.len(), "Batch tracker started");

        loop {
            ticker.tick().await;

            // Liveness check at the top of every tick
            if !self.live.load(Ordering::Relaxed) {
                debug!("Batch tracker stopped before completion");
                break;
            }

            match self.poll_once().await {
                Ok(()) => {
                    if self.consecutive_failures > 0 {
                        self.consecutive_failures = 0;
                        if period != base {
                            period = base;
                            ticker = interval_at(Instant::now() + period, period);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        }
                    }
                }
                Err(e) => {
                    // Transient failure: retried on the next tick, with the
                    // period doubling once failures persist
                    self.consecutive_failures += 1;
                    warn!(
                        error = %e,
                        consecutive_failures = self.consecutive_failures,
                        "Progress poll failed"
                    );
                    let next = self.backoff_period(base);
                    if next != period {
                        period = next;
                        ticker = interval_at(Instant::now() + period, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    }
                }
            }

            if self.all_terminal() {
                info!("All files terminal, batch tracker finished");
                break;
            }
        }
    }

    /// Issue one combined progress request and apply the response.
    pub async fn poll_once(&mut self) -> Result<()> {
        let tokens: Vec<Token> = self.rows.iter().map(|row| row.token.clone()).collect();
        let response = self.backend.progress(&tokens).await?;

        // A response that raced a stop request is discarded
        if !self.live.load(Ordering::Relaxed) {
            return Ok(());
        }

        self.apply(&response).await;
        Ok(())
    }

    async fn apply(&mut self, response: &ProgressResponse) {
        if response.progress.len() < self.rows.len() {
            warn!(
                expected = self.rows.len(),
                received = response.progress.len(),
                "Progress array shorter than batch, trailing rows unchanged"
            );
        }

        for index in 0..self.rows.len().min(response.progress.len()) {
            if self.rows[index].state.is_terminal() {
                // Terminal states never change again
                continue;
            }

            let row_id = self.rows[index].row_id;
            let value = response.progress[index];

            // Metrics are best-effort and may move on every poll until the
            // file is terminal
            if let Some(metrics) = response.file_info.get(index) {
                self.send(RowPatch::metrics(row_id, metrics));
            }

            match FileState::from_progress(value) {
                FileState::Complete => {
                    let token = self.rows[index].token.clone();
                    if self.completed.insert(token) {
                        self.rows[index].state = FileState::Complete;
                        self.send(RowPatch::progress(row_id, PROGRESS_DONE));
                        self.finalize(index).await;
                    }
                }
                FileState::Failed => {
                    self.rows[index].state = FileState::Failed;
                    self.send(RowPatch::terminal_error(row_id));
                }
                state => {
                    self.rows[index].state = state;
                    self.send(RowPatch::progress(row_id, value));
                }
            }
        }
    }

    /// Fetch the finished file's summary and patch its terminal cells.
    /// A failed fetch leaves the row degraded; the file stays terminal and
    /// the fetch is not retried.
    async fn finalize(&mut self, index: usize) {
        let token = self.rows[index].token.clone();
        let row_id = self.rows[index].row_id;

        debug!(token = %token, "Finalizing completed file");

        match self.backend.summary(&token).await {
            Ok(summary) => {
                self.send(RowPatch::finalized(row_id, &summary, Utc::now()));
            }
            Err(e) => {
                warn!(token = %token, error = %e, "Summary fetch failed, row left degraded");
                self.send(RowPatch::FinalizeDegraded { row_id });
            }
        }
    }

    fn send(&self, patch: RowPatch) {
        if self.patches.send(patch).is_err() {
            // Receiver gone means the owning view was torn down
            self.live.store(false, Ordering::Relaxed);
        }
    }

    fn backoff_period(&self, base: Duration) -> Duration {
        if self.consecutive_failures < self.options.backoff_threshold {
            return base;
        }
        let doublings = self.consecutive_failures - self.options.backoff_threshold + 1;
        let multiplier = 2u32
            .saturating_pow(doublings.min(16))
            .min(self.options.backoff_cap);
        base * multiplier
    }

    fn all_terminal(&self) -> bool {
        self.rows.iter().all(|row| row.state.is_terminal())
    }

    /// Tokens already finalized (or about to be; insertion precedes the
    /// summary fetch)
    pub fn completed(&self) -> &HashSet<Token> {
        &self.completed
    }

    /// Current state of one token
    pub fn state_of(&self, token: &Token) -> Option<FileState> {
        self.rows
            .iter()
            .find(|row| &row.token == token)
            .map(|row| row.state)
    }
}
