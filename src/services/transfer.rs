//! Batch transfer orchestration
//!
//! Runs upload, move and delete batches against a `RemoteStore`, one item at
//! a time. The orchestrator owns the live `BatchState`; callers observe it
//! through the progress callback and stop it through the cancellation token
//! they pass in. Per-item failures are counted, never raised: once the loop
//! has started the caller always gets a `BatchSummary`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::RemoteStore;
use crate::logic::errors::{BatchError, StoreError};
use crate::logic::formatting::format_speed;
use crate::model::types::{BatchItem, UploadItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Upload,
    Move,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Idle,
    Running,
    /// Cancellation observed; the loop is winding down
    Cancelling,
    Completed,
}

/// Live state of the current (or last) batch
#[derive(Debug, Clone)]
pub struct BatchState {
    pub kind: Option<BatchKind>,
    pub status: BatchStatus,
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    /// Capped at 99 while items remain; tracks the byte (or item) ratio
    pub percent: u8,
    pub started_at: Instant,
    pub cancel_requested: bool,
    /// Source path of the item in flight
    pub current_item: Option<String>,
}

impl BatchState {
    fn idle() -> Self {
        Self {
            kind: None,
            status: BatchStatus::Idle,
            total_items: 0,
            completed_items: 0,
            failed_items: 0,
            total_bytes: 0,
            transferred_bytes: 0,
            percent: 0,
            started_at: Instant::now(),
            cancel_requested: false,
            current_item: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Items that have settled, successfully or not
    pub fn attempted_items(&self) -> usize {
        self.completed_items + self.failed_items
    }

    /// Average throughput since the batch started
    pub fn speed_bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.transferred_bytes as f64 / secs
    }

    pub fn speed(&self) -> String {
        format_speed(self.speed_bytes_per_sec())
    }

    fn is_active(&self) -> bool {
        matches!(self.status, BatchStatus::Running | BatchStatus::Cancelling)
    }

    /// Percent while items remain in flight
    fn in_flight_percent(&self) -> u8 {
        let by_bytes = self.kind != Some(BatchKind::Delete) && self.total_bytes > 0;
        let raw = if by_bytes {
            ratio_percent(self.transferred_bytes, self.total_bytes)
        } else if self.total_items > 0 {
            ratio_percent(self.attempted_items() as u64, self.total_items as u64)
        } else {
            0
        };
        raw.min(99)
    }

    fn refresh_percent(&mut self) {
        let next = self.in_flight_percent();
        self.percent = match self.kind {
            // Authoritative move sizes may grow the total after the fact
            Some(BatchKind::Move) => self.percent.max(next),
            _ => next,
        };
    }
}

fn ratio_percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (100.0 * part as f64 / whole as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One failed item and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub source_path: String,
    pub error: StoreError,
}

/// Terminal report of a batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub kind: BatchKind,
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub percent: u8,
    pub cancelled: bool,
    pub failures: Vec<ItemFailure>,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Items never started because the batch was cancelled
    pub fn unattempted_items(&self) -> usize {
        self.total_items - self.completed_items - self.failed_items
    }

    /// Final `(transferred, total)` bytes; deletes carry no byte totals
    pub fn byte_totals(&self) -> Option<(u64, u64)> {
        match self.kind {
            BatchKind::Upload | BatchKind::Move => Some((self.transferred_bytes, self.total_bytes)),
            BatchKind::Delete => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed_items == 0 && !self.cancelled
    }
}

/// Sequential batch runner; one live batch per instance
pub struct TransferOrchestrator {
    store: Arc<dyn RemoteStore>,
    state: BatchState,
    failures: Vec<ItemFailure>,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            state: BatchState::idle(),
            failures: Vec::new(),
        }
    }

    /// Snapshot of the current batch
    pub fn state(&self) -> &BatchState {
        &self.state
    }

    fn begin(&mut self, kind: BatchKind, total_items: usize, total_bytes: u64) -> Result<(), BatchError> {
        if self.state.is_active() {
            return Err(BatchError::BatchInProgress);
        }

        self.state = BatchState {
            kind: Some(kind),
            status: BatchStatus::Running,
            total_items,
            total_bytes,
            ..BatchState::idle()
        };
        self.failures.clear();

        info!(?kind, total_items, total_bytes, "batch started");
        Ok(())
    }

    /// Poll point before each item; flips to `Cancelling` once the token fires
    fn cancel_observed(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            self.state.cancel_requested = true;
            self.state.status = BatchStatus::Cancelling;
            info!(
                completed = self.state.completed_items,
                remaining = self.state.total_items - self.state.attempted_items(),
                "batch cancelled"
            );
            return true;
        }
        false
    }

    fn record_success(&mut self, bytes_before: u64, item_bytes: u64) {
        self.state.completed_items += 1;
        // Snap to the full size even if the last tick under-reported
        self.state.transferred_bytes = bytes_before + item_bytes;
        self.state.current_item = None;
        self.state.refresh_percent();
    }

    fn record_failure(&mut self, bytes_before: u64, source_path: &str, error: StoreError) {
        warn!(source_path, %error, "batch item failed");
        self.state.failed_items += 1;
        self.state.transferred_bytes = bytes_before;
        self.state.current_item = None;
        self.failures.push(ItemFailure {
            source_path: source_path.to_string(),
            error,
        });
        self.state.refresh_percent();
    }

    fn finish(&mut self) -> BatchSummary {
        let cancelled = self.state.cancel_requested;
        if !cancelled {
            self.state.percent = 100;
        }
        self.state.status = BatchStatus::Completed;
        self.state.current_item = None;

        let kind = self.state.kind.unwrap_or(BatchKind::Upload);
        let summary = BatchSummary {
            kind,
            total_items: self.state.total_items,
            completed_items: self.state.completed_items,
            failed_items: self.state.failed_items,
            total_bytes: self.state.total_bytes,
            transferred_bytes: self.state.transferred_bytes,
            percent: self.state.percent,
            cancelled,
            failures: std::mem::take(&mut self.failures),
            elapsed: self.state.elapsed(),
        };

        info!(
            ?kind,
            completed = summary.completed_items,
            failed = summary.failed_items,
            total = summary.total_items,
            cancelled,
            "batch finished"
        );
        summary
    }

    /// Upload local files, each into its own destination directory
    ///
    /// Byte progress is reported on every transport tick. Cancelling the token
    /// aborts the in-flight upload as well as the remaining items.
    pub async fn upload<F>(
        &mut self,
        items: Vec<UploadItem>,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(&BatchState) + Send,
    {
        let total_bytes = items
            .iter()
            .filter(|u| !u.item.is_folder)
            .map(|u| u.item.size_bytes)
            .sum();
        self.begin(BatchKind::Upload, items.len(), total_bytes)?;
        on_progress(&self.state);

        let store = Arc::clone(&self.store);
        for upload in &items {
            if self.cancel_observed(cancel) {
                on_progress(&self.state);
                break;
            }

            let item = &upload.item;
            let bytes_before = self.state.transferred_bytes;
            self.state.current_item = Some(item.source_path.clone());
            on_progress(&self.state);

            let result = {
                let state = &mut self.state;
                let on_progress = &mut on_progress;
                let mut tick = |loaded: u64, _total: u64| {
                    state.transferred_bytes = bytes_before + loaded;
                    state.refresh_percent();
                    on_progress(&*state);
                };
                store
                    .upload_item(
                        &upload.destination_dir,
                        Path::new(&item.source_path),
                        &mut tick,
                        cancel,
                    )
                    .await
            };

            match result {
                Ok(()) => {
                    debug!(source = %item.source_path, dest = %upload.destination_dir, "uploaded");
                    self.record_success(bytes_before, item.size_bytes);
                }
                Err(StoreError::Cancelled) => {
                    // Aborted mid-item: the partial upload does not count either way
                    self.state.transferred_bytes = bytes_before;
                    self.state.refresh_percent();
                    self.state.current_item = None;
                    self.state.cancel_requested = true;
                    self.state.status = BatchStatus::Cancelling;
                    info!(source = %item.source_path, "upload aborted in flight");
                    on_progress(&self.state);
                    break;
                }
                Err(err) => self.record_failure(bytes_before, &item.source_path, err),
            }
            on_progress(&self.state);
        }

        let summary = self.finish();
        on_progress(&self.state);
        Ok(summary)
    }

    /// Move items into `destination`, one remote call per item
    ///
    /// Sizes reported by the store replace the client's estimates as they
    /// arrive, since folder sizes are unknown up front.
    pub async fn move_items<F>(
        &mut self,
        items: Vec<BatchItem>,
        destination: &str,
        overwrite: bool,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(&BatchState) + Send,
    {
        if self.state.is_active() {
            return Err(BatchError::BatchInProgress);
        }
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(BatchError::MissingDestination);
        }

        let estimates: Vec<u64> = items
            .iter()
            .map(|item| if item.is_folder { 0 } else { item.size_bytes })
            .collect();
        let mut authoritative: Vec<Option<u64>> = vec![None; items.len()];

        self.begin(BatchKind::Move, items.len(), estimates.iter().sum())?;
        on_progress(&self.state);

        let store = Arc::clone(&self.store);
        for (idx, item) in items.iter().enumerate() {
            if self.cancel_observed(cancel) {
                on_progress(&self.state);
                break;
            }

            let bytes_before = self.state.transferred_bytes;
            self.state.current_item = Some(item.source_path.clone());
            on_progress(&self.state);

            let result = store
                .move_items(std::slice::from_ref(item), destination, overwrite)
                .await;

            match result {
                Ok(outcome) => {
                    if outcome.total_size > 0 {
                        authoritative[idx] = Some(outcome.total_size);
                        self.state.total_bytes = estimates
                            .iter()
                            .zip(&authoritative)
                            .map(|(estimate, known)| known.unwrap_or(*estimate))
                            .sum();
                    }
                    let item_bytes = authoritative[idx].unwrap_or(estimates[idx]);

                    if outcome.failed_count == 0 {
                        debug!(source = %item.source_path, destination, moved = outcome.moved_size, "moved");
                        self.record_success(bytes_before, item_bytes);
                    } else {
                        let reason = format!(
                            "{} of {} entries could not be moved",
                            outcome.failed_count,
                            outcome.total_items.max(outcome.failed_count)
                        );
                        self.record_failure(
                            bytes_before,
                            &item.source_path,
                            StoreError::RemoteRejected(reason),
                        );
                    }
                }
                Err(err) => self.record_failure(bytes_before, &item.source_path, err),
            }
            on_progress(&self.state);
        }

        let summary = self.finish();
        on_progress(&self.state);
        Ok(summary)
    }

    /// Soft-delete items; each call is atomic and never interrupted
    pub async fn delete<F>(
        &mut self,
        items: Vec<BatchItem>,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(&BatchState) + Send,
    {
        let total_bytes = items
            .iter()
            .filter(|item| !item.is_folder)
            .map(|item| item.size_bytes)
            .sum();
        self.begin(BatchKind::Delete, items.len(), total_bytes)?;
        on_progress(&self.state);

        let store = Arc::clone(&self.store);
        for item in &items {
            if self.cancel_observed(cancel) {
                on_progress(&self.state);
                break;
            }

            let bytes_before = self.state.transferred_bytes;
            self.state.current_item = Some(item.source_path.clone());
            on_progress(&self.state);

            match store.delete_item(&item.source_path, item.is_folder).await {
                Ok(()) => {
                    debug!(source = %item.source_path, "moved to trash");
                    let item_bytes = if item.is_folder { 0 } else { item.size_bytes };
                    self.record_success(bytes_before, item_bytes);
                }
                Err(err) => self.record_failure(bytes_before, &item.source_path, err),
            }
            on_progress(&self.state);
        }

        let summary = self.finish();
        on_progress(&self.state);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(kind: BatchKind, total_items: usize, total_bytes: u64) -> BatchState {
        BatchState {
            kind: Some(kind),
            status: BatchStatus::Running,
            total_items,
            total_bytes,
            ..BatchState::idle()
        }
    }

    #[test]
    fn test_ratio_percent_rounding() {
        assert_eq!(ratio_percent(1, 3), 33);
        assert_eq!(ratio_percent(2, 3), 67);
        assert_eq!(ratio_percent(5, 0), 0);
    }

    #[test]
    fn test_in_flight_percent_capped_at_99() {
        let mut state = state_with(BatchKind::Upload, 2, 1000);
        state.transferred_bytes = 999;
        state.refresh_percent();
        assert_eq!(state.percent, 99);

        state.transferred_bytes = 1000;
        state.refresh_percent();
        assert_eq!(state.percent, 99);
    }

    #[test]
    fn test_move_percent_never_regresses() {
        let mut state = state_with(BatchKind::Move, 2, 100);
        state.transferred_bytes = 80;
        state.refresh_percent();
        assert_eq!(state.percent, 80);

        // Authoritative total grows after a folder reports its size
        state.total_bytes = 1000;
        state.refresh_percent();
        assert_eq!(state.percent, 80);
    }

    #[test]
    fn test_upload_percent_follows_rolled_back_bytes() {
        let mut state = state_with(BatchKind::Upload, 3, 350);
        state.transferred_bytes = 290;
        state.refresh_percent();
        assert_eq!(state.percent, 83);

        // The second item fails at 190 of 200 bytes
        state.transferred_bytes = 100;
        state.failed_items = 1;
        state.refresh_percent();
        assert_eq!(state.percent, 29);
    }

    #[test]
    fn test_delete_percent_by_item_count() {
        let mut state = state_with(BatchKind::Delete, 4, 1_000_000);
        state.completed_items = 1;
        state.failed_items = 1;
        state.refresh_percent();
        assert_eq!(state.percent, 50);
    }

    #[test]
    fn test_zero_bytes_falls_back_to_items() {
        let mut state = state_with(BatchKind::Move, 3, 0);
        state.completed_items = 1;
        state.refresh_percent();
        assert_eq!(state.percent, 33);
    }

    #[test]
    fn test_idle_state_is_not_active() {
        let state = BatchState::idle();
        assert!(!state.is_active());
        assert_eq!(state.status, BatchStatus::Idle);
        assert_eq!(state.speed_bytes_per_sec(), 0.0);
    }
}
