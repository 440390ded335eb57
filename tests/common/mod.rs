//! In-memory `RemoteStore` used by the integration tests
//!
//! Listings, failures, move outcomes and upload sizes are configured up front;
//! every call is recorded so tests can assert on what reached the store.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use fileshelf::api::RemoteStore;
use fileshelf::logic::errors::StoreError;
use fileshelf::logic::filter::GlobalQuery;
use fileshelf::model::types::{
    BatchItem, Checksum, ItemDescriptor, ListingPage, MoveOutcome, TrashEntry,
};

#[derive(Default)]
pub struct FakeStore {
    listings: HashMap<String, Vec<ItemDescriptor>>,
    global_results: Vec<ItemDescriptor>,
    failing: HashSet<String>,
    unreachable: HashSet<String>,
    hanging: HashSet<String>,
    broken_on_abort: HashSet<String>,
    failing_after: HashMap<String, u64>,
    downloads: HashMap<String, Vec<u8>>,
    upload_sizes: HashMap<String, u64>,
    move_outcomes: HashMap<String, MoveOutcome>,
    upload_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    queries: Mutex<Vec<GlobalQuery>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, path: &str, items: Vec<ItemDescriptor>) -> Self {
        self.listings.insert(path.to_string(), items);
        self
    }

    pub fn with_global_results(mut self, items: Vec<ItemDescriptor>) -> Self {
        self.global_results = items;
        self
    }

    /// Calls on `path` are rejected by the store
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// Calls on `path` fail as if the network were down
    pub fn unreachable(mut self, path: &str) -> Self {
        self.unreachable.insert(path.to_string());
        self
    }

    /// Calls on `path` never settle (uploads still honour the abort token)
    pub fn hanging(mut self, path: &str) -> Self {
        self.hanging.insert(path.to_string());
        self
    }

    /// Uploads of `path` stall, then fail with a transport error once the
    /// abort token fires, as a connection torn down mid-request would
    pub fn broken_on_abort(mut self, path: &str) -> Self {
        self.broken_on_abort.insert(path.to_string());
        self
    }

    /// Uploads of `path` report `loaded` bytes, then get rejected
    pub fn failing_after(mut self, path: &str, loaded: u64) -> Self {
        self.failing_after.insert(path.to_string(), loaded);
        self
    }

    pub fn with_download(mut self, path: &str, content: &[u8]) -> Self {
        self.downloads.insert(path.to_string(), content.to_vec());
        self
    }

    pub fn with_upload_size(mut self, path: &str, size: u64) -> Self {
        self.upload_sizes.insert(path.to_string(), size);
        self
    }

    pub fn with_move_outcome(mut self, path: &str, outcome: MoveOutcome) -> Self {
        self.move_outcomes.insert(path.to_string(), outcome);
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<GlobalQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome_for(&self, path: &str) -> Result<(), StoreError> {
        if self.unreachable.contains(path) {
            return Err(StoreError::NetworkUnreachable("connection refused".to_string()));
        }
        if self.failing.contains(path) {
            return Err(StoreError::RemoteRejected(format!("{} is locked", path)));
        }
        Ok(())
    }
}

fn paged(items: Vec<ItemDescriptor>, page: u32, page_size: u32) -> ListingPage {
    let size = page_size.max(1) as usize;
    let total_count = items.len() as u64;
    let total_pages = ((items.len() + size - 1) / size).max(1) as u32;
    let start = (page.max(1) as usize - 1) * size;
    ListingPage {
        items: items.into_iter().skip(start).take(size).collect(),
        total_pages,
        total_count,
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_children(
        &self,
        path: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError> {
        self.record(format!("list {} {} {}", path, page, page_size));
        self.outcome_for(path)?;
        let items = self.listings.get(path).cloned().unwrap_or_default();
        Ok(paged(items, page, page_size))
    }

    async fn query_global(
        &self,
        query: &GlobalQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError> {
        self.record(format!("query {} {}", page, page_size));
        self.queries.lock().unwrap().push(query.clone());
        Ok(paged(self.global_results.clone(), page, page_size))
    }

    async fn upload_item(
        &self,
        destination_dir: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<(), StoreError> {
        let source = local_path.to_string_lossy().into_owned();
        self.record(format!("upload {} -> {}", source, destination_dir));

        if self.hanging.contains(&source) {
            on_progress(1, 2);
            abort.cancelled().await;
            return Err(StoreError::Cancelled);
        }
        if self.broken_on_abort.contains(&source) {
            on_progress(1, 2);
            abort.cancelled().await;
            return Err(StoreError::NetworkUnreachable("connection reset".to_string()));
        }
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome_for(&source)?;

        let size = self.upload_sizes.get(&source).copied().unwrap_or(0);
        if let Some(loaded) = self.failing_after.get(&source) {
            on_progress(*loaded, size);
            return Err(StoreError::RemoteRejected(format!("{} quota exceeded", source)));
        }
        on_progress(size / 2, size);
        // Final tick under-reports, as a rounding transport would
        on_progress(size.saturating_sub(1), size);
        Ok(())
    }

    async fn download_item(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<u64, StoreError> {
        self.record(format!("download {} -> {}", remote_path, local_path.display()));
        self.outcome_for(remote_path)?;
        if abort.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let content = self
            .downloads
            .get(remote_path)
            .ok_or_else(|| StoreError::RemoteRejected(format!("{} not found", remote_path)))?;
        let total = content.len() as u64;
        on_progress(total / 2, total);
        tokio::fs::write(local_path, content)
            .await
            .map_err(|e| StoreError::RemoteRejected(e.to_string()))?;
        on_progress(total, total);
        Ok(total)
    }

    async fn move_items(
        &self,
        items: &[BatchItem],
        destination_path: &str,
        overwrite: bool,
    ) -> Result<MoveOutcome, StoreError> {
        let paths: Vec<_> = items.iter().map(|i| i.source_path.as_str()).collect();
        self.record(format!(
            "move {} -> {} overwrite={}",
            paths.join(","),
            destination_path,
            overwrite
        ));
        for item in items {
            if self.hanging.contains(&item.source_path) {
                std::future::pending::<()>().await;
            }
            self.outcome_for(&item.source_path)?;
        }

        let mut total = MoveOutcome::default();
        for item in items {
            let outcome = self
                .move_outcomes
                .get(&item.source_path)
                .copied()
                .unwrap_or(MoveOutcome {
                    moved_count: 1,
                    failed_count: 0,
                    total_items: 1,
                    moved_size: item.size_bytes,
                    total_size: item.size_bytes,
                });
            total.moved_count += outcome.moved_count;
            total.failed_count += outcome.failed_count;
            total.total_items += outcome.total_items;
            total.moved_size += outcome.moved_size;
            total.total_size += outcome.total_size;
        }
        Ok(total)
    }

    async fn delete_item(&self, path: &str, is_folder: bool) -> Result<(), StoreError> {
        self.record(format!("delete {} folder={}", path, is_folder));
        if self.hanging.contains(path) {
            std::future::pending::<()>().await;
        }
        self.outcome_for(path)
    }

    async fn list_trash(&self) -> Result<Vec<TrashEntry>, StoreError> {
        self.record("trash".to_string());
        Ok(Vec::new())
    }

    async fn restore_trash(&self, id: &str) -> Result<(), StoreError> {
        self.record(format!("restore {}", id));
        self.outcome_for(id)
    }

    async fn purge_trash(&self, id: &str) -> Result<(), StoreError> {
        self.record(format!("purge {}", id));
        self.outcome_for(id)
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        self.record(format!("mkdir {} {}", parent, name));
        Ok(())
    }

    async fn checksum(&self, path: &str) -> Result<Checksum, StoreError> {
        self.record(format!("checksum {}", path));
        self.outcome_for(path)?;
        Ok(Checksum {
            checksum: "00".to_string(),
            algorithm: "SHA256".to_string(),
        })
    }
}

pub fn file_item(path: &str, size: u64) -> BatchItem {
    BatchItem {
        source_path: path.to_string(),
        is_folder: false,
        size_bytes: size,
    }
}

pub fn folder_item(path: &str) -> BatchItem {
    BatchItem {
        source_path: path.to_string(),
        is_folder: true,
        size_bytes: 0,
    }
}
