use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::logic::errors::{classify_error, StoreError};
use crate::logic::filter::GlobalQuery;
use crate::model::types::{
    BatchItem, Checksum, ItemDescriptor, ItemKind, ListingPage, MoveOutcome, TrashEntry,
};

/// The remote hierarchical store, as seen by the client core
///
/// Every call settles into either a value or a classified `StoreError`;
/// timeouts are a property of the implementation and surface as
/// `StoreError::NetworkUnreachable`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_children(
        &self,
        path: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError>;

    /// Items in the result carry their absolute path
    async fn query_global(
        &self,
        query: &GlobalQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError>;

    /// Upload one local file into `destination_dir`
    ///
    /// `on_progress(loaded, total)` is called as the body is streamed out.
    /// Cancelling `abort` interrupts the request and yields `StoreError::Cancelled`.
    async fn upload_item(
        &self,
        destination_dir: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<(), StoreError>;

    /// Stream the file at `remote_path` into `local_path`
    ///
    /// Returns the bytes written. `total` in `on_progress` is 0 when the store
    /// sends no length. A cancelled download removes the partial file.
    async fn download_item(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<u64, StoreError>;

    async fn move_items(
        &self,
        items: &[BatchItem],
        destination_path: &str,
        overwrite: bool,
    ) -> Result<MoveOutcome, StoreError>;

    /// Soft delete: the entry moves to the recoverable trash
    async fn delete_item(&self, path: &str, is_folder: bool) -> Result<(), StoreError>;

    async fn list_trash(&self) -> Result<Vec<TrashEntry>, StoreError>;

    async fn restore_trash(&self, id: &str) -> Result<(), StoreError>;

    async fn purge_trash(&self, id: &str) -> Result<(), StoreError>;

    async fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError>;

    async fn checksum(&self, path: &str) -> Result<Checksum, StoreError>;
}

/// Listing entry as sent by the server
///
/// Field names arrive in camelCase or PascalCase depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WireItem {
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(rename = "type", alias = "Type", default)]
    pub item_type: String,
    #[serde(alias = "Path", default)]
    pub path: Option<String>,
    #[serde(alias = "Size", default)]
    pub size: Option<u64>,
    #[serde(rename = "lastModified", alias = "LastModified", default)]
    pub last_modified: Option<String>,
}

impl From<WireItem> for ItemDescriptor {
    fn from(wire: WireItem) -> Self {
        let kind = if wire.item_type.eq_ignore_ascii_case("folder") {
            ItemKind::Folder
        } else {
            ItemKind::File
        };
        ItemDescriptor {
            name: wire.name,
            kind,
            path: wire.path.filter(|p| !p.is_empty()),
            size_bytes: if kind.is_folder() { 0 } else { wire.size.unwrap_or(0) },
            last_modified: wire.last_modified.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingResponse {
    Paged {
        #[serde(alias = "Items", default)]
        items: Vec<WireItem>,
        #[serde(rename = "totalPages", alias = "TotalPages", default)]
        total_pages: Option<u32>,
        #[serde(rename = "totalCount", alias = "TotalCount", default)]
        total_count: Option<u64>,
    },
    Bare(Vec<WireItem>),
}

impl From<ListingResponse> for ListingPage {
    fn from(response: ListingResponse) -> Self {
        let (wire_items, total_pages, total_count) = match response {
            ListingResponse::Paged {
                items,
                total_pages,
                total_count,
            } => (items, total_pages.unwrap_or(1), total_count),
            ListingResponse::Bare(items) => (items, 1, None),
        };

        let items: Vec<ItemDescriptor> = wire_items
            .into_iter()
            .filter(|w| !w.name.is_empty())
            .map(ItemDescriptor::from)
            .collect();

        ListingPage {
            total_count: total_count.unwrap_or(items.len() as u64),
            total_pages: total_pages.max(1),
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveResponse {
    #[serde(default)]
    moved_count: u64,
    #[serde(default)]
    failed_count: u64,
    #[serde(default)]
    total_items: u64,
    #[serde(default)]
    moved_size: u64,
    #[serde(default)]
    total_size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequestItem<'a> {
    path: &'a str,
    is_folder: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest<'a> {
    items: Vec<MoveRequestItem<'a>>,
    destination_path: &'a str,
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTrashEntry {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(default)]
    original_path: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    deleted_at: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
}

impl From<WireTrashEntry> for TrashEntry {
    fn from(wire: WireTrashEntry) -> Self {
        TrashEntry {
            id: wire.id,
            name: wire.name,
            kind: if wire.item_type.eq_ignore_ascii_case("folder") {
                ItemKind::Folder
            } else {
                ItemKind::File
            },
            original_path: wire.original_path,
            size_bytes: wire.size.unwrap_or(0),
            deleted_at: wire.deleted_at.as_deref().and_then(parse_timestamp),
            expires_at: wire.expires_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChecksumResponse {
    checksum: String,
    #[serde(default)]
    algorithm: Option<String>,
}

/// Helper function to accept numeric or string ids
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// Parse a server timestamp, keeping the wall time as reported
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.fff]`; anything else is `None`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Extract a rejection reason from a non-success response
async fn rejection_reason(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        return body.message;
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        status.to_string()
    } else {
        trimmed.trim_matches('"').to_string()
    }
}

/// Pass successful responses through, turn the rest into `RemoteRejected`
async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let reason = rejection_reason(response).await;
        Err(StoreError::RemoteRejected(reason).into())
    }
}

#[derive(Clone)]
pub struct StoreClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl StoreClient {
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, endpoint);
        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&format!("{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "store request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn browse(&self, path: &str, page: u32, page_size: u32) -> Result<ListingPage> {
        let mut params = vec![("page", page.to_string()), ("pageSize", page_size.to_string())];
        if !path.is_empty() {
            params.push(("path", path.to_string()));
        }
        let url = self.url("/file", &params);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .context("Failed to list folder")?;
        let response = ensure_success(response).await?;

        let listing: ListingResponse = response
            .json()
            .await
            .context("Failed to parse folder listing")?;

        Ok(listing.into())
    }

    pub async fn search(
        &self,
        query: &GlobalQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage> {
        let mut params = vec![("page", page.to_string()), ("pageSize", page_size.to_string())];
        params.extend(query.to_params());
        let url = self.url("/file/search", &params);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .context("Failed to search store")?;
        let response = ensure_success(response).await?;

        let listing: ListingResponse = response
            .json()
            .await
            .context("Failed to parse search results")?;

        Ok(listing.into())
    }

    pub async fn upload(
        &self,
        destination_dir: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<()> {
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Not a file path: {}", local_path.display()))?;

        let total = tokio::fs::metadata(local_path)
            .await
            .with_context(|| format!("Failed to stat {}", local_path.display()))?
            .len();
        let file = tokio::fs::File::open(local_path)
            .await
            .with_context(|| format!("Failed to open {}", local_path.display()))?;

        // Count bytes as the body is pulled by the transport
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u64>();
        let mut loaded = 0u64;
        let stream = ReaderStream::new(file).inspect_ok(move |chunk| {
            loaded += chunk.len() as u64;
            let _ = progress_tx.send(loaded);
        });
        let body = reqwest::Body::wrap_stream(stream);

        let part = reqwest::multipart::Part::stream_with_length(body, total).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut params = Vec::new();
        if !destination_dir.is_empty() {
            params.push(("path", destination_dir.to_string()));
        }
        let url = self.url("/file/upload", &params);

        let send = self.request(Method::POST, &url).multipart(form).send();
        tokio::pin!(send);

        let response = loop {
            tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    return Err(StoreError::Cancelled.into());
                }
                result = &mut send => {
                    break result.context("Failed to upload file")?;
                }
                Some(bytes) = progress_rx.recv() => {
                    on_progress(bytes, total);
                }
            }
        };

        while let Ok(bytes) = progress_rx.try_recv() {
            on_progress(bytes, total);
        }

        ensure_success(response).await?;
        Ok(())
    }

    pub async fn download(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<u64> {
        let url = self.url("/file/download", &[("filePath", remote_path.to_string())]);
        let send = self.request(Method::GET, &url).send();

        let response = tokio::select! {
            biased;
            _ = abort.cancelled() => return Err(StoreError::Cancelled.into()),
            result = send => result.context("Failed to download file")?,
        };
        let response = ensure_success(response).await?;
        let total = response.content_length().unwrap_or(0);

        let mut file = tokio::fs::File::create(local_path)
            .await
            .with_context(|| format!("Failed to create {}", local_path.display()))?;
        let mut stream = response.bytes_stream();
        let mut loaded = 0u64;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    drop(file);
                    let _ = tokio::fs::remove_file(local_path).await;
                    return Err(StoreError::Cancelled.into());
                }
                next = stream.next() => match next {
                    Some(chunk) => chunk.context("Failed to read download")?,
                    None => break,
                },
            };
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", local_path.display()))?;
            loaded += chunk.len() as u64;
            on_progress(loaded, total);
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", local_path.display()))?;
        Ok(loaded)
    }

    pub async fn move_to(
        &self,
        items: &[BatchItem],
        destination_path: &str,
        overwrite: bool,
    ) -> Result<MoveOutcome> {
        let url = self.url("/file/move", &[]);
        let request = MoveRequest {
            items: items
                .iter()
                .map(|item| MoveRequestItem {
                    path: &item.source_path,
                    is_folder: item.is_folder,
                })
                .collect(),
            destination_path,
            overwrite,
        };

        let response = self
            .request(Method::POST, &url)
            .json(&request)
            .send()
            .await
            .context("Failed to move items")?;
        let response = ensure_success(response).await?;

        let data: MoveResponse = response
            .json()
            .await
            .context("Failed to parse move response")?;

        Ok(MoveOutcome {
            moved_count: data.moved_count,
            failed_count: data.failed_count,
            total_items: data.total_items,
            moved_size: data.moved_size,
            total_size: data.total_size,
        })
    }

    pub async fn delete(&self, path: &str, is_folder: bool) -> Result<()> {
        let url = self.url(
            "/file",
            &[("path", path.to_string()), ("isFolder", is_folder.to_string())],
        );
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .context("Failed to delete item")?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn get_trash(&self) -> Result<Vec<TrashEntry>> {
        let url = self.url("/file/trash", &[]);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .context("Failed to fetch trash")?;
        let response = ensure_success(response).await?;

        let entries: Vec<WireTrashEntry> =
            response.json().await.context("Failed to parse trash")?;
        Ok(entries.into_iter().map(TrashEntry::from).collect())
    }

    pub async fn restore_from_trash(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/file/trash/{}/restore", urlencoding::encode(id)), &[]);
        let response = self
            .request(Method::POST, &url)
            .send()
            .await
            .context("Failed to restore trash entry")?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn delete_from_trash(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/file/trash/{}", urlencoding::encode(id)), &[]);
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .context("Failed to purge trash entry")?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn make_folder(&self, parent: &str, name: &str) -> Result<()> {
        let mut params = vec![("folderName", name.to_string())];
        if !parent.is_empty() {
            params.push(("path", parent.to_string()));
        }
        let url = self.url("/file/folder", &params);
        let response = self
            .request(Method::POST, &url)
            .send()
            .await
            .context("Failed to create folder")?;
        ensure_success(response).await?;
        Ok(())
    }

    pub async fn get_checksum(&self, path: &str) -> Result<Checksum> {
        let url = self.url("/file/checksum", &[("filePath", path.to_string())]);
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .context("Failed to fetch checksum")?;
        let response = ensure_success(response).await?;

        let data: ChecksumResponse = response
            .json()
            .await
            .context("Failed to parse checksum")?;

        Ok(Checksum {
            checksum: data.checksum,
            algorithm: data.algorithm.unwrap_or_else(|| "SHA256".to_string()),
        })
    }
}

#[async_trait]
impl RemoteStore for StoreClient {
    async fn list_children(
        &self,
        path: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError> {
        self.browse(path, page, page_size)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn query_global(
        &self,
        query: &GlobalQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError> {
        self.search(query, page, page_size)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn upload_item(
        &self,
        destination_dir: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<(), StoreError> {
        self.upload(destination_dir, local_path, on_progress, abort)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn download_item(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: &mut (dyn FnMut(u64, u64) + Send),
        abort: &CancellationToken,
    ) -> Result<u64, StoreError> {
        self.download(remote_path, local_path, on_progress, abort)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn move_items(
        &self,
        items: &[BatchItem],
        destination_path: &str,
        overwrite: bool,
    ) -> Result<MoveOutcome, StoreError> {
        self.move_to(items, destination_path, overwrite)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn delete_item(&self, path: &str, is_folder: bool) -> Result<(), StoreError> {
        self.delete(path, is_folder)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn list_trash(&self) -> Result<Vec<TrashEntry>, StoreError> {
        self.get_trash().await.map_err(|e| classify_error(&e))
    }

    async fn restore_trash(&self, id: &str) -> Result<(), StoreError> {
        self.restore_from_trash(id)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn purge_trash(&self, id: &str) -> Result<(), StoreError> {
        self.delete_from_trash(id)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<(), StoreError> {
        self.make_folder(parent, name)
            .await
            .map_err(|e| classify_error(&e))
    }

    async fn checksum(&self, path: &str) -> Result<Checksum, StoreError> {
        self.get_checksum(path).await.map_err(|e| classify_error(&e))
    }
}
