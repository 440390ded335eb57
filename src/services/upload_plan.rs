//! Upload planning
//!
//! Expands local paths into one `UploadItem` per file. Files inside a folder
//! keep their relative layout under the destination.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::logic::path::relative_upload_target;
use crate::model::types::{BatchItem, UploadItem};

/// Plan uploads of `paths` into the remote directory `base_dir`
///
/// Plain files land directly in `base_dir`. A folder `photos` contributes every
/// file below it, each targeted at `base_dir/photos/<inner dirs>`. Empty
/// directories produce nothing. Symlinks are followed; an unreadable entry
/// fails the whole plan rather than silently shrinking it.
pub fn plan_upload(paths: &[PathBuf], base_dir: &str) -> Result<Vec<UploadItem>> {
    let mut plan = Vec::new();

    for local in paths {
        let metadata = std::fs::metadata(local)
            .with_context(|| format!("Cannot read {}", local.display()))?;

        if metadata.is_file() {
            plan.push(upload_item(local, metadata.len(), base_dir.to_string()));
            continue;
        }

        let top = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Folder has no name: {}", local.display()))?;

        // Symlinked files upload their target's content under the link's name
        for entry in WalkDir::new(local).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Cannot walk {}", local.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let inner = entry
                .path()
                .strip_prefix(local)
                .map(inner_path)
                .with_context(|| format!("{} is outside {}", entry.path().display(), local.display()))?;
            let size = entry
                .metadata()
                .with_context(|| format!("Cannot read {}", entry.path().display()))?
                .len();
            let destination = relative_upload_target(base_dir, &top, &inner);
            plan.push(upload_item(entry.path(), size, destination));
        }
    }

    debug!(files = plan.len(), base_dir, "upload planned");
    Ok(plan)
}

fn upload_item(local: &Path, size_bytes: u64, destination_dir: String) -> UploadItem {
    UploadItem {
        item: BatchItem {
            source_path: local.to_string_lossy().into_owned(),
            is_folder: false,
            size_bytes,
        },
        destination_dir,
    }
}

/// `a/b/c.txt` with `/` separators on every platform
fn inner_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
