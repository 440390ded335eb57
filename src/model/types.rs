//! Shared types for the Model
//!
//! These types are used across the listing, filtering and transfer code and
//! represent the canonical shape of store entries. Wire-level variants are
//! collapsed into them in `crate::api`.

use chrono::NaiveDateTime;

/// Whether an entry is a folder or a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Folder,
    File,
}

impl ItemKind {
    pub fn is_folder(self) -> bool {
        matches!(self, ItemKind::Folder)
    }
}

/// One entry in a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDescriptor {
    pub name: String,
    pub kind: ItemKind,
    /// Absolute path from the store root; set on global query results
    pub path: Option<String>,
    /// Zero for folders
    pub size_bytes: u64,
    pub last_modified: Option<NaiveDateTime>,
}

impl ItemDescriptor {
    pub fn file(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            kind: ItemKind::File,
            path: None,
            size_bytes,
            last_modified: None,
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ItemKind::Folder,
            path: None,
            size_bytes: 0,
            last_modified: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_last_modified(mut self, at: NaiveDateTime) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Full path: the carried absolute path, else `current_path` joined with the name
    pub fn full_path(&self, current_path: &str) -> String {
        match &self.path {
            Some(path) => crate::logic::path::normalize(path),
            None => crate::logic::path::join(current_path, &self.name),
        }
    }

    /// Lower-cased extension including the leading dot, if the name has one
    pub fn extension(&self) -> Option<String> {
        self.name
            .rfind('.')
            .map(|idx| self.name[idx..].to_lowercase())
    }

    /// Convert into a batch unit rooted at `current_path`
    pub fn to_batch_item(&self, current_path: &str) -> BatchItem {
        BatchItem {
            source_path: self.full_path(current_path),
            is_folder: self.is_folder(),
            size_bytes: if self.is_folder() { 0 } else { self.size_bytes },
        }
    }
}

/// One unit submitted to the transfer orchestrator
///
/// `size_bytes` may be zero when unknown (folders, moves).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub source_path: String,
    pub is_folder: bool,
    pub size_bytes: u64,
}

/// A local file paired with the remote directory it should land in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub item: BatchItem,
    pub destination_dir: String,
}

/// An entry in the recoverable trash
#[derive(Debug, Clone, PartialEq)]
pub struct TrashEntry {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub original_path: String,
    pub size_bytes: u64,
    pub deleted_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

/// One page of a listing, local or global
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListingPage {
    pub items: Vec<ItemDescriptor>,
    pub total_pages: u32,
    pub total_count: u64,
}

/// Authoritative figures returned by a move call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub moved_count: u64,
    pub failed_count: u64,
    pub total_items: u64,
    pub moved_size: u64,
    pub total_size: u64,
}

/// Result of a server-side checksum computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub checksum: String,
    pub algorithm: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lowercased_with_dot() {
        assert_eq!(ItemDescriptor::file("Photo.JPG", 1).extension().as_deref(), Some(".jpg"));
        assert_eq!(ItemDescriptor::file("archive.tar.gz", 1).extension().as_deref(), Some(".gz"));
        assert_eq!(ItemDescriptor::file("Makefile", 1).extension(), None);
    }

    #[test]
    fn test_full_path_prefers_carried_path() {
        let item = ItemDescriptor::file("a.txt", 3).with_path("users\\ann\\x\\a.txt");
        assert_eq!(item.full_path("users/ann"), "users/ann/x/a.txt");

        let local = ItemDescriptor::file("a.txt", 3);
        assert_eq!(local.full_path("users/ann"), "users/ann/a.txt");
        assert_eq!(local.full_path(""), "a.txt");
    }

    #[test]
    fn test_folder_batch_item_has_no_size() {
        let mut folder = ItemDescriptor::folder("photos");
        folder.size_bytes = 4096;
        let batch = folder.to_batch_item("root");
        assert!(batch.is_folder);
        assert_eq!(batch.size_bytes, 0);
        assert_eq!(batch.source_path, "root/photos");
    }
}
