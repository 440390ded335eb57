//! Path Arithmetic
//!
//! Pure functions for composing and decomposing store paths. Paths are
//! slash-separated and rooted at the per-user folder. Every function here is
//! total: empty strings, trailing slashes and backslash separators are all
//! accepted and normalized to `/` before comparison.

/// Normalize separators to `/`
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Split a path into its non-empty segments
pub fn segments(path: &str) -> Vec<String> {
    normalize(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Append a leaf segment to a base path
///
/// # Examples
/// ```
/// use fileshelf::logic::path::join;
///
/// assert_eq!(join("", "docs"), "docs");
/// assert_eq!(join("users/ann", "docs"), "users/ann/docs");
/// ```
pub fn join(base: &str, leaf: &str) -> String {
    if base.is_empty() {
        leaf.to_string()
    } else {
        format!("{}/{}", base, leaf)
    }
}

/// Segments of `current_path` below `root_path`
///
/// Returns an empty list when `current_path` is not inside `root_path`.
///
/// # Examples
/// ```
/// use fileshelf::logic::path::breadcrumbs;
///
/// assert_eq!(breadcrumbs("/root", "/root/a/b"), vec!["a", "b"]);
/// assert!(breadcrumbs("/root", "/other/a").is_empty());
/// ```
pub fn breadcrumbs(root_path: &str, current_path: &str) -> Vec<String> {
    let root = segments(root_path);
    let current = segments(current_path);

    if current.len() < root.len() || current[..root.len()] != root[..] {
        return Vec::new();
    }

    current[root.len()..].to_vec()
}

/// Path of the breadcrumb at `index`: root segments plus crumbs `0..=index`
///
/// An index past the end resolves to the full current path.
pub fn breadcrumb_target(root_path: &str, current_path: &str, index: usize) -> String {
    let crumbs = breadcrumbs(root_path, current_path);
    let keep = (index + 1).min(crumbs.len());

    let mut parts = segments(root_path);
    parts.extend(crumbs.into_iter().take(keep));
    parts.join("/")
}

/// Remove the last segment, never climbing above `root_path`
pub fn parent(path: &str, root_path: &str) -> String {
    let mut parts = segments(path);
    let root = segments(root_path);

    parts.pop();
    if parts.len() < root.len() {
        return normalize(root_path).trim_end_matches('/').to_string();
    }

    let joined = parts.join("/");
    if normalize(path).starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// True when `path` lies at or below `root_path`
pub fn is_within(path: &str, root_path: &str) -> bool {
    let root = segments(root_path);
    let parts = segments(path);
    parts.len() >= root.len() && parts[..root.len()] == root[..]
}

/// Destination directory for a file uploaded as part of a folder tree
///
/// `relative_inner_path` is the file's path inside the top-level folder,
/// file name included. Every intermediate directory is preserved; the last
/// segment (the file itself) is dropped.
///
/// # Examples
/// ```
/// use fileshelf::logic::path::relative_upload_target;
///
/// assert_eq!(relative_upload_target("docs", "photos", "2024/may/a.jpg"), "docs/photos/2024/may");
/// assert_eq!(relative_upload_target("", "photos", "a.jpg"), "photos");
/// assert_eq!(relative_upload_target("docs", "photos", ""), "docs/photos");
/// ```
pub fn relative_upload_target(
    base_dir: &str,
    top_level_folder_name: &str,
    relative_inner_path: &str,
) -> String {
    let mut inner = segments(relative_inner_path);
    inner.pop();

    let mut target = join(
        normalize(base_dir).trim_end_matches('/'),
        top_level_folder_name,
    );
    for dir in inner {
        target = join(&target, &dir);
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_empty_base() {
        assert_eq!(join("", "file.txt"), "file.txt");
    }

    #[test]
    fn test_join_nested() {
        assert_eq!(join("a/b", "c"), "a/b/c");
    }

    #[test]
    fn test_breadcrumbs_below_root() {
        assert_eq!(breadcrumbs("/root", "/root/a/b"), vec!["a", "b"]);
    }

    #[test]
    fn test_breadcrumbs_outside_root() {
        assert!(breadcrumbs("/root", "/other/a").is_empty());
        // Prefix match on a segment boundary only
        assert!(breadcrumbs("/root", "/rootless/a").is_empty());
    }

    #[test]
    fn test_breadcrumbs_at_root() {
        assert!(breadcrumbs("/root", "/root").is_empty());
        assert!(breadcrumbs("/root/", "root").is_empty());
    }

    #[test]
    fn test_breadcrumbs_mixed_separators() {
        assert_eq!(breadcrumbs("users\\ann", "users/ann\\docs/2024/"), vec!["docs", "2024"]);
    }

    #[test]
    fn test_breadcrumbs_empty_inputs() {
        assert!(breadcrumbs("", "").is_empty());
        assert_eq!(breadcrumbs("", "a/b"), vec!["a", "b"]);
    }

    #[test]
    fn test_breadcrumb_target() {
        assert_eq!(breadcrumb_target("users/ann", "users/ann/a/b/c", 0), "users/ann/a");
        assert_eq!(breadcrumb_target("users/ann", "users/ann/a/b/c", 1), "users/ann/a/b");
        assert_eq!(breadcrumb_target("users/ann", "users/ann/a/b/c", 9), "users/ann/a/b/c");
    }

    #[test]
    fn test_parent_normal() {
        assert_eq!(parent("users/ann/a/b", "users/ann"), "users/ann/a");
        assert_eq!(parent("/users/ann/a", "/users/ann"), "/users/ann");
    }

    #[test]
    fn test_parent_stops_at_root() {
        assert_eq!(parent("users/ann", "users/ann"), "users/ann");
        assert_eq!(parent("users/ann/", "users/ann/"), "users/ann");
        assert_eq!(parent("", ""), "");
    }

    #[test]
    fn test_parent_backslashes() {
        assert_eq!(parent("users\\ann\\a", "users/ann"), "users/ann");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("users/ann/a", "users/ann"));
        assert!(is_within("users\\ann", "users/ann"));
        assert!(!is_within("users/bob", "users/ann"));
    }

    #[test]
    fn test_relative_upload_target_deep() {
        assert_eq!(
            relative_upload_target("base", "top", "a/b/c/file.bin"),
            "base/top/a/b/c"
        );
    }

    #[test]
    fn test_relative_upload_target_direct_child() {
        assert_eq!(relative_upload_target("base", "top", "file.bin"), "base/top");
        assert_eq!(relative_upload_target("base", "top", ""), "base/top");
    }

    #[test]
    fn test_relative_upload_target_windows_separators() {
        assert_eq!(
            relative_upload_target("base\\", "top", "a\\b\\file.bin"),
            "base/top/a/b"
        );
    }
}
