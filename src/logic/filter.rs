//! Filter Logic
//!
//! Pure, total predicates for narrowing a listing by name, kind, extension,
//! size and modification date. Malformed input never fails the listing: a bad
//! regex falls back to substring matching and malformed size or date strings
//! leave the corresponding bound unset.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Regex, RegexBuilder};

use crate::model::types::{ItemDescriptor, ItemKind};

/// Name of the soft-delete folder, hidden from every listing
pub const TRASH_FOLDER_NAME: &str = ".trash";

/// Which entry kinds pass the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    FoldersOnly,
    FilesOnly,
}

impl KindFilter {
    pub fn accepts(self, kind: ItemKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::FoldersOnly => kind == ItemKind::Folder,
            KindFilter::FilesOnly => kind == ItemKind::File,
        }
    }
}

/// Where the filter is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Client-side, over one fetched directory page
    #[default]
    Local,
    /// Delegated to the remote store across the whole tree
    Global,
}

/// Immutable description of the active predicate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    pub name_query: String,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub kind_filter: KindFilter,
    /// Normalized: lower-case with a leading dot
    pub extensions: BTreeSet<String>,
    pub size_min: Option<u64>,
    pub size_max: Option<u64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub mode: SearchMode,
}

impl FilterSpec {
    pub fn with_name_query(mut self, query: impl Into<String>) -> Self {
        self.name_query = query.into();
        self
    }

    pub fn with_regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_kind(mut self, kind_filter: KindFilter) -> Self {
        self.kind_filter = kind_filter;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set extensions from a comma-separated list such as `"jpg, .PNG"`
    pub fn with_extensions(mut self, list: &str) -> Self {
        self.extensions = parse_extensions(list);
        self
    }

    /// Set the lower size bound from text like `"10MB"`; zero or unparseable clears it
    pub fn with_size_min(mut self, text: &str) -> Self {
        self.size_min = non_zero(parse_size(text));
        self
    }

    /// Set the upper size bound from text like `"1GB"`; zero or unparseable clears it
    pub fn with_size_max(mut self, text: &str) -> Self {
        self.size_max = non_zero(parse_size(text));
        self
    }

    /// Set the inclusive start date from `YYYY-MM-DD`; unparseable clears it
    pub fn with_date_from(mut self, text: &str) -> Self {
        self.date_from = parse_date(text);
        self
    }

    /// Set the inclusive end date from `YYYY-MM-DD`; unparseable clears it
    pub fn with_date_to(mut self, text: &str) -> Self {
        self.date_to = parse_date(text);
        self
    }

    /// True when any name, extension, size or date term is present
    ///
    /// Global mode only issues a remote query when this holds.
    pub fn has_query_terms(&self) -> bool {
        !self.name_query.is_empty()
            || !self.extensions.is_empty()
            || self.size_min.is_some()
            || self.size_max.is_some()
            || self.date_from.is_some()
            || self.date_to.is_some()
    }

    /// True when the spec differs from the cleared default in any way
    pub fn has_active_filters(&self) -> bool {
        self.has_query_terms()
            || self.kind_filter != KindFilter::All
            || self.case_sensitive
            || self.use_regex
            || self.mode == SearchMode::Global
    }
}

fn non_zero(value: u64) -> Option<u64> {
    (value > 0).then_some(value)
}

/// Parse a size such as `"10MB"`, `"1.5 gb"` or `"500"` into bytes
///
/// Units are base 1024 with an implicit `B`. Anything unparseable yields `0`.
///
/// # Examples
/// ```
/// use fileshelf::logic::filter::parse_size;
///
/// assert_eq!(parse_size("10MB"), 10 * 1024 * 1024);
/// assert_eq!(parse_size("500"), 500);
/// assert_eq!(parse_size("abc"), 0);
/// ```
pub fn parse_size(text: &str) -> u64 {
    let trimmed = text.trim().to_uppercase();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    // Digits with at most one fractional part, no bare dots
    let valid_number = !number.is_empty()
        && !number.starts_with('.')
        && !number.ends_with('.')
        && number.matches('.').count() <= 1;
    if !valid_number {
        return 0;
    }

    let multiplier: u64 = match unit.trim_start() {
        "" | "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        "TB" => 1024 * 1024 * 1024 * 1024,
        _ => return 0,
    };

    match number.parse::<f64>() {
        Ok(value) => (value * multiplier as f64) as u64,
        Err(_) => 0,
    }
}

/// Normalize a comma-separated extension list to lower-case dotted tokens
///
/// # Examples
/// ```
/// use fileshelf::logic::filter::parse_extensions;
///
/// let exts = parse_extensions("JPG, .png,,");
/// assert!(exts.contains(".jpg"));
/// assert!(exts.contains(".png"));
/// assert_eq!(exts.len(), 2);
/// ```
pub fn parse_extensions(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty() && token != ".")
        .map(|token| {
            if token.starts_with('.') {
                token
            } else {
                format!(".{}", token)
            }
        })
        .collect()
}

/// Parse a `YYYY-MM-DD` date; anything else yields `None`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// How the name query is applied
#[derive(Debug, Clone)]
enum NameMatcher {
    Any,
    Pattern(Regex),
    Substring { needle: String, case_sensitive: bool },
}

impl NameMatcher {
    fn new(spec: &FilterSpec) -> Self {
        if spec.name_query.is_empty() {
            return NameMatcher::Any;
        }

        if spec.use_regex {
            if let Ok(regex) = RegexBuilder::new(&spec.name_query)
                .case_insensitive(!spec.case_sensitive)
                .build()
            {
                return NameMatcher::Pattern(regex);
            }
        }

        let needle = if spec.case_sensitive {
            spec.name_query.clone()
        } else {
            spec.name_query.to_lowercase()
        };
        NameMatcher::Substring {
            needle,
            case_sensitive: spec.case_sensitive,
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatcher::Any => true,
            NameMatcher::Pattern(regex) => regex.is_match(name),
            NameMatcher::Substring {
                needle,
                case_sensitive: true,
            } => name.contains(needle.as_str()),
            NameMatcher::Substring { needle, .. } => {
                name.to_lowercase().contains(needle.as_str())
            }
        }
    }
}

/// A `FilterSpec` with its name matcher compiled once for a whole listing
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    spec: FilterSpec,
    name: NameMatcher,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
}

impl FilterPredicate {
    pub fn new(spec: &FilterSpec) -> Self {
        Self {
            spec: spec.clone(),
            name: NameMatcher::new(spec),
            from: spec.date_from.and_then(|d| d.and_hms_opt(0, 0, 0)),
            to: spec.date_to.and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999)),
        }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn matches(&self, item: &ItemDescriptor) -> bool {
        if is_trash_folder(&item.name) {
            return false;
        }

        if !self.spec.kind_filter.accepts(item.kind) {
            return false;
        }

        if !self.name.matches(&item.name) {
            return false;
        }

        if item.kind == ItemKind::File {
            if !self.spec.extensions.is_empty() {
                match item.extension() {
                    Some(ext) if self.spec.extensions.contains(&ext) => {}
                    _ => return false,
                }
            }

            if self.spec.size_min.is_some_and(|min| item.size_bytes < min) {
                return false;
            }
            if self.spec.size_max.is_some_and(|max| item.size_bytes > max) {
                return false;
            }
        }

        if let Some(modified) = item.last_modified {
            if self.from.is_some_and(|from| modified < from) {
                return false;
            }
            if self.to.is_some_and(|to| modified > to) {
                return false;
            }
        }

        true
    }

    /// Keep matching items, in order
    pub fn apply(&self, items: &[ItemDescriptor]) -> Vec<ItemDescriptor> {
        items
            .iter()
            .filter(|item| self.matches(item))
            .cloned()
            .collect()
    }
}

/// Evaluate `spec` against one item
///
/// Compiles the name matcher on every call; prefer `FilterPredicate` for lists.
pub fn matches(item: &ItemDescriptor, spec: &FilterSpec) -> bool {
    FilterPredicate::new(spec).matches(item)
}

/// Case-insensitive check for the reserved trash folder name
pub fn is_trash_folder(name: &str) -> bool {
    name.eq_ignore_ascii_case(TRASH_FOLDER_NAME)
}

/// Remote query parameters for global mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalQuery {
    pub query: Option<String>,
    /// Comma-joined normalized extensions
    pub extension: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl GlobalQuery {
    /// Translate a spec into query parameters; unset fields are omitted
    pub fn from_spec(spec: &FilterSpec) -> Self {
        Self {
            query: (!spec.name_query.is_empty()).then(|| spec.name_query.clone()),
            extension: (!spec.extensions.is_empty())
                .then(|| spec.extensions.iter().cloned().collect::<Vec<_>>().join(",")),
            min_size: spec.size_min.filter(|v| *v > 0),
            max_size: spec.size_max.filter(|v| *v > 0),
            date_from: spec.date_from,
            date_to: spec.date_to,
        }
    }

    /// `(name, value)` pairs in a stable order for URL building
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }
        if let Some(extension) = &self.extension {
            params.push(("extension", extension.clone()));
        }
        if let Some(min) = self.min_size {
            params.push(("minSize", min.to_string()));
        }
        if let Some(max) = self.max_size {
            params.push(("maxSize", max.to_string()));
        }
        if let Some(from) = self.date_from {
            params.push(("dateFrom", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.date_to {
            params.push(("dateTo", to.format("%Y-%m-%d").to_string()));
        }
        params
    }
}
