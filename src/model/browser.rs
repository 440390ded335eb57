//! Browser state
//!
//! Bundles the navigation position, the fetched page, the active filter and the
//! selection over the displayed items. Every change that replaces the displayed
//! sequence (new page, new path, new filter, new results) rebinds the selection.

use crate::logic::filter::{is_trash_folder, FilterPredicate, FilterSpec, SearchMode};
use crate::logic::path;
use crate::model::selection::SelectionModel;
use crate::model::types::{BatchItem, ItemDescriptor, ListingPage};

#[derive(Debug, Clone)]
pub struct Browser {
    root_path: String,
    current_path: String,
    page: u32,
    page_size: u32,
    total_pages: u32,
    total_count: u64,
    /// Raw page as fetched
    items: Vec<ItemDescriptor>,
    /// `items` narrowed by the predicate; what indices refer to
    displayed: Vec<ItemDescriptor>,
    predicate: FilterPredicate,
    selection: SelectionModel,
}

impl Browser {
    pub fn new(root_path: impl Into<String>, page_size: u32) -> Self {
        let root_path = path::normalize(&root_path.into())
            .trim_end_matches('/')
            .to_string();
        Self {
            current_path: root_path.clone(),
            root_path,
            page: 1,
            page_size: page_size.max(1),
            total_pages: 1,
            total_count: 0,
            items: Vec::new(),
            displayed: Vec::new(),
            predicate: FilterPredicate::new(&FilterSpec::default()),
            selection: SelectionModel::new(),
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn filter(&self) -> &FilterSpec {
        self.predicate.spec()
    }

    pub fn is_global(&self) -> bool {
        self.filter().mode == SearchMode::Global
    }

    /// Items the selection indices refer to
    pub fn display_items(&self) -> &[ItemDescriptor] {
        &self.displayed
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionModel {
        &mut self.selection
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        path::breadcrumbs(&self.root_path, &self.current_path)
    }

    /// Install a freshly fetched page
    pub fn apply_page(&mut self, page: ListingPage) {
        self.total_pages = page.total_pages.max(1);
        self.total_count = page.total_count;
        self.items = page.items;
        self.refilter();
    }

    /// Replace the filter; returns true when the listing must be refetched
    ///
    /// Local filters narrow the page already held. Switching mode, or changing
    /// a global query, needs a new fetch from page 1.
    pub fn set_filter(&mut self, spec: FilterSpec) -> bool {
        let previous = self.predicate.spec().clone();
        let refetch = spec.mode != previous.mode
            || (spec.mode == SearchMode::Global && spec != previous);

        self.predicate = FilterPredicate::new(&spec);
        if refetch {
            self.page = 1;
            self.clear_page();
        } else {
            self.refilter();
        }
        refetch
    }

    pub fn clear_filters(&mut self) -> bool {
        self.set_filter(FilterSpec::default())
    }

    /// Enter a child folder
    ///
    /// A global result whose path lies under the root jumps there and drops
    /// back to local mode, keeping the other filter terms. Anything else is
    /// joined onto the current folder and the search mode is left alone.
    pub fn open_folder(&mut self, item: &ItemDescriptor) {
        if !item.is_folder() {
            return;
        }

        match &item.path {
            Some(full) if path::is_within(full, &self.root_path) => {
                if self.is_global() {
                    let spec = self.predicate.spec().clone().with_mode(SearchMode::Local);
                    self.predicate = FilterPredicate::new(&spec);
                }
                self.navigate(path::normalize(full));
            }
            _ => {
                let target = path::join(&self.current_path, &item.name);
                self.navigate(target);
            }
        }
    }

    /// Move to the parent folder, stopping at the root
    pub fn go_up(&mut self) -> bool {
        let target = path::parent(&self.current_path, &self.root_path);
        if target == self.current_path {
            return false;
        }
        self.navigate(target);
        true
    }

    /// Jump to the breadcrumb at `index`
    pub fn open_breadcrumb(&mut self, index: usize) {
        let target = path::breadcrumb_target(&self.root_path, &self.current_path, index);
        if target != self.current_path {
            self.navigate(target);
        }
    }

    pub fn go_to_root(&mut self) {
        let root = self.root_path.clone();
        self.navigate(root);
    }

    /// Select page `page`; only `1..=total_pages` is accepted
    pub fn go_to_page(&mut self, page: u32) -> bool {
        if page == 0 || page > self.total_pages || page == self.page {
            return false;
        }
        self.page = page;
        self.clear_page();
        true
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        self.page = 1;
        self.clear_page();
    }

    /// Selected entries as batch items, in display order
    pub fn selected_batch_items(&self) -> Vec<BatchItem> {
        self.selection
            .resolve(&self.displayed)
            .iter()
            .map(|item| item.to_batch_item(&self.current_path))
            .collect()
    }

    fn navigate(&mut self, target: String) {
        self.current_path = target;
        self.page = 1;
        self.total_pages = 1;
        self.clear_page();
    }

    fn clear_page(&mut self) {
        self.items.clear();
        self.total_count = 0;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.displayed = match self.filter().mode {
            // The store already applied the predicate
            SearchMode::Global => self
                .items
                .iter()
                .filter(|item| !is_trash_folder(&item.name))
                .cloned()
                .collect(),
            SearchMode::Local => self.predicate.apply(&self.items),
        };
        self.selection.rebind(self.displayed.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::filter::KindFilter;

    fn page_of(items: Vec<ItemDescriptor>, total_pages: u32) -> ListingPage {
        let total_count = items.len() as u64;
        ListingPage {
            items,
            total_pages,
            total_count,
        }
    }

    fn sample() -> Vec<ItemDescriptor> {
        vec![
            ItemDescriptor::folder("docs"),
            ItemDescriptor::folder(".trash"),
            ItemDescriptor::file("a.txt", 10),
            ItemDescriptor::file("b.jpg", 20),
        ]
    }

    #[test]
    fn test_apply_page_hides_trash() {
        let mut browser = Browser::new("users/ann", 50);
        browser.apply_page(page_of(sample(), 1));
        let names: Vec<_> = browser.display_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "a.txt", "b.jpg"]);
    }

    #[test]
    fn test_local_filter_does_not_refetch_and_clears_selection() {
        let mut browser = Browser::new("users/ann", 50);
        browser.apply_page(page_of(sample(), 1));
        browser.selection_mut().select_all(3);

        let refetch = browser.set_filter(FilterSpec::default().with_kind(KindFilter::FilesOnly));
        assert!(!refetch);
        assert_eq!(browser.display_items().len(), 2);
        assert!(browser.selection().is_empty());
        assert_eq!(browser.selection().bound_len(), 2);
    }

    #[test]
    fn test_switch_to_global_requests_fetch() {
        let mut browser = Browser::new("", 50);
        browser.apply_page(page_of(sample(), 1));
        let refetch = browser.set_filter(
            FilterSpec::default()
                .with_mode(SearchMode::Global)
                .with_name_query("a"),
        );
        assert!(refetch);
        assert!(browser.display_items().is_empty());
    }

    #[test]
    fn test_navigation_stays_under_root() {
        let mut browser = Browser::new("users/ann", 50);
        browser.open_folder(&ItemDescriptor::folder("docs"));
        assert_eq!(browser.current_path(), "users/ann/docs");
        assert_eq!(browser.breadcrumbs(), vec!["docs"]);

        assert!(browser.go_up());
        assert_eq!(browser.current_path(), "users/ann");
        assert!(!browser.go_up());
    }

    #[test]
    fn test_global_folder_outside_root_joins_and_stays_global() {
        let mut browser = Browser::new("users/ann", 50);
        browser.set_filter(
            FilterSpec::default()
                .with_mode(SearchMode::Global)
                .with_name_query("team"),
        );
        browser.open_folder(&ItemDescriptor::folder("team").with_path("shared/team"));
        assert_eq!(browser.current_path(), "users/ann/team");
        assert!(browser.is_global());
    }

    #[test]
    fn test_open_file_is_ignored() {
        let mut browser = Browser::new("root", 50);
        browser.open_folder(&ItemDescriptor::file("a.txt", 1));
        assert_eq!(browser.current_path(), "root");
    }

    #[test]
    fn test_page_bounds() {
        let mut browser = Browser::new("", 10);
        browser.apply_page(page_of(sample(), 3));
        assert!(!browser.go_to_page(0));
        assert!(!browser.go_to_page(4));
        assert!(browser.go_to_page(3));
        assert_eq!(browser.page(), 3);

        browser.set_page_size(25);
        assert_eq!(browser.page(), 1);
        assert_eq!(browser.page_size(), 25);
    }
}
