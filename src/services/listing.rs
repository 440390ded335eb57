//! Listing sources
//!
//! A directory page and a global query page have the same shape; callers fetch
//! through `ListingSource` without caring which one backs the view.

use tracing::debug;

use crate::api::RemoteStore;
use crate::logic::errors::StoreError;
use crate::logic::filter::{is_trash_folder, GlobalQuery, SearchMode};
use crate::model::browser::Browser;
use crate::model::types::{ItemDescriptor, ListingPage};

/// Page size used when listing move destinations
pub const FOLDER_PICKER_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    /// Children of one folder
    Local { path: String },
    /// Store-wide query; results carry absolute paths
    Global { query: GlobalQuery },
}

impl ListingSource {
    /// Source backing the browser's current view
    ///
    /// `None` in global mode without query terms: there is nothing to ask for.
    pub fn for_browser(browser: &Browser) -> Option<Self> {
        let spec = browser.filter();
        match spec.mode {
            SearchMode::Local => Some(ListingSource::Local {
                path: browser.current_path().to_string(),
            }),
            SearchMode::Global if spec.has_query_terms() => Some(ListingSource::Global {
                query: GlobalQuery::from_spec(spec),
            }),
            SearchMode::Global => None,
        }
    }

    pub async fn fetch(
        &self,
        store: &dyn RemoteStore,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, StoreError> {
        match self {
            ListingSource::Local { path } => {
                debug!(path = %path, page, page_size, "listing folder");
                store.list_children(path, page, page_size).await
            }
            ListingSource::Global { query } => {
                debug!(?query, page, page_size, "global query");
                store.query_global(query, page, page_size).await
            }
        }
    }
}

/// Fetch the browser's current page and install it
///
/// Global mode with no query terms installs an empty page without calling the
/// store.
pub async fn refresh(browser: &mut Browser, store: &dyn RemoteStore) -> Result<(), StoreError> {
    let page = match ListingSource::for_browser(browser) {
        Some(source) => {
            source
                .fetch(store, browser.page(), browser.page_size())
                .await?
        }
        None => ListingPage {
            total_pages: 1,
            ..ListingPage::default()
        },
    };
    browser.apply_page(page);
    Ok(())
}

/// Child folders of `path`, for picking a move destination
pub async fn list_folders(
    store: &dyn RemoteStore,
    path: &str,
) -> Result<Vec<ItemDescriptor>, StoreError> {
    let page = store
        .list_children(path, 1, FOLDER_PICKER_PAGE_SIZE)
        .await?;
    Ok(page
        .items
        .into_iter()
        .filter(|item| item.is_folder() && !is_trash_folder(&item.name))
        .collect())
}

/// Find the child `name` of `parent`, paging through the folder
///
/// Stops at the first page that contains it; `None` once every page has been
/// seen without a match.
pub async fn find_child(
    store: &dyn RemoteStore,
    parent: &str,
    name: &str,
) -> Result<Option<ItemDescriptor>, StoreError> {
    let mut page = 1;
    loop {
        let listing = store
            .list_children(parent, page, FOLDER_PICKER_PAGE_SIZE)
            .await?;
        if let Some(found) = listing.items.into_iter().find(|item| item.name == name) {
            return Ok(Some(found));
        }
        if page >= listing.total_pages {
            debug!(parent, name, pages = page, "child not found");
            return Ok(None);
        }
        page += 1;
    }
}
