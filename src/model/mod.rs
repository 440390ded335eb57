//! Owned client state
//!
//! State objects are plain values owned by their caller and mutated only
//! through their own methods:
//!
//! - **types**: canonical store entries and batch units
//! - **selection**: indices chosen from the displayed listing
//! - **browser**: navigation, paging, filter and selection bundled together

pub mod browser;
pub mod selection;
pub mod types;

pub use browser::Browser;
pub use selection::SelectionModel;
pub use types::{BatchItem, ItemDescriptor, ItemKind, ListingPage, UploadItem};
