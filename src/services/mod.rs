//! External Services
//!
//! This module contains the components that drive the remote store:
//! - listing: local directory pages and global queries behind one shape
//! - transfer: sequential upload, move and delete batches
//! - upload_plan: local tree walk producing upload destinations

pub mod listing;
pub mod transfer;
pub mod upload_plan;

// Re-export commonly used types for convenience
pub use listing::ListingSource;
pub use transfer::{BatchKind, BatchState, BatchStatus, BatchSummary, TransferOrchestrator};
