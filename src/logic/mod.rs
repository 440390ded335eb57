//! Business Logic
//!
//! This module contains pure business logic functions that can be unit tested:
//! - errors: Per-item failure taxonomy and error classification
//! - filter: Compound listing predicates and global query translation
//! - formatting: Byte and throughput formatting
//! - path: Path composition, breadcrumbs and upload targets

pub mod errors;
pub mod filter;
pub mod formatting;
pub mod path;
