//! Fileshelf client library
//!
//! Path arithmetic, listing filters, selection state and the batch transfer
//! engine for a remote hierarchical file store. Exposes modules for testing
//! and for the `fileshelf` binary.

pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod services;
pub mod utils;
