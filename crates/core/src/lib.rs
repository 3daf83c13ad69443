//! Disk-persisted, expiring snapshot cache.
//!
//! This crate provides:
//! - Single-file cache store with a length-prefixed metadata header
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod store;

pub use config::{StoreConfig, WriteMode};
pub use error::Error;
pub use store::{CacheDir, CacheMetadata, CacheStore};
