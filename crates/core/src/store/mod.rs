//! Single-file snapshot cache.
//!
//! Each identifier owns one file holding a length-prefixed metadata block
//! followed by the serialized item sequence. This module provides:
//!
//! - Load-on-open: stored metadata overrides constructor defaults
//! - Full-snapshot saves, atomic (temp + rename) or in place
//! - Expiry on read: an expired `load` deletes the file
//! - Per-handle mutual exclusion for `save` and `load`

pub mod dir;
pub mod handle;
mod layout;
pub mod metadata;

pub use dir::CacheDir;
pub use handle::CacheStore;
pub use metadata::CacheMetadata;
