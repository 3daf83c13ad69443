//! Storage directory and identifier resolution.
//!
//! Each identifier maps to `<root>/<identifier>`. Identifiers must stay inside
//! the root, so absolute paths and `..` components are rejected.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::handle::CacheStore;
use crate::Error;
use crate::config::{StoreConfig, WriteMode};

/// Factory for cache handles rooted at one directory.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
    write_mode: WriteMode,
    default_expiry: Duration,
}

impl CacheDir {
    /// Use `root` as-is. The directory is expected to exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_mode: WriteMode::default(), default_expiry: Duration::ZERO }
    }

    /// Build from loaded configuration, creating the directory if configured to.
    pub fn from_config(config: &StoreConfig) -> Result<Self, Error> {
        if config.create_dir {
            std::fs::create_dir_all(&config.dir).map_err(|e| Error::storage(&config.dir, e))?;
        }

        Ok(Self::new(&config.dir)
            .with_write_mode(config.write_mode)
            .with_default_expiry(config.default_expiry()))
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_default_expiry(mut self, expiry: Duration) -> Self {
        self.default_expiry = expiry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an identifier to its backing file.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` if `identifier` is empty, absolute, ends in a
    /// separator, or contains `.`/`..` components.
    pub fn path_for(&self, identifier: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(identifier);
        let valid = !identifier.is_empty()
            && !identifier.ends_with(['/', std::path::MAIN_SEPARATOR])
            && relative.components().all(|c| matches!(c, Component::Normal(_)));

        if !valid {
            return Err(Error::InvalidIdentifier(identifier.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Open the cache for `identifier`, creating its file if absent.
    ///
    /// A zero `expiry` never expires. If the file already holds metadata, the
    /// stored identifier and expiry win over the arguments.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier`, `StorageUnavailable` if the file cannot be opened
    /// or created, `CorruptMetadata` if the stored metadata block is unreadable.
    pub fn open<T>(&self, identifier: &str, expiry: Duration) -> Result<CacheStore<T>, Error>
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.path_for(identifier)?;
        CacheStore::open(path, identifier, expiry, self.write_mode)
    }

    /// [`open`](Self::open) with the directory's default expiry.
    pub fn open_default<T>(&self, identifier: &str) -> Result<CacheStore<T>, Error>
    where
        T: Serialize + DeserializeOwned,
    {
        self.open(identifier, self.default_expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_for_joins_root() {
        let dir = CacheDir::new("/var/cache/app");
        assert_eq!(dir.path_for("feeds").unwrap(), PathBuf::from("/var/cache/app/feeds"));
        assert_eq!(dir.path_for("users/42").unwrap(), PathBuf::from("/var/cache/app/users/42"));
    }

    #[test]
    fn test_path_for_rejects_escapes() {
        let dir = CacheDir::new("/var/cache/app");
        for bad in ["", "/etc/passwd", "../outside", "a/../../b", "./feeds", "feeds/"] {
            let result = dir.path_for(bad);
            assert!(matches!(result, Err(Error::InvalidIdentifier(_))), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_from_config_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("cache");
        let config = StoreConfig {
            dir: root.clone(),
            default_expiry_secs: 45,
            write_mode: WriteMode::InPlace,
            create_dir: true,
        };

        let dir = CacheDir::from_config(&config).unwrap();
        assert!(root.is_dir());
        assert_eq!(dir.root(), root.as_path());

        let store = dir.open_default::<String>("feeds").unwrap();
        assert!(store.metadata().expire_enabled());
        assert_eq!(store.write_mode(), WriteMode::InPlace);
    }

    #[test]
    fn test_open_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CacheDir::new(tmp.path().join("missing"));
        let result = dir.open::<String>("feeds", Duration::ZERO);
        assert!(matches!(result, Err(Error::StorageUnavailable { .. })));
    }
}
