//! Per-identifier cache handle.
//!
//! Every call acquires and releases its own file handle. The only shared
//! state is the handle's mutex, which serializes `save` and `load` issued
//! through the same `CacheStore`.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;

use super::layout::{self, Header};
use super::metadata::CacheMetadata;
use crate::Error;
use crate::config::WriteMode;

/// Handle over one cache file holding a `Vec<T>` snapshot.
///
/// Obtained from [`CacheDir::open`](super::CacheDir::open). The handle is the
/// sole supported owner of its file: two handles on the same identifier, or
/// another process writing the file, are not coordinated and may observe torn
/// snapshots.
pub struct CacheStore<T> {
    metadata: CacheMetadata,
    path: PathBuf,
    write_mode: WriteMode,
    lock: Mutex<()>,
    _items: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("metadata", &self.metadata)
            .field("path", &self.path)
            .field("write_mode", &self.write_mode)
            .finish_non_exhaustive()
    }
}

impl<T> CacheStore<T> {
    pub fn metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    pub fn identifier(&self) -> &str {
        self.metadata.identifier()
    }

    /// Backing file, fixed when the handle was opened.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    /// Whether the next `load` would delete the file. Does not touch disk.
    pub fn is_expired(&self) -> bool {
        self.metadata.is_expired()
    }
}

impl<T> CacheStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open or create the file at `path`.
    ///
    /// Metadata already stored in the file replaces the defaults built from
    /// `identifier` and `expiry`.
    pub(crate) fn open(
        path: PathBuf, identifier: &str, expiry: Duration, write_mode: WriteMode,
    ) -> Result<Self, Error> {
        let defaults = CacheMetadata::new(identifier, expiry);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::storage(&path, e))?;

        let metadata = match layout::read_header(&mut file, &path) {
            Ok(Header::Length(len)) => {
                let block = layout::read_block(&mut file, len, &path)?;
                let stored = CacheMetadata::decode(&block)?;
                if stored.identifier() != identifier {
                    tracing::warn!(
                        requested = identifier,
                        stored = stored.identifier(),
                        path = %path.display(),
                        "Cache file carries a different identifier; keeping stored metadata"
                    );
                }
                tracing::debug!(identifier, metadata_len = len, "Loaded cache metadata");
                stored
            }
            Ok(Header::Missing) => {
                tracing::debug!(identifier, path = %path.display(), "Created new cache");
                defaults
            }
            Ok(Header::Truncated(n)) => {
                tracing::warn!(identifier, header_bytes = n, "Cache header truncated; starting fresh");
                defaults
            }
            Err(e) => {
                tracing::warn!(identifier, error = %e, "Cache header unreadable; starting fresh");
                defaults
            }
        };

        Ok(Self { metadata, path, write_mode, lock: Mutex::new(()), _items: PhantomData })
    }

    /// Replace the stored snapshot with `items`.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` on any I/O failure, `EncodeFailure` if metadata or
    /// items fail to serialize. In `WriteMode::InPlace` a failed save leaves
    /// the file in an indeterminate state; in `WriteMode::Atomic` the previous
    /// snapshot survives.
    pub fn save(&self, items: &[T]) -> Result<(), Error> {
        let _guard = self.lock.lock();

        let block = self.metadata.encode()?;
        match self.write_mode {
            WriteMode::InPlace => self.write_in_place(&block, items)?,
            WriteMode::Atomic => self.write_and_rename(&block, items)?,
        }

        tracing::debug!(
            identifier = self.identifier(),
            items = items.len(),
            metadata_len = block.len(),
            "Saved cache snapshot"
        );
        Ok(())
    }

    /// Last saved snapshot, or `None` if the cache is expired, empty, missing,
    /// or unreadable.
    ///
    /// An expired cache has its file deleted.
    pub fn load(&self) -> Option<Vec<T>> {
        match self.try_load() {
            Ok(items) => items,
            Err(e) if e.is_absent() => {
                tracing::debug!(identifier = self.identifier(), reason = %e, "Cache absent");
                None
            }
            Err(e) => {
                tracing::warn!(identifier = self.identifier(), error = %e, "Cache unreadable; treating as absent");
                None
            }
        }
    }

    /// Like [`load`](Self::load), but tells the failure modes apart.
    ///
    /// Returns `Ok(None)` for a file that has never been saved to, and
    /// `Err(Error::Expired)` after deleting an expired file.
    pub fn try_load(&self) -> Result<Option<Vec<T>>, Error> {
        let _guard = self.lock.lock();

        if self.metadata.is_expired() {
            self.remove_expired();
            return Err(Error::Expired(self.identifier().to_string()));
        }

        let mut file = File::open(&self.path).map_err(|e| Error::storage(&self.path, e))?;
        match layout::read_header(&mut file, &self.path)? {
            Header::Missing => Ok(None),
            Header::Truncated(n) => Err(Error::CorruptMetadata(format!("header truncated to {n} bytes"))),
            Header::Length(len) => layout::read_payload(&mut file, len, &self.path).map(Some),
        }
    }

    fn write_in_place(&self, block: &[u8], items: &[T]) -> Result<(), Error> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| Error::storage(&self.path, e))?;

        layout::write_record(&mut BufWriter::new(file), block, items, &self.path)
    }

    /// Write into a uniquely named temp file beside the cache file, then rename
    /// it over the cache file. The temp file is created exclusively, so it never
    /// clobbers another identifier's file, and it is removed on drop if the save fails.
    fn write_and_rename(&self, block: &[u8], items: &[T]) -> Result<(), Error> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let tmp = NamedTempFile::new_in(parent).map_err(|e| Error::storage(parent, e))?;
        let mut writer = BufWriter::new(tmp);
        layout::write_record(&mut writer, block, items, &self.path)?;

        let tmp = writer.into_inner().map_err(|e| Error::storage(&self.path, e.into_error()))?;
        tmp.as_file().sync_all().map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| Error::storage(&self.path, e.error))?;
        Ok(())
    }

    fn remove_expired(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(
                identifier = self.identifier(),
                expired_at = %self.metadata.expiry_time(),
                "Removed expired cache file"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                identifier = self.identifier(),
                error = %e,
                "Failed to remove expired cache file"
            ),
        }
    }
}
