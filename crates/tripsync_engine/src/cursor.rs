//! Sync cursor persistence.
//!
//! The cursor is the only state the sync core owns: a single optional
//! timestamp marking the last point in remote history this device has
//! observed. `None` means "pull everything".

use crate::error::{SyncError, SyncResult};
use crate::persist::{read_json, write_json};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tripsync_protocol::Timestamp;

/// Durable single-value watermark.
pub trait CursorStore: Send + Sync {
    /// Returns the saved cursor.
    fn last_pulled_at(&self) -> SyncResult<Option<Timestamp>>;

    /// Replaces the saved cursor.
    fn save(&self, last_pulled_at: Option<Timestamp>) -> SyncResult<()>;
}

impl<C: CursorStore + ?Sized> CursorStore for Arc<C> {
    fn last_pulled_at(&self) -> SyncResult<Option<Timestamp>> {
        (**self).last_pulled_at()
    }

    fn save(&self, last_pulled_at: Option<Timestamp>) -> SyncResult<()> {
        (**self).save(last_pulled_at)
    }
}

/// An in-memory cursor store.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    value: RwLock<Option<Timestamp>>,
    saves: AtomicUsize,
}

impl MemoryCursorStore {
    /// Creates a store with no cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `value`.
    pub fn with_value(value: Timestamp) -> Self {
        Self {
            value: RwLock::new(Some(value)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Returns how many times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CursorStore for MemoryCursorStore {
    fn last_pulled_at(&self) -> SyncResult<Option<Timestamp>> {
        Ok(*self.value.read())
    }

    fn save(&self, last_pulled_at: Option<Timestamp>) -> SyncResult<()> {
        *self.value.write() = last_pulled_at;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorFile {
    last_pulled_at: Option<Timestamp>,
}

/// A cursor store persisted as a small JSON file.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so the stored value is never torn. The value is cached after `open`.
#[derive(Debug)]
pub struct FileCursorStore {
    path: PathBuf,
    cached: RwLock<Option<Timestamp>>,
}

impl FileCursorStore {
    /// Opens the cursor file, treating a missing file as "no cursor".
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let file: Option<CursorFile> = read_json(&path).map_err(cursor_error)?;
        Ok(Self {
            path,
            cached: RwLock::new(file.and_then(|f| f.last_pulled_at)),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CursorStore for FileCursorStore {
    fn last_pulled_at(&self) -> SyncResult<Option<Timestamp>> {
        Ok(*self.cached.read())
    }

    fn save(&self, last_pulled_at: Option<Timestamp>) -> SyncResult<()> {
        let mut cached = self.cached.write();
        write_json(&self.path, &CursorFile { last_pulled_at }).map_err(cursor_error)?;
        *cached = last_pulled_at;
        Ok(())
    }
}

fn cursor_error(err: SyncError) -> SyncError {
    match err {
        SyncError::Cursor(_) => err,
        other => SyncError::Cursor(other.to_string()),
    }
}
