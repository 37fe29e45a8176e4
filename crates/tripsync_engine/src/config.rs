//! Configuration and feature flags for the sync engine.

use crate::error::{SyncError, SyncResult};
use crate::persist::{read_json, write_json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Configuration for sync operations.
///
/// Sync is opt-in: `sync_enabled` defaults to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Device ID (unique per device).
    pub device_id: Uuid,
    /// Server URL used by the HTTP transport.
    pub server_url: String,
    /// Whether the user has opted in to sync.
    pub sync_enabled: bool,
    /// Page size the HTTP transport requests while pulling.
    pub pull_page_size: u32,
    /// Maximum envelopes per push request.
    pub push_batch_size: u32,
}

impl SyncConfig {
    /// Creates a new sync configuration with sync disabled.
    pub fn new(device_id: Uuid, server_url: impl Into<String>) -> Self {
        Self {
            device_id,
            server_url: server_url.into(),
            sync_enabled: false,
            pull_page_size: 500,
            push_batch_size: 500,
        }
    }

    /// Sets whether sync is enabled.
    pub fn with_sync_enabled(mut self, enabled: bool) -> Self {
        self.sync_enabled = enabled;
        self
    }

    /// Sets the pull page size.
    pub fn with_pull_page_size(mut self, size: u32) -> Self {
        self.pull_page_size = size;
        self
    }

    /// Sets the push batch size.
    pub fn with_push_batch_size(mut self, size: u32) -> Self {
        self.push_batch_size = size;
        self
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> SyncResult<Self> {
        read_json(path)?.ok_or_else(|| {
            SyncError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            ))
        })
    }

    /// Writes the configuration to a JSON file.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        write_json(path, self)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(Uuid::nil(), "")
    }
}

/// Source of the sync opt-in flag consulted by [`SyncGate`](crate::SyncGate).
pub trait FeatureFlagProvider: Send + Sync {
    /// Returns true if the user has opted in to sync.
    fn is_sync_enabled(&self) -> bool;

    /// Records the user's choice.
    fn set_sync_enabled(&self, enabled: bool) -> SyncResult<()>;
}

/// Flag provider seeded from [`SyncConfig::sync_enabled`].
///
/// The flag lives for the lifetime of the process only. Hosts that need the
/// choice to survive restarts should use [`FileFeatureFlags`] or implement
/// [`FeatureFlagProvider`] over their own preferences store.
#[derive(Debug, Default)]
pub struct ConfigFlags {
    enabled: AtomicBool,
}

impl ConfigFlags {
    /// Creates flags with an explicit initial value.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Creates flags from a configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.sync_enabled)
    }
}

impl FeatureFlagProvider for ConfigFlags {
    fn is_sync_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_sync_enabled(&self, enabled: bool) -> SyncResult<()> {
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FlagsFile {
    sync_enabled: bool,
}

/// Flag provider persisted to a JSON file.
///
/// A missing file reads as disabled. Every `set_sync_enabled` call is
/// written through before it returns; the in-memory value only changes once
/// the write has succeeded.
#[derive(Debug)]
pub struct FileFeatureFlags {
    path: PathBuf,
    enabled: AtomicBool,
}

impl FileFeatureFlags {
    /// Opens (or lazily creates) a flags file.
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let enabled = read_json::<FlagsFile>(&path)?
            .map(|f| f.sync_enabled)
            .unwrap_or(false);
        Ok(Self {
            path,
            enabled: AtomicBool::new(enabled),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeatureFlagProvider for FileFeatureFlags {
    fn is_sync_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_sync_enabled(&self, enabled: bool) -> SyncResult<()> {
        write_json(
            &self.path,
            &FlagsFile {
                sync_enabled: enabled,
            },
        )?;
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}

impl<F: FeatureFlagProvider + ?Sized> FeatureFlagProvider for std::sync::Arc<F> {
    fn is_sync_enabled(&self) -> bool {
        (**self).is_sync_enabled()
    }

    fn set_sync_enabled(&self, enabled: bool) -> SyncResult<()> {
        (**self).set_sync_enabled(enabled)
    }
}
