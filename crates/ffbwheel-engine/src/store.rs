//! Settings persistence and change notification.
//!
//! A store owns the single writer side of a `watch` channel. Every
//! successful [`SettingsStore::save`] publishes the new snapshot, so the
//! torque loop picks it up on its next tick without polling the store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use ffbwheel_errors::{ConfigurationError, WheelError};
use tokio::fs as async_fs;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::Settings;

/// Persistent settings with change notification.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the persisted settings.
    async fn load(&self) -> Result<Settings, WheelError>;

    /// Validate, persist and publish `settings`. On error nothing is
    /// published and the previous settings remain current.
    async fn save(&self, settings: Settings) -> Result<(), WheelError>;

    /// Receiver that observes every published snapshot.
    fn subscribe(&self) -> watch::Receiver<Settings>;

    /// Most recently published snapshot.
    fn current(&self) -> Settings;
}

/// Store that keeps settings in memory only.
#[derive(Debug)]
pub struct MemorySettingsStore {
    tx: watch::Sender<Settings>,
    saves: AtomicU64,
    fail_saves: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new(initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            saves: AtomicU64::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Make subsequent saves fail as if the medium were unavailable.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::Relaxed);
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings, WheelError> {
        Ok(self.current())
    }

    async fn save(&self, settings: Settings) -> Result<(), WheelError> {
        settings.validate()?;
        if self.fail_saves.load(Ordering::Relaxed) {
            return Err(ConfigurationError::Persist("memory store set to fail".into()).into());
        }
        self.tx.send_replace(settings);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }
}

/// JSON file store with atomic replace.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    tx: watch::Sender<Settings>,
}

impl FileSettingsStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields defaults. A file that cannot be decoded or
    /// fails validation is logged and also yields defaults; it is only
    /// replaced on the next save.
    ///
    /// # Errors
    ///
    /// I/O errors other than a missing file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, WheelError> {
        let path = path.into();
        let initial = match read_settings(&path).await {
            Ok(Some(settings)) => {
                info!(path = ?path, lock = %settings.lock_to_lock, "Loaded settings");
                settings
            }
            Ok(None) => {
                info!(path = ?path, "No settings file, using defaults");
                Settings::default()
            }
            Err(WheelError::Configuration(e)) => {
                warn!(path = ?path, error = %e, "Ignoring invalid settings file, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e),
        };
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_settings(path: &Path) -> Result<Option<Settings>, WheelError> {
    match async_fs::read_to_string(path).await {
        Ok(content) => Ok(Some(Settings::from_json(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    debug!(path = ?path, "Writing settings atomically");
    let temp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        async_fs::create_dir_all(parent).await?;
    }
    async_fs::write(&temp_path, content).await?;
    async_fs::rename(&temp_path, path).await
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<Settings, WheelError> {
        Ok(read_settings(&self.path).await?.unwrap_or_default())
    }

    async fn save(&self, settings: Settings) -> Result<(), WheelError> {
        settings.validate()?;
        let json = settings.to_json()?;
        write_atomic(&self.path, &json)
            .await
            .map_err(|e| ConfigurationError::Persist(format!("{}: {e}", self.path.display())))?;
        debug!(path = ?self.path, "Settings persisted");
        self.tx.send_replace(settings);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }
}
