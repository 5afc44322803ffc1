//! File-backed channel shared between processes.
//!
//! Each channel is one JSON document, `<dir>/<name>.json`, holding the change
//! counter and the current items. Updates are read-modify-write and land via
//! a temp file plus rename, so readers see either the old or the new document
//! and never a partial one. Two processes updating at the same instant can
//! still both write the same counter value; like the pasteboard it stands in
//! for, the channel makes no atomicity promise across writers.
//!
//! Each handle remembers the highest counter it has read or written, and
//! never writes a counter at or below it. A deleted or corrupted file
//! therefore cannot send the counter backwards through a handle that has
//! already seen the channel.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::channel::{ChannelError, SharedChannel};
use super::types::{ChannelItem, ChannelSnapshot};

/// Subdirectory of the runtime (or cache) dir holding channel files
const CHANNEL_DIR_NAME: &str = "picbridge";

/// Default directory for channel files.
/// Returns None if neither a runtime nor a cache directory is known.
pub fn default_channel_dir() -> Option<PathBuf> {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .map(|base| base.join(CHANNEL_DIR_NAME))
}

/// Channel persisted as a JSON file. Clones share the counter floor.
#[derive(Debug, Clone)]
pub struct FileChannel {
    name: String,
    path: PathBuf,
    floor: Arc<AtomicU64>,
}

impl FileChannel {
    /// Open `name` in the default channel directory
    pub fn open(name: &str) -> Result<Self, ChannelError> {
        let dir = default_channel_dir().ok_or(ChannelError::NoChannelDir)?;
        Self::open_in(dir, name)
    }

    /// Open `name` inside `dir`. The file is created on first write.
    pub fn open_in(dir: impl AsRef<Path>, name: &str) -> Result<Self, ChannelError> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            path: dir.as_ref().join(format!("{}.json", name)),
            floor: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest counter this handle (or a clone) has read or written
    pub fn counter_floor(&self) -> u64 {
        self.floor.load(Ordering::SeqCst)
    }

    fn read_state(&self) -> Result<ChannelSnapshot, ChannelError> {
        let state: ChannelSnapshot = match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ChannelError::Corrupt(format!("{}: {}", self.path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => ChannelSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        self.floor.fetch_max(state.change_count, Ordering::SeqCst);
        Ok(state)
    }

    fn write_state(&self, state: &ChannelSnapshot) -> Result<(), ChannelError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_vec(state)
            .map_err(|e| ChannelError::Corrupt(format!("failed to serialize state: {}", e)))?;

        let tmp_path = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp_path, content)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn replace_items(&self, items: Vec<ChannelItem>) -> Result<u64, ChannelError> {
        let stored = match self.read_state() {
            Ok(current) => current.change_count,
            Err(e @ ChannelError::Corrupt(_)) => {
                tracing::warn!("Overwriting unreadable channel '{}': {}", self.name, e);
                0
            }
            Err(e) => return Err(e),
        };

        let floor = self.counter_floor();
        if stored < floor {
            tracing::warn!(
                "Channel '{}' counter fell from {} to {}, continuing from {}",
                self.name,
                floor,
                stored,
                floor
            );
        }

        let next = ChannelSnapshot {
            change_count: stored.max(floor) + 1,
            items,
        };
        self.write_state(&next)?;
        self.floor.fetch_max(next.change_count, Ordering::SeqCst);
        Ok(next.change_count)
    }
}

impl SharedChannel for FileChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn change_count(&self) -> Result<u64, ChannelError> {
        Ok(self.read_state()?.change_count)
    }

    fn clear_contents(&self) -> Result<u64, ChannelError> {
        self.replace_items(Vec::new())
    }

    fn write_items(&self, items: Vec<ChannelItem>) -> Result<u64, ChannelError> {
        self.replace_items(items)
    }

    fn snapshot(&self) -> Result<ChannelSnapshot, ChannelError> {
        self.read_state()
    }
}

fn validate_name(name: &str) -> Result<(), ChannelError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(ChannelError::InvalidName(name.to_string()));
    }
    Ok(())
}
