//! The shared channel abstraction and its in-process backend

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use super::types::{ChannelItem, ChannelSnapshot};

/// Errors raised by a channel backend
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Backing storage could not be read or written
    #[error("Channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored channel state could not be parsed
    #[error("Corrupt channel state: {0}")]
    Corrupt(String),

    /// Channel name is unusable for this backend
    #[error("Invalid channel name: {0}")]
    InvalidName(String),

    /// Backing storage location could not be determined
    #[error("Channel directory not available")]
    NoChannelDir,

    /// A previous holder of the channel state panicked
    #[error("Channel state poisoned")]
    Poisoned,
}

/// A named, last-writer-wins store of typed items with a change counter.
///
/// Every successful `clear_contents` or `write_items` bumps the change
/// counter by one and returns its new value. Clearing and then writing are
/// two separate operations: a concurrent reader may see the empty state in
/// between.
pub trait SharedChannel: Send {
    /// Channel identifier
    fn name(&self) -> &str;

    /// Current change counter
    fn change_count(&self) -> Result<u64, ChannelError>;

    /// Remove all items
    fn clear_contents(&self) -> Result<u64, ChannelError>;

    /// Replace the channel contents with `items`
    fn write_items(&self, items: Vec<ChannelItem>) -> Result<u64, ChannelError>;

    /// Read the counter and items together
    fn snapshot(&self) -> Result<ChannelSnapshot, ChannelError>;
}

/// In-process channel. Clones share the same contents and counter.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    name: String,
    state: Arc<Mutex<ChannelSnapshot>>,
}

impl MemoryChannel {
    /// Fresh empty channel with a counter of 0
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(ChannelSnapshot::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChannelSnapshot>, ChannelError> {
        self.state.lock().map_err(|_| ChannelError::Poisoned)
    }
}

impl SharedChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn change_count(&self) -> Result<u64, ChannelError> {
        Ok(self.lock()?.change_count)
    }

    fn clear_contents(&self) -> Result<u64, ChannelError> {
        let mut state = self.lock()?;
        state.items.clear();
        state.change_count += 1;
        Ok(state.change_count)
    }

    fn write_items(&self, items: Vec<ChannelItem>) -> Result<u64, ChannelError> {
        let mut state = self.lock()?;
        state.items = items;
        state.change_count += 1;
        Ok(state.change_count)
    }

    fn snapshot(&self) -> Result<ChannelSnapshot, ChannelError> {
        Ok(self.lock()?.clone())
    }
}
