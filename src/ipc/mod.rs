//! Inter-process channel between the image app and its uploader helper
//!
//! Both processes share one named, pasteboard-style channel. Each side writes
//! a single typed item (clearing whatever was there before) and polls the
//! channel's change counter to notice what the other side wrote.

pub mod channel;
pub mod codec;
pub mod file_channel;
pub mod handler;
pub mod parse;
pub mod server;
pub mod timer;
pub mod types;
pub mod watcher;

use std::time::Duration;

pub use channel::{ChannelError, MemoryChannel, SharedChannel};
pub use codec::{CodecError, Payload};
pub use file_channel::FileChannel;
pub use handler::{respond, Request, RequestHandler, Responded};
pub use parse::{
    has_host_list_request, has_version_request, parse_host_list_result, parse_image,
    parse_upload_result, parse_version_result,
};
pub use server::WatcherThread;
pub use timer::RepeatingTimer;
pub use types::{
    ChannelItem, ChannelSnapshot, ImageHost, ImageRequest, ItemData, PasteboardType, UploadError,
    UploadResult,
};
pub use watcher::ChannelWatcher;

/// Name of the shared channel both processes open
pub const CHANNEL_NAME: &str = "net.toolinbox.ipic.pasteboard";

/// Default polling interval for the watcher
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(750);

/// Timer tolerance as a percentage of the polling interval
pub const TIMER_TOLERANCE_PERCENT: u32 = 30;
