//! picbridge - Typed requests and results between an image app and its uploader
//!
//! Two cooperating desktop processes share one named, pasteboard-style
//! channel. The app writes requests (an image to upload, a version query, a
//! host list query); the uploader polls the channel, answers by overwriting it
//! with a result, and the app picks the result up on its next poll.
//!
//! ## Module Structure
//!
//! - [`ipc`] - Channel backends, payload codec, watcher, and responder
//!   - `types` - Type tags, channel items, and payload types
//!   - `codec` - Versioned envelope encoding for opaque payloads
//!   - `channel` - `SharedChannel` trait and the in-process backend
//!   - `file_channel` - Cross-process backend stored as a JSON file
//!   - `timer` - Cancellable repeating timer
//!   - `watcher` - Publishing and change detection
//!   - `parse` - Typed readers over channel snapshots
//!   - `handler` - Uploader-side request answering
//!   - `server` - Background thread driving a watcher
//! - [`settings`] - Settings persistence

pub mod ipc;
pub mod settings;
