//! Publishes typed items to the shared channel and watches it for changes.
//!
//! The watcher is an explicitly owned context object: the caller creates it
//! around a channel handle and drives it, either from its own event loop via
//! [`ChannelWatcher::poll`] or by handing it to a
//! [`WatcherThread`](super::server::WatcherThread).
//!
//! A change is any strict increase of the channel's change counter, including
//! increases caused by this watcher's own writes.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::channel::SharedChannel;
use super::codec::{self, Payload};
use super::timer::RepeatingTimer;
use super::types::{ChannelItem, ChannelSnapshot, ImageHost, ImageRequest, PasteboardType, UploadResult};
use super::DEFAULT_POLL_INTERVAL;

/// Callback invoked with the channel contents whenever a change is detected
pub type ChangeHandler = Box<dyn FnMut(&ChannelSnapshot) + Send>;

pub struct ChannelWatcher<C: SharedChannel> {
    channel: C,
    timer: Option<RepeatingTimer>,
    last_change_count: u64,
    handler: Option<ChangeHandler>,
}

impl<C: SharedChannel> ChannelWatcher<C> {
    /// Wrap `channel`. The watcher starts idle with a last-seen counter of 0.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            timer: None,
            last_change_count: 0,
            handler: None,
        }
    }

    /// The wrapped channel handle
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Whether the polling timer is armed
    pub fn is_observing(&self) -> bool {
        self.timer.as_ref().is_some_and(RepeatingTimer::is_armed)
    }

    /// Highest change counter seen so far
    pub fn last_change_count(&self) -> u64 {
        self.last_change_count
    }

    /// Polling interval of the active timer
    pub fn interval(&self) -> Option<Duration> {
        self.timer
            .as_ref()
            .filter(|timer| timer.is_armed())
            .map(RepeatingTimer::interval)
    }

    // ========================================================================
    // Observing
    // ========================================================================

    /// Start polling every `interval`, invoking `handler` on each change.
    ///
    /// Checks once immediately. Does nothing (and drops `handler`) if already
    /// observing. Returns true if this call armed the timer.
    pub fn start_observing<F>(&mut self, interval: Duration, handler: F) -> bool
    where
        F: FnMut(&ChannelSnapshot) + Send + 'static,
    {
        self.start_observing_at(interval, handler, Instant::now())
    }

    /// [`start_observing`](Self::start_observing) at the default interval
    pub fn start_observing_default<F>(&mut self, handler: F) -> bool
    where
        F: FnMut(&ChannelSnapshot) + Send + 'static,
    {
        self.start_observing(DEFAULT_POLL_INTERVAL, handler)
    }

    /// [`start_observing`](Self::start_observing) with an explicit clock reading
    pub fn start_observing_at<F>(&mut self, interval: Duration, handler: F, now: Instant) -> bool
    where
        F: FnMut(&ChannelSnapshot) + Send + 'static,
    {
        if self.is_observing() {
            debug!("Already observing channel '{}'", self.channel.name());
            return false;
        }

        let mut timer = RepeatingTimer::new(interval);
        timer.arm(now);
        info!(
            "Observing channel '{}' every {:?} (tolerance {:?})",
            self.channel.name(),
            timer.interval(),
            timer.tolerance()
        );

        self.timer = Some(timer);
        self.handler = Some(Box::new(handler));
        self.check_for_change();
        true
    }

    /// Stop polling. Safe to call when idle.
    pub fn stop_observing(&mut self) {
        if let Some(timer) = self.timer.as_mut().filter(|timer| timer.is_armed()) {
            timer.cancel();
            info!("Stopped observing channel '{}'", self.channel.name());
        }
        self.handler = None;
    }

    /// Run a pending tick, if one is due now
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// Run a pending tick, if one is due at `now`. Returns true if the
    /// handler was invoked.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        let due = match self.timer.as_mut() {
            Some(timer) => timer.take_due(now),
            None => false,
        };
        due && self.check_for_change()
    }

    /// Time until the next tick, or None when idle
    pub fn next_tick_in(&self, now: Instant) -> Option<Duration> {
        self.timer.as_ref().and_then(|t| t.time_until_next(now))
    }

    /// Compare the channel's counter with the last one seen and, if it grew,
    /// hand the current contents to the handler. Normally run by the timer.
    ///
    /// Returns true if a change was detected.
    pub fn check_for_change(&mut self) -> bool {
        let count = match self.channel.change_count() {
            Ok(count) => count,
            Err(e) => {
                debug!("Failed to read change count of '{}': {}", self.channel.name(), e);
                return false;
            }
        };
        if count <= self.last_change_count {
            return false;
        }

        let snapshot = match self.channel.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Failed to read channel '{}': {}", self.channel.name(), e);
                return false;
            }
        };

        self.last_change_count = count.max(snapshot.change_count);
        debug!(
            "Channel '{}' changed (count {}, {} item(s))",
            self.channel.name(),
            self.last_change_count,
            snapshot.items.len()
        );

        if let Some(handler) = self.handler.as_mut() {
            handler(&snapshot);
        }
        true
    }

    // ========================================================================
    // Requests (app side)
    // ========================================================================

    /// Ask the uploader to upload `image`
    pub fn write_image(&self, image: &ImageRequest) -> bool {
        self.write_payload(PasteboardType::Image, image)
    }

    /// Ask the uploader for its version
    pub fn write_version_request(&self) -> bool {
        self.write_string("", PasteboardType::UploaderVersionRequest)
    }

    /// Ask the uploader for its configured image hosts
    pub fn write_host_list_request(&self) -> bool {
        self.write_string("", PasteboardType::ImageHostListRequest)
    }

    // ========================================================================
    // Results (uploader side)
    // ========================================================================

    /// Report the outcome of an upload
    pub fn write_upload_result(&self, result: &UploadResult) -> bool {
        self.write_payload(PasteboardType::UploadResult, result)
    }

    /// Answer a version request
    pub fn write_version_result(&self, version: i64) -> bool {
        self.write_string(&version.to_string(), PasteboardType::UploaderVersionResult)
    }

    /// Answer a host list request. An empty slice is a valid answer.
    pub fn write_host_list_result(&self, hosts: &[ImageHost]) -> bool {
        self.write_payload(PasteboardType::ImageHostListResult, &hosts.to_vec())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn write_payload<P: Payload>(&self, kind: PasteboardType, payload: &P) -> bool {
        match codec::encode(payload) {
            Ok(bytes) => self.write_item(ChannelItem::bytes(kind, bytes)),
            Err(e) => {
                warn!("Failed to encode {} payload: {}", kind.tag(), e);
                false
            }
        }
    }

    fn write_string(&self, text: &str, kind: PasteboardType) -> bool {
        self.write_item(ChannelItem::text(kind, text))
    }

    /// Clear the channel, then install `item` as its only content
    fn write_item(&self, item: ChannelItem) -> bool {
        if let Err(e) = self.channel.clear_contents() {
            warn!("Failed to clear channel '{}': {}", self.channel.name(), e);
        }

        let tag = item.type_tag.clone();
        match self.channel.write_items(vec![item]) {
            Ok(count) => {
                debug!("Wrote {} to '{}' (count {})", tag, self.channel.name(), count);
                true
            }
            Err(e) => {
                warn!("Failed to write {} to '{}': {}", tag, self.channel.name(), e);
                false
            }
        }
    }
}
