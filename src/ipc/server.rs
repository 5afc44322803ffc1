//! Background thread that drives a [`ChannelWatcher`]
//!
//! The thread takes ownership of the watcher and is the only code touching it
//! until it is stopped, so every tick runs on one thread without locking.
//! Stopping hands the watcher back to the caller.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::channel::SharedChannel;
use super::watcher::ChannelWatcher;

/// Upper bound on a single sleep, so an idle watcher still notices stop
const MAX_IDLE_WAIT: Duration = Duration::from_millis(250);

/// Handle to a running watcher thread
pub struct WatcherThread<C: SharedChannel + 'static> {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<ChannelWatcher<C>>>,
}

impl<C: SharedChannel + 'static> WatcherThread<C> {
    /// Move `watcher` onto a background thread that runs its ticks.
    ///
    /// The watcher should already be observing; an idle watcher just sleeps
    /// until stopped.
    pub fn spawn(watcher: ChannelWatcher<C>) -> Result<Self, String> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let name = format!("picbridge-{}", watcher.channel().name());

        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let mut watcher = watcher;
                loop {
                    watcher.poll();

                    let wait = watcher
                        .next_tick_in(Instant::now())
                        .map_or(MAX_IDLE_WAIT, |d| d.min(MAX_IDLE_WAIT));

                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                watcher
            })
            .map_err(|e| format!("Failed to spawn watcher thread: {}", e))?;

        tracing::info!("Watcher thread started");

        Ok(Self {
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Stop the thread and return the watcher, no longer observing.
    /// Returns None if the thread panicked.
    pub fn stop(mut self) -> Option<ChannelWatcher<C>> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<ChannelWatcher<C>> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let join = self.join.take()?;
        match join.join() {
            Ok(mut watcher) => {
                watcher.stop_observing();
                tracing::info!("Watcher thread stopped");
                Some(watcher)
            }
            Err(_) => {
                tracing::error!("Watcher thread panicked");
                None
            }
        }
    }
}

impl<C: SharedChannel + 'static> Drop for WatcherThread<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
