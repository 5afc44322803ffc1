//! Tests for change detection and the observing lifecycle
//!
//! Tests cover:
//! - One callback per counter increase, none when unchanged
//! - Idempotent start and stop
//! - No callbacks after stop
//! - Last-write-wins contents

use std::time::{Duration, Instant};

use picbridge::ipc::{
    parse_version_result, ChannelSnapshot, ChannelWatcher, ImageRequest, MemoryChannel,
    PasteboardType, SharedChannel, UploadResult, DEFAULT_POLL_INTERVAL,
};

use crate::common::{call_count, memory_pair, recording_handler};

const INTERVAL: Duration = Duration::from_millis(100);

// ============================================
// Change Detection Tests
// ============================================

#[test]
fn test_callback_once_per_counter_increase() {
    let (mut app, uploader) = memory_pair("detect");
    let (seen, handler) = recording_handler();
    app.start_observing(INTERVAL, handler);

    for version in 1..=3 {
        uploader.write_version_result(version);
        assert!(app.check_for_change());
        // Unchanged on the following check
        assert!(!app.check_for_change());
    }

    assert_eq!(call_count(&seen), 3);
    let versions: Vec<_> = seen
        .lock()
        .unwrap()
        .iter()
        .filter_map(parse_version_result)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[test]
fn test_several_writes_between_ticks_fire_once() {
    let (mut app, uploader) = memory_pair("coalesce");
    let (seen, handler) = recording_handler();
    app.start_observing(INTERVAL, handler);

    uploader.write_version_result(1);
    uploader.write_host_list_request();
    uploader.write_version_result(2);
    app.check_for_change();

    assert_eq!(call_count(&seen), 1);
    let snapshot = seen.lock().unwrap()[0].clone();
    assert_eq!(parse_version_result(&snapshot), Some(2));
}

#[test]
fn test_observed_counter_never_decreases() {
    let (mut app, uploader) = memory_pair("monotonic");
    app.start_observing(INTERVAL, |_| {});

    let mut last = app.last_change_count();
    for _ in 0..5 {
        uploader.write_host_list_request();
        app.check_for_change();
        assert!(app.last_change_count() > last);
        last = app.last_change_count();
    }
    assert_eq!(last, uploader.channel().change_count().unwrap());
}

#[test]
fn test_own_writes_count_as_changes() {
    let (mut app, _uploader) = memory_pair("own-writes");
    let (seen, handler) = recording_handler();
    app.start_observing(INTERVAL, handler);

    app.write_version_request();
    app.check_for_change();

    assert_eq!(call_count(&seen), 1);
    assert!(seen.lock().unwrap()[0].contains(PasteboardType::UploaderVersionRequest));
}

// ============================================
// Lifecycle Tests
// ============================================

#[test]
fn test_double_start_keeps_single_timer() {
    let start = Instant::now();
    let (mut app, uploader) = memory_pair("double-start");
    let (seen, handler) = recording_handler();
    let (second_seen, second) = recording_handler();

    assert!(app.start_observing_at(INTERVAL, handler, start));
    assert!(!app.start_observing_at(INTERVAL, second, start));

    uploader.write_host_list_request();
    assert!(app.poll_at(start + INTERVAL));
    assert!(!app.poll_at(start + INTERVAL + Duration::from_millis(10)));

    assert_eq!(call_count(&seen), 1);
    assert_eq!(call_count(&second_seen), 0);
}

#[test]
fn test_default_interval() {
    let mut watcher = ChannelWatcher::new(MemoryChannel::new("default"));
    watcher.start_observing_default(|_: &ChannelSnapshot| {});
    assert_eq!(watcher.interval(), Some(DEFAULT_POLL_INTERVAL));
    assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_millis(750));
}

#[test]
fn test_no_callback_after_stop() {
    let start = Instant::now();
    let (mut app, uploader) = memory_pair("stop");
    let (seen, handler) = recording_handler();
    app.start_observing_at(INTERVAL, handler, start);
    app.stop_observing();

    uploader.write_image(&ImageRequest::from_path("/tmp/a.png"));
    for tick in 1..10 {
        app.poll_at(start + INTERVAL * tick);
    }

    assert_eq!(call_count(&seen), 0);
    assert!(!app.is_observing());
    assert!(app.next_tick_in(start).is_none());
}

#[test]
fn test_restart_picks_up_changes_made_while_stopped() {
    let (mut app, uploader) = memory_pair("restart");
    app.start_observing(INTERVAL, |_| {});
    app.stop_observing();

    uploader.write_version_result(8);

    let (seen, handler) = recording_handler();
    app.start_observing(INTERVAL, handler);

    // Immediate check on start
    assert_eq!(call_count(&seen), 1);
    assert_eq!(parse_version_result(&seen.lock().unwrap()[0]), Some(8));
}

// ============================================
// Last-Write-Wins Tests
// ============================================

#[test]
fn test_only_latest_tag_readable() {
    let (app, uploader) = memory_pair("lww");
    let sequence = [
        PasteboardType::UploaderVersionRequest,
        PasteboardType::UploaderVersionResult,
        PasteboardType::ImageHostListRequest,
        PasteboardType::ImageHostListResult,
        PasteboardType::Image,
        PasteboardType::UploadResult,
    ];

    for kind in sequence {
        let written = match kind {
            PasteboardType::UploaderVersionRequest => app.write_version_request(),
            PasteboardType::UploaderVersionResult => uploader.write_version_result(4),
            PasteboardType::ImageHostListRequest => app.write_host_list_request(),
            PasteboardType::ImageHostListResult => uploader.write_host_list_result(&[]),
            PasteboardType::Image => app.write_image(&ImageRequest::from_data(vec![1])),
            PasteboardType::UploadResult => {
                uploader.write_upload_result(&UploadResult::success("1", "https://x/1.png"))
            }
        };
        assert!(written);

        let snapshot = app.channel().snapshot().unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert!(snapshot.contains(kind), "{:?} should be readable", kind);
    }
}
