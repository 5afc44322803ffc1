//! Tests for the file-backed channel used across processes
//!
//! Tests cover:
//! - Independent handles seeing each other's writes
//! - Change detection through the file
//! - Channel isolation by name

use std::time::Duration;

use picbridge::ipc::{
    parse_host_list_result, parse_upload_result, parse_version_result, respond, ChannelSnapshot,
    FileChannel, ImageHost, ImageRequest, RequestHandler, SharedChannel, UploadError,
    UploadResult, CHANNEL_NAME,
};

use crate::common::{call_count, file_pair, recording_handler, scratch_dir};

struct RefusingUploader;

impl RequestHandler for RefusingUploader {
    fn upload(&mut self, image: &ImageRequest) -> UploadResult {
        UploadResult::failure(&image.id, UploadError::new(401, "not signed in"))
    }

    fn uploader_version(&self) -> i64 {
        2
    }

    fn image_hosts(&self) -> Vec<ImageHost> {
        vec![ImageHost::new("local", "Local")]
    }
}

#[test]
fn test_handles_share_contents_and_counter() {
    let dir = scratch_dir("file-share");
    let (app, uploader) = file_pair(dir.path(), CHANNEL_NAME);

    assert!(app.write_host_list_request());
    assert!(uploader.write_host_list_result(&[ImageHost::new("imgur", "Imgur")]));

    let snapshot = app.channel().snapshot().unwrap();
    assert_eq!(snapshot.change_count, 4);
    assert_eq!(
        parse_host_list_result(&snapshot),
        vec![ImageHost::new("imgur", "Imgur")]
    );

}

#[test]
fn test_change_detected_through_file() {
    let dir = scratch_dir("file-detect");
    let (mut app, uploader) = file_pair(dir.path(), CHANNEL_NAME);
    let (seen, handler) = recording_handler();
    app.start_observing(Duration::from_millis(50), handler);
    assert_eq!(call_count(&seen), 0);

    uploader.write_version_result(33);
    assert!(app.check_for_change());
    assert!(!app.check_for_change());

    let snapshots: Vec<ChannelSnapshot> = seen.lock().unwrap().clone();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(parse_version_result(&snapshots[0]), Some(33));

}

#[test]
fn test_upload_failure_over_file() {
    let dir = scratch_dir("file-upload");
    let (app, uploader) = file_pair(dir.path(), CHANNEL_NAME);
    let image = ImageRequest::from_path("/tmp/photo.jpg").with_host("local");
    app.write_image(&image);

    let snapshot = uploader.channel().snapshot().unwrap();
    respond(&uploader, &snapshot, &mut RefusingUploader);

    let result = parse_upload_result(&app.channel().snapshot().unwrap()).unwrap();
    assert_eq!(result.id, image.id);
    assert_eq!(result.error, Some(UploadError::new(401, "not signed in")));

}

#[test]
fn test_channels_isolated_by_name() {
    let dir = scratch_dir("file-names");
    let first = FileChannel::open_in(dir.path(), "net.example.first").unwrap();
    let second = FileChannel::open_in(dir.path(), "net.example.second").unwrap();

    first.clear_contents().unwrap();
    first.clear_contents().unwrap();

    assert_eq!(first.change_count().unwrap(), 2);
    assert_eq!(second.change_count().unwrap(), 0);
    assert_ne!(first.path(), second.path());

}

#[test]
fn test_write_into_unwritable_location_fails() {
    let dir = scratch_dir("file-blocked");
    // A regular file where the channel directory should be
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, b"").unwrap();

    let (app, _uploader) = file_pair(&blocker, CHANNEL_NAME);
    assert!(!app.write_version_request());

}

#[test]
fn test_watcher_hears_peer_after_file_corrupted() {
    let dir = scratch_dir("file-corrupt");
    let (mut app, uploader) = file_pair(dir.path(), CHANNEL_NAME);
    for version in 1..=5 {
        uploader.write_version_result(version);
    }

    let (seen, handler) = recording_handler();
    app.start_observing(Duration::from_millis(50), handler);
    assert_eq!(app.last_change_count(), 10);
    assert_eq!(call_count(&seen), 1);

    std::fs::write(app.channel().path(), b"{ not json").unwrap();
    assert!(!app.check_for_change());

    for version in 6..=8 {
        assert!(uploader.write_version_result(version));
        assert!(app.check_for_change(), "version {} should be seen", version);
    }

    assert_eq!(call_count(&seen), 4);
    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!(parse_version_result(&last), Some(8));
    assert!(last.change_count > 10);
}

#[test]
fn test_watcher_hears_peer_after_file_deleted() {
    let dir = scratch_dir("file-deleted");
    let (mut app, uploader) = file_pair(dir.path(), CHANNEL_NAME);
    uploader.write_host_list_request();
    uploader.write_host_list_request();

    let (seen, handler) = recording_handler();
    app.start_observing(Duration::from_millis(50), handler);
    assert_eq!(app.last_change_count(), 4);

    std::fs::remove_file(app.channel().path()).unwrap();
    assert!(!app.check_for_change());

    assert!(uploader.write_version_result(12));
    assert!(app.check_for_change());
    assert_eq!(app.last_change_count(), 6);
    assert_eq!(call_count(&seen), 2);
}
