//! Uploader-side request handling
//!
//! The uploader watches the channel like the app does, but looks for request
//! tags and answers each one by overwriting the channel with a result.

use super::channel::SharedChannel;
use super::parse::{has_host_list_request, has_version_request, parse_image};
use super::types::{ChannelSnapshot, ImageHost, ImageRequest, UploadResult};
use super::watcher::ChannelWatcher;

/// A request found on the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Upload(ImageRequest),
    UploaderVersion,
    ImageHostList,
}

impl Request {
    /// Request carried by `snapshot`, if any
    pub fn from_snapshot(snapshot: &ChannelSnapshot) -> Option<Self> {
        if let Some(image) = parse_image(snapshot) {
            Some(Request::Upload(image))
        } else if has_version_request(snapshot) {
            Some(Request::UploaderVersion)
        } else if has_host_list_request(snapshot) {
            Some(Request::ImageHostList)
        } else {
            None
        }
    }
}

/// What the uploader does with each kind of request
pub trait RequestHandler {
    /// Upload `image` and describe the outcome
    fn upload(&mut self, image: &ImageRequest) -> UploadResult;

    fn uploader_version(&self) -> i64;

    fn image_hosts(&self) -> Vec<ImageHost>;
}

/// Outcome of answering one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Responded {
    pub request: Request,
    /// Whether the answer reached the channel
    pub written: bool,
}

/// Answer the request carried by `snapshot`, if there is one.
///
/// Returns None when the snapshot holds no request. A result that fails to
/// write is reported through `written` and not retried.
pub fn respond<C, H>(
    watcher: &ChannelWatcher<C>,
    snapshot: &ChannelSnapshot,
    handler: &mut H,
) -> Option<Responded>
where
    C: SharedChannel,
    H: RequestHandler + ?Sized,
{
    let request = Request::from_snapshot(snapshot)?;
    tracing::debug!("Answering {:?}", request);

    let written = match &request {
        Request::Upload(image) => {
            let result = handler.upload(image);
            watcher.write_upload_result(&result)
        }
        Request::UploaderVersion => watcher.write_version_result(handler.uploader_version()),
        Request::ImageHostList => watcher.write_host_list_result(&handler.image_hosts()),
    };

    if !written {
        tracing::warn!("Answer to {:?} did not reach the channel", request);
    }
    Some(Responded { request, written })
}
