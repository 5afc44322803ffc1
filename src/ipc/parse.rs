//! Typed readers over a channel snapshot
//!
//! None of these report errors. A missing tag and a malformed payload both
//! mean "nothing new"; the caller polls again or re-issues its request.

use super::codec::{self, Payload};
use super::types::{ChannelSnapshot, ImageHost, ImageRequest, PasteboardType, UploadResult};

fn decode_tag<P: Payload>(snapshot: &ChannelSnapshot, kind: PasteboardType) -> Option<P> {
    let bytes = snapshot.data(kind)?;
    match codec::decode(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Ignoring malformed {} payload: {}", kind.tag(), e);
            None
        }
    }
}

/// Upload result written by the uploader, if present and well-formed
pub fn parse_upload_result(snapshot: &ChannelSnapshot) -> Option<UploadResult> {
    decode_tag(snapshot, PasteboardType::UploadResult)
}

/// Uploader version, if present as decimal text
pub fn parse_version_result(snapshot: &ChannelSnapshot) -> Option<i64> {
    snapshot
        .string(PasteboardType::UploaderVersionResult)?
        .parse()
        .ok()
}

/// Image hosts written by the uploader; empty when absent or malformed
pub fn parse_host_list_result(snapshot: &ChannelSnapshot) -> Vec<ImageHost> {
    decode_tag(snapshot, PasteboardType::ImageHostListResult).unwrap_or_default()
}

/// Image the app asked to upload, if present and well-formed
pub fn parse_image(snapshot: &ChannelSnapshot) -> Option<ImageRequest> {
    decode_tag(snapshot, PasteboardType::Image)
}

/// Whether the app is asking for the uploader's version
pub fn has_version_request(snapshot: &ChannelSnapshot) -> bool {
    snapshot.contains(PasteboardType::UploaderVersionRequest)
}

/// Whether the app is asking for the image host list
pub fn has_host_list_request(snapshot: &ChannelSnapshot) -> bool {
    snapshot.contains(PasteboardType::ImageHostListRequest)
}
