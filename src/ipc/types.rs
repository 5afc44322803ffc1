//! Item, snapshot, and payload types exchanged over the channel

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};
use uuid::Uuid;

/// Well-known type tags. The strings must match on both ends of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString, EnumIter)]
pub enum PasteboardType {
    /// Image to upload, written by the app
    #[strum(serialize = "net.toolinbox.ipic.pasteboard.iPicImage")]
    Image,

    /// Outcome of an upload, written by the uploader
    #[strum(serialize = "net.toolinbox.ipic.pasteboard.iPicUploadResult")]
    UploadResult,

    /// Uploader version query, written by the app
    #[strum(serialize = "net.toolinbox.ipic.pasteboard.iPicUploaderVersion")]
    UploaderVersionRequest,

    /// Uploader version as decimal text, written by the uploader
    #[strum(serialize = "net.toolinbox.ipic.pasteboard.iPicUploaderVersionResult")]
    UploaderVersionResult,

    /// Image host list query, written by the app
    #[strum(serialize = "net.toolinbox.ipic.pasteboard.PasteboardTypeImageHostList")]
    ImageHostListRequest,

    /// Configured image hosts, written by the uploader
    #[strum(serialize = "net.toolinbox.ipic.pasteboard.PasteboardTypeImageHostListResult")]
    ImageHostListResult,
}

impl PasteboardType {
    /// The exact tag string written to the channel
    pub fn tag(&self) -> &str {
        self.as_ref()
    }
}

/// Payload of a single channel item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemData {
    Text(String),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
}

/// A (type tag, payload) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelItem {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub data: ItemData,
}

impl ChannelItem {
    /// Item holding a string
    pub fn text(kind: PasteboardType, text: impl Into<String>) -> Self {
        Self {
            type_tag: kind.tag().to_string(),
            data: ItemData::Text(text.into()),
        }
    }

    /// Item holding raw bytes
    pub fn bytes(kind: PasteboardType, bytes: Vec<u8>) -> Self {
        Self {
            type_tag: kind.tag().to_string(),
            data: ItemData::Bytes(bytes),
        }
    }
}

/// Channel contents captured at a single read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub change_count: u64,
    pub items: Vec<ChannelItem>,
}

impl ChannelSnapshot {
    /// True when the channel holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First item carrying `kind`, if any
    pub fn item(&self, kind: PasteboardType) -> Option<&ChannelItem> {
        self.items.iter().find(|item| item.type_tag == kind.tag())
    }

    /// Whether an item of `kind` is present
    pub fn contains(&self, kind: PasteboardType) -> bool {
        self.item(kind).is_some()
    }

    /// Payload under `kind` as text. Byte payloads must be valid UTF-8.
    pub fn string(&self, kind: PasteboardType) -> Option<&str> {
        match &self.item(kind)?.data {
            ItemData::Text(text) => Some(text),
            ItemData::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Payload under `kind` as raw bytes
    pub fn data(&self, kind: PasteboardType) -> Option<&[u8]> {
        match &self.item(kind)?.data {
            ItemData::Text(text) => Some(text.as_bytes()),
            ItemData::Bytes(bytes) => Some(bytes),
        }
    }
}

/// An image the app asks the uploader to upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Correlates the request with its [`UploadResult`]
    pub id: String,
    #[serde(default)]
    pub image_file_path: Option<PathBuf>,
    #[serde(default, with = "hex_bytes::option")]
    pub image_data: Option<Vec<u8>>,
    /// Upload to this host instead of the uploader's default
    #[serde(default)]
    pub image_host_id: Option<String>,
}

impl ImageRequest {
    /// Request for an image file on disk
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_file_path: Some(path.into()),
            image_data: None,
            image_host_id: None,
        }
    }

    /// Request for in-memory image data
    pub fn from_data(data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            image_file_path: None,
            image_data: Some(data),
            image_host_id: None,
        }
    }

    /// Upload to a specific image host
    pub fn with_host(mut self, host_id: impl Into<String>) -> Self {
        self.image_host_id = Some(host_id.into());
        self
    }
}

/// Failure detail attached to an [`UploadResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadError {
    pub code: i64,
    pub message: String,
}

impl UploadError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of an upload, written back by the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Id of the [`ImageRequest`] this answers
    pub id: String,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub error: Option<UploadError>,
}

impl UploadResult {
    /// Successful upload of request `id`
    pub fn success(id: impl Into<String>, image_link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_link: Some(image_link.into()),
            error: None,
        }
    }

    /// Failed upload of request `id`
    pub fn failure(id: impl Into<String>, error: UploadError) -> Self {
        Self {
            id: id.into(),
            image_link: None,
            error: Some(error),
        }
    }

    /// True when a link came back and no error did
    pub fn is_success(&self) -> bool {
        self.image_link.is_some() && self.error.is_none()
    }
}

/// An image host configured in the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHost {
    pub id: String,
    pub name: String,
}

impl ImageHost {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Hex encoding for byte fields so JSON stays compact
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(b) => serializer.serialize_some(&hex::encode(b)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
