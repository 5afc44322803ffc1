//! Versioned encoding for the opaque channel payloads
//!
//! Every payload travels as a JSON envelope:
//!
//! ```json
//! {"format":"picbridge","kind":"upload-result","version":1,"body":{...}}
//! ```
//!
//! The envelope names the payload kind so a reader can reject data meant for
//! a different type, and carries a version so older readers refuse bodies
//! they don't understand. Bodies written by an older version are accepted;
//! fields added since then fall back to their serde defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{ImageHost, ImageRequest, UploadResult};

/// Format marker in every envelope
pub const FORMAT_MARKER: &str = "picbridge";

/// Errors that can occur while encoding or decoding a payload
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not a JSON envelope
    #[error("Invalid envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// Envelope was written by something other than picbridge
    #[error("Unexpected format marker: {0}")]
    Format(String),

    /// Envelope holds a different payload kind
    #[error("Expected payload kind '{expected}', found '{found}'")]
    Kind {
        expected: &'static str,
        found: String,
    },

    /// Envelope was written by a newer version than this reader supports
    #[error("Unsupported {kind} version {found} (supports up to {supported})")]
    Version {
        kind: &'static str,
        found: u32,
        supported: u32,
    },

    /// Envelope body doesn't match the payload type
    #[error("Invalid {kind} body: {source}")]
    Body {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Payload could not be serialized
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A type that travels as an opaque, versioned channel payload
pub trait Payload: Serialize + DeserializeOwned {
    /// Kind name written into the envelope
    const KIND: &'static str;

    /// Current body version
    const VERSION: u32;
}

impl Payload for ImageRequest {
    const KIND: &'static str = "image";
    const VERSION: u32 = 1;
}

impl Payload for UploadResult {
    const KIND: &'static str = "upload-result";
    const VERSION: u32 = 1;
}

impl Payload for Vec<ImageHost> {
    const KIND: &'static str = "image-host-list";
    const VERSION: u32 = 1;
}

#[derive(Serialize)]
struct EnvelopeOut<'a, P> {
    format: &'static str,
    kind: &'static str,
    version: u32,
    body: &'a P,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    format: String,
    kind: String,
    version: u32,
    body: serde_json::Value,
}

/// Encode `payload` into envelope bytes
pub fn encode<P: Payload>(payload: &P) -> Result<Vec<u8>, CodecError> {
    let envelope = EnvelopeOut {
        format: FORMAT_MARKER,
        kind: P::KIND,
        version: P::VERSION,
        body: payload,
    };
    serde_json::to_vec(&envelope).map_err(CodecError::Encode)
}

/// Decode envelope bytes into a `P`
pub fn decode<P: Payload>(bytes: &[u8]) -> Result<P, CodecError> {
    let envelope: EnvelopeIn = serde_json::from_slice(bytes).map_err(CodecError::Envelope)?;

    if envelope.format != FORMAT_MARKER {
        return Err(CodecError::Format(envelope.format));
    }
    if envelope.kind != P::KIND {
        return Err(CodecError::Kind {
            expected: P::KIND,
            found: envelope.kind,
        });
    }
    if envelope.version > P::VERSION {
        return Err(CodecError::Version {
            kind: P::KIND,
            found: envelope.version,
            supported: P::VERSION,
        });
    }

    serde_json::from_value(envelope.body).map_err(|source| CodecError::Body {
        kind: P::KIND,
        source,
    })
}
