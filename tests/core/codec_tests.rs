//! Tests for the versioned payload codec
//!
//! Tests cover:
//! - Envelope layout per payload kind
//! - Acceptance of older bodies
//! - Rejection of foreign, mismatched, and future envelopes

use picbridge::ipc::codec::{decode, encode, FORMAT_MARKER};
use picbridge::ipc::{CodecError, ImageHost, ImageRequest, Payload, UploadError, UploadResult};

fn envelope(kind: &str, version: u32, body: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "format": FORMAT_MARKER,
        "kind": kind,
        "version": version,
        "body": body,
    }))
    .unwrap()
}

// ============================================
// Envelope Tests
// ============================================

#[test]
fn test_each_payload_has_distinct_kind() {
    let kinds = [
        <ImageRequest as Payload>::KIND,
        <UploadResult as Payload>::KIND,
        <Vec<ImageHost> as Payload>::KIND,
    ];
    for (i, a) in kinds.iter().enumerate() {
        for b in &kinds[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_image_request_envelope_uses_hex_data() {
    let request = ImageRequest::from_data(vec![0xca, 0xfe]);
    let value: serde_json::Value = serde_json::from_slice(&encode(&request).unwrap()).unwrap();

    assert_eq!(value["kind"], "image");
    assert_eq!(value["body"]["image_data"], "cafe");
    assert_eq!(value["body"]["id"], request.id.as_str());
}

#[test]
fn test_host_list_body_is_array() {
    let hosts = vec![ImageHost::new("imgur", "Imgur")];
    let value: serde_json::Value = serde_json::from_slice(&encode(&hosts).unwrap()).unwrap();

    assert!(value["body"].is_array());
    assert_eq!(value["body"][0]["name"], "Imgur");
}

#[test]
fn test_empty_host_list_decodes_empty() {
    let hosts: Vec<ImageHost> = decode(&encode(&Vec::<ImageHost>::new()).unwrap()).unwrap();
    assert!(hosts.is_empty());
}

#[test]
fn test_upload_failure_keeps_error_detail() {
    let result = UploadResult::failure("req-1", UploadError::new(-1009, "offline"));
    let decoded: UploadResult = decode(&encode(&result).unwrap()).unwrap();

    assert_eq!(decoded, result);
    assert!(!decoded.is_success());
}

// ============================================
// Version Tests
// ============================================

#[test]
fn test_older_version_accepted() {
    let bytes = envelope(
        "upload-result",
        0,
        serde_json::json!({"id": "old", "image_link": "https://x/old.png"}),
    );
    let result: UploadResult = decode(&bytes).unwrap();
    assert_eq!(result.image_link.as_deref(), Some("https://x/old.png"));
}

#[test]
fn test_future_version_rejected() {
    let bytes = envelope(
        "image-host-list",
        <Vec<ImageHost> as Payload>::VERSION + 1,
        serde_json::json!([]),
    );
    assert!(matches!(
        decode::<Vec<ImageHost>>(&bytes),
        Err(CodecError::Version { .. })
    ));
}

// ============================================
// Rejection Tests
// ============================================

#[test]
fn test_image_envelope_is_not_an_upload_result() {
    let bytes = encode(&ImageRequest::from_path("/tmp/a.png")).unwrap();
    let err = decode::<UploadResult>(&bytes).unwrap_err();
    assert!(err.to_string().contains("upload-result"));
}

#[test]
fn test_bad_hex_rejected() {
    let bytes = envelope("image", 1, serde_json::json!({"id": "x", "image_data": "zz"}));
    assert!(matches!(
        decode::<ImageRequest>(&bytes),
        Err(CodecError::Body { .. })
    ));
}

#[test]
fn test_missing_envelope_field_rejected() {
    let bytes = br#"{"format":"picbridge","kind":"image","body":{"id":"x"}}"#;
    assert!(matches!(
        decode::<ImageRequest>(bytes),
        Err(CodecError::Envelope(_))
    ));
}
