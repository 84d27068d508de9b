//! Receipt-handle markers.
//!
//! A marked handle has the shape
//! `BUCKET_MARKER bucket BUCKET_MARKER KEY_MARKER key KEY_MARKER original-handle`.
//! The sentinels are assumed never to occur in bucket names, keys or queue-issued
//! handles.

use crate::pointer::OffloadPointer;

pub const BUCKET_MARKER: &str = "-..s3BucketName..-";
pub const KEY_MARKER: &str = "-..s3Key..-";

pub fn embed_in_receipt_handle(bucket: &str, key: &str, receipt_handle: &str) -> String {
    format!("{BUCKET_MARKER}{bucket}{BUCKET_MARKER}{KEY_MARKER}{key}{KEY_MARKER}{receipt_handle}")
}

pub fn extract_bucket(receipt_handle: &str) -> Option<&str> {
    between_markers(receipt_handle, BUCKET_MARKER)
}

pub fn extract_key(receipt_handle: &str) -> Option<&str> {
    between_markers(receipt_handle, KEY_MARKER)
}

/// Both halves of an embedded pointer, or `None` if either is missing.
pub fn extract_pointer(receipt_handle: &str) -> Option<OffloadPointer> {
    let bucket = extract_bucket(receipt_handle)?;
    let key = extract_key(receipt_handle)?;
    Some(OffloadPointer::new(bucket, key))
}

/// The queue-issued handle with any marker prefix removed. Idempotent.
pub fn strip_markers(receipt_handle: &str) -> &str {
    match receipt_handle.rfind(KEY_MARKER) {
        Some(index) => &receipt_handle[index + KEY_MARKER.len()..],
        None => receipt_handle,
    }
}

pub fn has_markers(receipt_handle: &str) -> bool {
    receipt_handle.contains(BUCKET_MARKER) && receipt_handle.contains(KEY_MARKER)
}

// A lone marker occurrence is a partial pair and yields nothing.
fn between_markers<'a>(receipt_handle: &'a str, marker: &str) -> Option<&'a str> {
    let first = receipt_handle.find(marker)?;
    let last = receipt_handle.rfind(marker)?;
    let start = first + marker.len();
    if start > last {
        return None;
    }
    Some(&receipt_handle[start..last])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "test-bucket";
    const KEY: &str = "test-s3-key";
    const HANDLE: &str = "original-receipt-handle";

    #[test]
    fn embed_expected_marker_layout() {
        let embedded = embed_in_receipt_handle(BUCKET, KEY, HANDLE);
        assert_eq!(
            embedded,
            "-..s3BucketName..-test-bucket-..s3BucketName..--..s3Key..-test-s3-key-..s3Key..-original-receipt-handle"
        );
    }

    #[test]
    fn embed_then_extract_expected_round_trip() {
        let embedded = embed_in_receipt_handle(BUCKET, KEY, HANDLE);
        assert_eq!(extract_bucket(&embedded), Some(BUCKET));
        assert_eq!(extract_key(&embedded), Some(KEY));
        assert_eq!(strip_markers(&embedded), HANDLE);
        assert_eq!(
            extract_pointer(&embedded),
            Some(OffloadPointer::new(BUCKET, KEY))
        );
    }

    #[test]
    fn embed_special_characters_expected_round_trip() {
        let bucket = "test-bucket.with.special-chars_123";
        let key = "folder/with space/file-name_123.json";
        let embedded = embed_in_receipt_handle(bucket, key, HANDLE);
        assert_eq!(extract_bucket(&embedded), Some(bucket));
        assert_eq!(extract_key(&embedded), Some(key));
        assert_eq!(strip_markers(&embedded), HANDLE);
    }

    #[test]
    fn extract_unmarked_handle_expected_none() {
        assert_eq!(extract_bucket(HANDLE), None);
        assert_eq!(extract_key(HANDLE), None);
        assert_eq!(extract_pointer(HANDLE), None);
    }

    #[test]
    fn extract_single_marker_occurrence_expected_none() {
        let partial = format!("{BUCKET_MARKER}{BUCKET}{HANDLE}");
        assert_eq!(extract_bucket(&partial), None);
        assert!(!has_markers(&partial));
    }

    #[test]
    fn strip_markers_unmarked_handle_expected_unchanged() {
        assert_eq!(strip_markers(HANDLE), HANDLE);
    }

    #[test]
    fn strip_markers_twice_expected_idempotent() {
        let embedded = embed_in_receipt_handle(BUCKET, KEY, HANDLE);
        let once = strip_markers(&embedded);
        assert_eq!(strip_markers(once), once);
    }

    #[test]
    fn has_markers_expected_true_only_for_embedded() {
        assert!(has_markers(&embed_in_receipt_handle(BUCKET, KEY, HANDLE)));
        assert!(!has_markers(HANDLE));
    }
}
