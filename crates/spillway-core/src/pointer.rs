//! Offload pointer encoding: the `(bucket)key` attribute value and the
//! `{"s3Payload": {...}}` wire body.

use crate::errors::{ExtendedError, ExtendedResult};
use crate::message::{MessageAttribute, MessageAttributes};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Name of the message attribute that carries the pointer.
pub const POINTER_ATTRIBUTE: &str = "S3MessageBodyKey";

const ATTRIBUTE_VALUE_PATTERN: &str = r"^\((.*)\)(.+)$";

static ATTRIBUTE_VALUE_REGEX: OnceLock<Regex> = OnceLock::new();

fn attribute_value_regex() -> &'static Regex {
    ATTRIBUTE_VALUE_REGEX
        .get_or_init(|| Regex::new(ATTRIBUTE_VALUE_PATTERN).expect("pointer pattern is valid"))
}

/// Location of an offloaded payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffloadPointer {
    pub bucket: String,
    pub key: String,
}

impl OffloadPointer {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn attribute_value(&self) -> String {
        format_attribute_value(&self.bucket, &self.key)
    }

    pub fn to_attribute(&self) -> MessageAttribute {
        MessageAttribute::string(self.attribute_value())
    }
}

/// Wire body written in place of an offloaded payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadEnvelope {
    #[serde(rename = "s3Payload")]
    pub s3_payload: OffloadPointer,
}

pub fn format_attribute_value(bucket: &str, key: &str) -> String {
    format!("({bucket}){key}")
}

/// Parse a `(bucket)key` attribute value.
///
/// The bucket is the greedy parenthesised prefix, so a `)` anywhere after the first
/// one (in the bucket or in the key) makes the split ambiguous. Such values are
/// rejected instead of being split at the wrong place.
pub fn parse_attribute_value(value: &str) -> ExtendedResult<OffloadPointer> {
    let captures = attribute_value_regex().captures(value).ok_or_else(|| {
        ExtendedError::MalformedPointer(format!(
            "invalid {POINTER_ATTRIBUTE} format: expected \"(bucketName)messageKey\", got {value:?}"
        ))
    })?;
    let bucket = &captures[1];
    let key = &captures[2];

    if bucket.contains(')') {
        return Err(ExtendedError::MalformedPointer(format!(
            "invalid {POINTER_ATTRIBUTE} value {value:?}: more than one ')' makes the bucket/key split ambiguous"
        )));
    }
    Ok(OffloadPointer::new(bucket, key))
}

/// Read the pointer attribute, if the message carries one.
///
/// An attribute that is present but unusable is an error, never "not offloaded".
pub fn pointer_from_attributes(
    attributes: &MessageAttributes,
) -> ExtendedResult<Option<OffloadPointer>> {
    let Some(attribute) = attributes.get(POINTER_ATTRIBUTE) else {
        return Ok(None);
    };
    let value = attribute
        .string_value
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ExtendedError::MalformedPointer(format!(
                "invalid {POINTER_ATTRIBUTE} message attribute: missing string value"
            ))
        })?;
    parse_attribute_value(value).map(Some)
}

pub fn envelope_body(pointer: &OffloadPointer) -> ExtendedResult<String> {
    serde_json::to_string(&OffloadEnvelope {
        s3_payload: pointer.clone(),
    })
    .map_err(|err| ExtendedError::Serialization(err.to_string()))
}

/// Recognise an envelope body. Anything else, including non-JSON text, is `None`.
pub fn pointer_from_body(body: &str) -> Option<OffloadPointer> {
    serde_json::from_str::<OffloadEnvelope>(body)
        .ok()
        .map(|envelope| envelope.s3_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_attribute_value_expected_parenthesised_bucket() {
        assert_eq!(format_attribute_value("B", "k1"), "(B)k1");
    }

    #[test]
    fn parse_attribute_value_round_trip_expected_same_pointer() {
        let pointer = OffloadPointer::new("test-bucket.with.dots", "folder/with space/file.json");
        let parsed = parse_attribute_value(&pointer.attribute_value()).expect("should parse");
        assert_eq!(parsed, pointer);
    }

    #[test]
    fn parse_attribute_value_without_parentheses_expected_malformed() {
        let error = parse_attribute_value("bucket/key").expect_err("should fail");
        assert!(matches!(error, ExtendedError::MalformedPointer(_)));
    }

    #[test]
    fn parse_attribute_value_empty_key_expected_malformed() {
        let error = parse_attribute_value("(bucket)").expect_err("should fail");
        assert!(matches!(error, ExtendedError::MalformedPointer(_)));
    }

    #[test]
    fn parse_attribute_value_bucket_with_paren_expected_descriptive_error() {
        let error = parse_attribute_value("(my)bucket)key").expect_err("should fail");
        let ExtendedError::MalformedPointer(message) = error else {
            panic!("expected MalformedPointer");
        };
        assert!(message.contains("bucket/key split ambiguous"));
    }

    #[test]
    fn parse_attribute_value_key_with_paren_expected_malformed_not_blaming_bucket() {
        let error = parse_attribute_value("(B)archive(v2)/k.json").expect_err("should fail");
        let ExtendedError::MalformedPointer(message) = error else {
            panic!("expected MalformedPointer");
        };
        assert!(message.contains("ambiguous"));
        assert!(!message.contains("bucket names"));
    }

    #[test]
    fn pointer_from_attributes_absent_expected_none() {
        let pointer = pointer_from_attributes(&MessageAttributes::new()).expect("should succeed");
        assert_eq!(pointer, None);
    }

    #[test]
    fn pointer_from_attributes_missing_string_value_expected_malformed() {
        let attributes = MessageAttributes::from([(
            POINTER_ATTRIBUTE.to_string(),
            MessageAttribute {
                data_type: "String".to_string(),
                string_value: None,
                binary_value: None,
            },
        )]);

        let error = pointer_from_attributes(&attributes).expect_err("should fail");
        assert!(matches!(error, ExtendedError::MalformedPointer(_)));
    }

    #[test]
    fn envelope_body_expected_wire_format() {
        let body = envelope_body(&OffloadPointer::new("B", "k1")).expect("should serialize");
        assert_eq!(body, r#"{"s3Payload":{"bucket":"B","key":"k1"}}"#);
        assert_eq!(pointer_from_body(&body), Some(OffloadPointer::new("B", "k1")));
    }

    #[test]
    fn pointer_from_body_plain_text_expected_none() {
        assert_eq!(pointer_from_body("hello world"), None);
        assert_eq!(pointer_from_body(r#"{"x":1}"#), None);
        assert_eq!(pointer_from_body(r#"{"s3Payload":{"key":"k1"}}"#), None);
    }
}
