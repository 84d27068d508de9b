//! Send/receive transforms: the pluggable offload policy.
//!
//! The producer and consumer only talk to the traits here, so callers can swap in a
//! different policy (content-type routing, compression, ...) without touching the
//! orchestration. Plain closures implement both traits.

use crate::errors::{ExtendedError, ExtendedResult};
use crate::message::{MessageAttributes, ReceivedMessage};
use crate::size::is_large;

/// Outcome of a send transform. Offloaded content must never also be sent inline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendTransformOutput {
    Inline(String),
    Offload(String),
}

impl SendTransformOutput {
    pub fn message_body(&self) -> Option<&str> {
        match self {
            Self::Inline(body) => Some(body),
            Self::Offload(_) => None,
        }
    }

    pub fn offload_content(&self) -> Option<&str> {
        match self {
            Self::Inline(_) => None,
            Self::Offload(content) => Some(content),
        }
    }
}

pub trait SendTransform: Send + Sync {
    fn transform(&self, body: &str, attributes: &MessageAttributes) -> SendTransformOutput;
}

impl<F> SendTransform for F
where
    F: Fn(&str, &MessageAttributes) -> SendTransformOutput + Send + Sync,
{
    fn transform(&self, body: &str, attributes: &MessageAttributes) -> SendTransformOutput {
        self(body, attributes)
    }
}

/// Size-based policy: offload when forced or when the message exceeds the threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DefaultSendTransform {
    pub always_offload: bool,
    pub threshold: usize,
}

impl SendTransform for DefaultSendTransform {
    fn transform(&self, body: &str, attributes: &MessageAttributes) -> SendTransformOutput {
        if self.always_offload || is_large(body, attributes, self.threshold) {
            SendTransformOutput::Offload(body.to_string())
        } else {
            SendTransformOutput::Inline(body.to_string())
        }
    }
}

pub trait ReceiveTransform: Send + Sync {
    /// Produce the body the application sees. `blob_content` is present only when
    /// the message pointed at an offloaded payload.
    fn transform(
        &self,
        message: &ReceivedMessage,
        blob_content: Option<Vec<u8>>,
    ) -> ExtendedResult<String>;
}

impl<F> ReceiveTransform for F
where
    F: Fn(&ReceivedMessage, Option<Vec<u8>>) -> ExtendedResult<String> + Send + Sync,
{
    fn transform(
        &self,
        message: &ReceivedMessage,
        blob_content: Option<Vec<u8>>,
    ) -> ExtendedResult<String> {
        self(message, blob_content)
    }
}

/// Fetched content if any, otherwise the raw body untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultReceiveTransform;

impl ReceiveTransform for DefaultReceiveTransform {
    fn transform(
        &self,
        message: &ReceivedMessage,
        blob_content: Option<Vec<u8>>,
    ) -> ExtendedResult<String> {
        match blob_content {
            Some(bytes) => String::from_utf8(bytes).map_err(|err| {
                ExtendedError::Payload(format!(
                    "offloaded content for message {} is not valid UTF-8: {err}",
                    message.id
                ))
            }),
            None => Ok(message.body.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageAttribute;

    fn received(body: &str) -> ReceivedMessage {
        ReceivedMessage {
            id: "m1".to_string(),
            body: body.to_string(),
            attributes: MessageAttributes::new(),
            receipt_handle: "rh".to_string(),
        }
    }

    #[test]
    fn default_send_small_message_expected_inline() {
        let transform = DefaultSendTransform {
            always_offload: false,
            threshold: 1024,
        };
        let output = transform.transform("{\"x\":1}", &MessageAttributes::new());
        assert_eq!(output.message_body(), Some("{\"x\":1}"));
        assert_eq!(output.offload_content(), None);
    }

    #[test]
    fn default_send_large_message_expected_offload() {
        let transform = DefaultSendTransform {
            always_offload: false,
            threshold: 10,
        };
        let output = transform.transform("0123456789ab", &MessageAttributes::new());
        assert_eq!(output, SendTransformOutput::Offload("0123456789ab".to_string()));
        assert_eq!(output.message_body(), None);
    }

    #[test]
    fn default_send_attributes_count_toward_threshold_expected_offload() {
        let transform = DefaultSendTransform {
            always_offload: false,
            threshold: 10,
        };
        let attributes =
            MessageAttributes::from([("k".to_string(), MessageAttribute::string("v"))]);
        let output = transform.transform("abcd", &attributes);
        assert!(output.offload_content().is_some());
    }

    #[test]
    fn default_send_always_offload_expected_offload_for_tiny_body() {
        let transform = DefaultSendTransform {
            always_offload: true,
            threshold: 1024,
        };
        let output = transform.transform("{}", &MessageAttributes::new());
        assert_eq!(output.offload_content(), Some("{}"));
    }

    #[test]
    fn closure_send_transform_expected_custom_policy() {
        let by_content_type = |body: &str, attributes: &MessageAttributes| {
            if attributes.contains_key("binary") {
                SendTransformOutput::Offload(body.to_string())
            } else {
                SendTransformOutput::Inline(body.to_string())
            }
        };
        let attributes =
            MessageAttributes::from([("binary".to_string(), MessageAttribute::binary(vec![1]))]);
        assert!(by_content_type.transform("x", &attributes).offload_content().is_some());
        assert!(
            by_content_type
                .transform("x", &MessageAttributes::new())
                .message_body()
                .is_some()
        );
    }

    #[test]
    fn default_receive_with_blob_expected_blob_content() {
        let body = DefaultReceiveTransform
            .transform(&received("{\"s3Payload\":{}}"), Some(b"full".to_vec()))
            .expect("transform should succeed");
        assert_eq!(body, "full");
    }

    #[test]
    fn default_receive_without_blob_expected_raw_body() {
        let body = DefaultReceiveTransform
            .transform(&received("not json at all"), None)
            .expect("transform should succeed");
        assert_eq!(body, "not json at all");
    }

    #[test]
    fn default_receive_invalid_utf8_blob_expected_payload_error() {
        let error = DefaultReceiveTransform
            .transform(&received(""), Some(vec![0xff, 0xfe]))
            .expect_err("invalid utf-8 should fail");
        assert!(matches!(error, ExtendedError::Payload(_)));
    }
}
