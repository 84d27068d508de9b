#![doc = r#"
Large-payload offloading for queue producers and consumers.

Message bodies larger than a threshold are written to a blob store and replaced by a
pointer. The pointer travels in two forms on the wire and may additionally be carried
in the receipt handle handed to the application.

| Form | Shape |
| --- | --- |
| wire body | `{"s3Payload":{"bucket":"<bucket>","key":"<key>"}}` |
| message attribute | `S3MessageBodyKey` = `String` `(<bucket>)<key>` |
| receipt handle | `-..s3BucketName..-<bucket>-..s3BucketName..--..s3Key..-<key>-..s3Key..-<handle>` |

Implementation notes:
- Size accounting is UTF-8 bytes of the serialized body plus every attribute's name,
  data type and value; offloading starts strictly above the threshold.
- The consumer looks for the pointer in the attribute, then the receipt handle, then
  the body. A malformed attribute fails the message.
- Handles passed to the queue for acknowledgement are always stripped of markers.
"#]

pub mod config;
pub mod consumer;
pub mod errors;
pub mod message;
pub mod pointer;
pub mod producer;
pub mod receipt;
pub mod size;
pub mod testing;
pub mod transform;
pub mod transport;

pub use config::ExtendedConfig;
pub use consumer::{ExtendedConsumer, MessageHandler};
pub use errors::{
    BlobOperation, BoxError, ExtendedError, ExtendedResult, QueueOperation, TransportError,
};
pub use message::{
    DeliveredMessage, MessageAttribute, MessageAttributes, OutgoingMessage, ReceivedMessage,
    SendEntry, TransportFields,
};
pub use pointer::{
    OffloadEnvelope, OffloadPointer, POINTER_ATTRIBUTE, format_attribute_value,
    parse_attribute_value,
};
pub use producer::{BatchSendReport, ExtendedProducer, PreparationFailure, generate_object_key};
pub use receipt::{
    BUCKET_MARKER, KEY_MARKER, embed_in_receipt_handle, extract_bucket, extract_key,
    has_markers, strip_markers,
};
pub use size::{DEFAULT_SIZE_THRESHOLD, attributes_size, is_large};
pub use transform::{
    DefaultReceiveTransform, DefaultSendTransform, ReceiveTransform, SendTransform,
    SendTransformOutput,
};
pub use transport::{
    BatchEntryFailure, BatchSendOutput, QueueAcknowledger, QueueProducer, SendReceipt,
};
