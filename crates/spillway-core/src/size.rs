//! Byte accounting for outgoing messages.

use crate::message::MessageAttributes;

/// Default offload threshold in bytes (256 KiB).
pub const DEFAULT_SIZE_THRESHOLD: usize = 262_144;

/// Sum of the UTF-8 lengths of every attribute name, data type and value.
pub fn attributes_size(attributes: &MessageAttributes) -> usize {
    attributes
        .iter()
        .map(|(name, attribute)| {
            name.len()
                + attribute.data_type.len()
                + attribute.string_value.as_ref().map_or(0, String::len)
                + attribute.binary_value.as_ref().map_or(0, Vec::len)
        })
        .sum()
}

pub fn message_size(body: &str, attributes: &MessageAttributes) -> usize {
    body.len() + attributes_size(attributes)
}

/// True when the message is strictly larger than `threshold`.
pub fn is_large(body: &str, attributes: &MessageAttributes, threshold: usize) -> bool {
    message_size(body, attributes) > threshold
}
