use crate::pointer::OffloadPointer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type MessageAttributes = BTreeMap<String, MessageAttribute>;

/// Transport-specific per-message fields (group ids, delays, ...) forwarded untouched.
pub type TransportFields = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttribute {
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_value: Option<Vec<u8>>,
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: Some(value.into()),
            binary_value: None,
        }
    }

    pub fn number(value: impl ToString) -> Self {
        Self {
            data_type: "Number".to_string(),
            string_value: Some(value.to_string()),
            binary_value: None,
        }
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: "Binary".to_string(),
            string_value: None,
            binary_value: Some(value.into()),
        }
    }
}

/// A message as handed to the extended producer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub id: String,
    pub body: Value,
    #[serde(default)]
    pub attributes: MessageAttributes,
    #[serde(default)]
    pub transport_fields: TransportFields,
}

impl OutgoingMessage {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
            attributes: MessageAttributes::new(),
            transport_fields: TransportFields::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: MessageAttribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn with_transport_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.transport_fields.insert(name.into(), value);
        self
    }
}

/// What the extended producer hands to the underlying queue transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendEntry {
    pub id: String,
    pub body: String,
    pub attributes: MessageAttributes,
    pub transport_fields: TransportFields,
}

/// A raw message as delivered by the underlying queue transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub id: String,
    pub body: String,
    #[serde(default)]
    pub attributes: MessageAttributes,
    pub receipt_handle: String,
}

/// A message after pointer resolution, as seen by the application handler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredMessage {
    pub id: String,
    pub body: String,
    pub attributes: MessageAttributes,
    pub receipt_handle: String,
    pub pointer: Option<OffloadPointer>,
}

impl DeliveredMessage {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn is_offloaded(&self) -> bool {
        self.pointer.is_some()
    }
}
