//! The record stored for each relayed message.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SenderId;

/// One stored message: who sent it, when it arrived, and the raw payload.
///
/// Payloads are opaque bytes end to end. The stored JSON form base64-encodes
/// them so binary frames survive the trip through the history list; the live
/// broadcast path never touches this encoding and relays the payload as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Session that produced the message.
    pub sender_id: SenderId,
    /// Arrival time at the relay, UTC.
    pub timestamp: DateTime<Utc>,
    /// The payload exactly as received from the transport.
    #[serde(with = "payload_base64")]
    pub payload: Bytes,
}

impl MessageRecord {
    /// Build a record for a payload arriving now.
    #[must_use]
    pub fn new(sender_id: SenderId, payload: Bytes) -> Self {
        Self {
            sender_id,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Serialize to the stored JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a record from its stored JSON form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

mod payload_base64 {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD
            .decode(&encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
