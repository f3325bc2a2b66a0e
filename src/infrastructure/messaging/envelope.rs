//! Event Envelope
//!
//! The outer JSON wrapper every event carries on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format of a bus event:
/// `{ "eventType": "...", "occurredAt": "...", "data": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(
        event_type: String,
        occurred_at: DateTime<Utc>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            occurred_at,
            data,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
