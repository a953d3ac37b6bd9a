//! Domain form of one received stream frame.

use chrono::{DateTime, Utc};
use helm_api::StreamEvent;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Known frame kinds plus a catch-all for kinds this client predates.
pub enum LogKind {
    Status,
    Log,
    Assistant,
    Tool,
    Other(String),
}

impl LogKind {
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "status" => Self::Status,
            "log" => Self::Log,
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Status => "status",
            Self::Log => "log",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Other(tag) => tag,
        }
    }
}

impl Serialize for LogKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One entry in the observed log sequence. Immutable once appended; `seq`
/// is assigned by the buffer in insertion order.
pub struct LogEntry {
    pub seq: u64,
    pub kind: LogKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl LogEntry {
    /// Converts a parsed wire frame. A frame without its own timestamp gets
    /// `received_at`; a frame without message text is kept and still counts.
    pub fn from_event(event: &StreamEvent, received_at: DateTime<Utc>) -> Self {
        Self {
            seq: 0,
            kind: LogKind::from_wire(&event.event_type),
            message: event.message_text(),
            extra: event.data.clone().unwrap_or_default(),
            timestamp: event.timestamp.unwrap_or(received_at),
            level: event.level.clone(),
        }
    }
}
