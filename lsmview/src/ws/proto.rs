//! Wire protocol
//!
//! The engine and its clients exchange JSON text frames, one event per frame:
//!
//! ```text
//! { "type": "set" | "get" | "delete" | "flush" | "error",
//!   "key": string, "value": string | null, "timestamp": RFC 3339 string }
//! ```
//!
//! Inbound decoding is lenient: `key`, `value` and `timestamp` may be missing,
//! and a `type` outside the known vocabulary decodes to `EventKind::Unknown`
//! instead of failing. The timestamp only labels the event, so one that does
//! not parse is replaced by the receive time rather than rejecting the frame.
//! Outbound frames always carry all four fields.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Type tag of an event received from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Set,
    Get,
    Delete,
    Flush,
    /// `value` carries a human-readable message. Never applied to the model.
    Error,
    /// Anything else the engine may send in the future.
    Unknown(String),
}

impl EventKind {
    pub fn from_tag(tag: &str) -> EventKind {
        match tag {
            "set" => EventKind::Set,
            "get" => EventKind::Get,
            "delete" => EventKind::Delete,
            "flush" => EventKind::Flush,
            "error" => EventKind::Error,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            EventKind::Set => "set",
            EventKind::Get => "get",
            EventKind::Delete => "delete",
            EventKind::Flush => "flush",
            EventKind::Error => "error",
            EventKind::Unknown(tag) => tag,
        }
    }

    /// Upper-case name used in operation and transcript lines.
    pub fn label(&self) -> String {
        self.tag().to_uppercase()
    }
}

/// One timestamped notification of an engine-side state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub key: String,
    pub value: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
}

impl Event {
    pub fn new(
        kind: EventKind,
        key: impl Into<String>,
        value: Option<&str>,
        timestamp: DateTime<FixedOffset>,
    ) -> Event {
        Event {
            kind,
            key: key.into(),
            value: value.map(str::to_string),
            timestamp,
        }
    }

    /// The value, if present and non-empty.
    pub fn shown_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    /// `HH:MM:SS` of the event, in the offset it was stamped with.
    pub fn clock(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct InboundFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Current local time, as stamped on frames that arrive without a timestamp.
pub fn local_now() -> DateTime<FixedOffset> {
    Local::now().into()
}

/// RFC 3339, or an ISO 8601 date-time without offset taken as local time.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.fixed_offset())
}

/// Decode one inbound text frame. Frames without a usable timestamp get
/// `received`.
pub fn decode(raw: &str, received: DateTime<FixedOffset>) -> Result<Event, DecodeError> {
    let frame: InboundFrame = serde_json::from_str(raw)?;
    let timestamp = match frame.timestamp.as_deref() {
        Some(ts) => parse_timestamp(ts).unwrap_or_else(|| {
            debug!(timestamp = ts, "unparsable timestamp, using receive time");
            received
        }),
        None => received,
    };
    Ok(Event {
        kind: EventKind::from_tag(&frame.kind),
        key: frame.key.unwrap_or_default(),
        value: frame.value,
        timestamp,
    })
}

/// Operations a client may ask the engine to perform. Flushes are
/// engine-initiated only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Set,
    Get,
    Delete,
}

impl RequestKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RequestKind::Set => "set",
            RequestKind::Get => "get",
            RequestKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub key: String,
    pub value: Option<String>,
}

impl Request {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Request {
        Request {
            kind: RequestKind::Set,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn get(key: impl Into<String>) -> Request {
        Request {
            kind: RequestKind::Get,
            key: key.into(),
            value: None,
        }
    }

    pub fn delete(key: impl Into<String>) -> Request {
        Request {
            kind: RequestKind::Delete,
            key: key.into(),
            value: None,
        }
    }
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    key: &'a str,
    value: Option<&'a str>,
    timestamp: String,
}

/// Encode a request as an outbound text frame stamped with `at`.
pub fn encode(request: &Request, at: DateTime<Utc>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundFrame {
        kind: request.kind.tag(),
        key: &request.key,
        value: request.value.as_deref(),
        timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
