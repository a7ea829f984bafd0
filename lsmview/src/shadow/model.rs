//! Model
//!
//! `ShadowModel` holds three things:
//! - the write buffer (the engine's MemTable): entries in arrival order,
//!   not deduplicated by key;
//! - the segment list (the engine's SSTables): immutable snapshots of the
//!   write buffer taken at each flush, newest first;
//! - the operation log: the last `OPLOG_CAPACITY` formatted operations.
//!
//! `apply` is a pure function of the current model and the event. Operation
//! lines are stamped with the event's own timestamp, so replaying the same
//! events into two fresh models yields equal models.

use super::ring::Ring;
use crate::ws::proto::{Event, EventKind};

use std::collections::VecDeque;
use std::sync::Arc;

/// Number of operation lines retained.
pub const OPLOG_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Entry {
        Entry {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Snapshot of the write buffer at a flush. Shared, never mutated.
pub type Segment = Arc<[Entry]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowModel {
    buffer: Vec<Entry>,
    segments: VecDeque<Segment>,
    oplog: Ring<String>,
}

impl Default for ShadowModel {
    fn default() -> Self {
        ShadowModel::new()
    }
}

impl ShadowModel {
    pub fn new() -> ShadowModel {
        ShadowModel {
            buffer: Vec::new(),
            segments: VecDeque::new(),
            oplog: Ring::new(OPLOG_CAPACITY),
        }
    }

    /// Write buffer entries, oldest first.
    pub fn buffer(&self) -> &[Entry] {
        &self.buffer
    }

    /// Segments, newest first.
    pub fn segments(&self) -> &VecDeque<Segment> {
        &self.segments
    }

    pub fn oplog(&self) -> &Ring<String> {
        &self.oplog
    }

    /// Apply one event. `error` and unrecognized kinds leave the model as is.
    pub fn apply(&mut self, event: &Event) {
        let clock = event.clock();
        let line = match &event.kind {
            EventKind::Set => {
                let value = event.value.clone().unwrap_or_default();
                let line = format!("{} - SET: {} = {}", clock, event.key, value);
                self.buffer.push(Entry::new(event.key.clone(), value));
                line
            }
            EventKind::Get => match event.shown_value() {
                Some(value) => format!("{} - GET: {} = {}", clock, event.key, value),
                None => format!("{} - GET: {}", clock, event.key),
            },
            EventKind::Delete => {
                self.buffer.retain(|entry| entry.key != event.key);
                format!("{} - DELETE: {}", clock, event.key)
            }
            EventKind::Flush => {
                let snapshot: Segment = std::mem::take(&mut self.buffer).into();
                self.segments.push_front(snapshot);
                format!("{} - FLUSH: MemTable", clock)
            }
            EventKind::Error | EventKind::Unknown(_) => return,
        };
        self.oplog.push(line);
    }

    /// Apply events in order.
    pub fn replay<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};

    fn at(secs: u32) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("2024-05-01T10:00:{:02}+00:00", secs)).unwrap()
    }

    fn set(key: &str, value: &str) -> Event {
        Event::new(EventKind::Set, key, Some(value), at(0))
    }

    #[test]
    fn new_model_is_empty() {
        let model = ShadowModel::new();
        assert!(model.buffer().is_empty());
        assert!(model.segments().is_empty());
        assert!(model.oplog().is_empty());
    }

    #[test]
    fn set_keeps_duplicate_keys() {
        let mut model = ShadowModel::new();
        model.apply(&set("a", "1"));
        model.apply(&set("a", "2"));

        assert_eq!(model.buffer(), &[Entry::new("a", "1"), Entry::new("a", "2")]);
    }

    #[test]
    fn set_without_value_appends_empty() {
        let mut model = ShadowModel::new();
        model.apply(&Event::new(EventKind::Set, "a", None, at(1)));

        assert_eq!(model.buffer(), &[Entry::new("a", "")]);
        assert_eq!(model.oplog().iter().last().unwrap(), "10:00:01 - SET: a = ");
    }

    #[test]
    fn delete_preserves_other_entries_in_order() {
        let mut model = ShadowModel::new();
        for (k, v) in [("a", "1"), ("b", "2"), ("a", "3"), ("c", "4")] {
            model.apply(&set(k, v));
        }
        model.apply(&Event::new(EventKind::Delete, "a", None, at(2)));

        assert_eq!(model.buffer(), &[Entry::new("b", "2"), Entry::new("c", "4")]);

        model.apply(&set("a", "5"));
        assert_eq!(model.buffer().last(), Some(&Entry::new("a", "5")));
    }

    #[test]
    fn flush_snapshots_and_clears() {
        let mut model = ShadowModel::new();
        model.apply(&set("a", "1"));
        model.apply(&Event::new(EventKind::Flush, "", None, at(3)));
        model.apply(&set("b", "2"));
        model.apply(&Event::new(EventKind::Flush, "", None, at(4)));

        assert!(model.buffer().is_empty());
        assert_eq!(&*model.segments()[0], &[Entry::new("b", "2")]);
        assert_eq!(&*model.segments()[1], &[Entry::new("a", "1")]);
        assert_eq!(model.oplog().iter().last().unwrap(), "10:00:04 - FLUSH: MemTable");
    }

    #[test]
    fn flush_of_empty_buffer_adds_empty_segment() {
        let mut model = ShadowModel::new();
        model.apply(&Event::new(EventKind::Flush, "", None, at(0)));

        assert_eq!(model.segments().len(), 1);
        assert!(model.segments()[0].is_empty());
    }

    #[test]
    fn get_line_has_value_suffix_only_when_present() {
        let mut model = ShadowModel::new();
        model.apply(&Event::new(EventKind::Get, "a", Some("1"), at(5)));
        model.apply(&Event::new(EventKind::Get, "b", None, at(6)));
        model.apply(&Event::new(EventKind::Get, "c", Some(""), at(7)));

        let lines: Vec<&str> = model.oplog().iter().map(String::as_str).collect();
        assert_eq!(
            lines,
            vec!["10:00:05 - GET: a = 1", "10:00:06 - GET: b", "10:00:07 - GET: c"]
        );
        assert!(model.buffer().is_empty());
    }

    #[test]
    fn error_and_unknown_leave_model_untouched() {
        let mut model = ShadowModel::new();
        model.apply(&set("a", "1"));
        let before = model.clone();

        model.apply(&Event::new(EventKind::Error, "", Some("boom"), at(0)));
        model.apply(&Event::new(
            EventKind::Unknown("compact".to_string()),
            "a",
            None,
            at(0),
        ));
        assert_eq!(model, before);
    }
}
