//! Render
//!
//! `compose` turns a `ShadowModel` into a `Frame`: the text content of the
//! three panels painted every tick. It only reads the model, so calling it
//! any number of times between two events yields the same frame.

use super::model::{Entry, ShadowModel};

/// Operation lines shown in the `Recent Operations` panel.
pub const RECENT_OPERATIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub title: String,
    pub lines: Vec<String>,
}

impl Panel {
    fn new(title: impl Into<String>, lines: Vec<String>) -> Panel {
        Panel {
            title: title.into(),
            lines,
        }
    }

    /// Widest of the title and the lines, in chars.
    pub fn width(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(self.title.chars().count()))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Write buffer, top to bottom in insertion order.
    pub memtable: Panel,
    /// One panel per segment, newest first.
    pub sstables: Vec<Panel>,
    /// Last `RECENT_OPERATIONS` operations, oldest on top.
    pub operations: Panel,
}

fn entry_line(entry: &Entry) -> String {
    format!("{}: {}", entry.key, entry.value)
}

pub fn compose(model: &ShadowModel) -> Frame {
    let memtable = Panel::new("MemTable", model.buffer().iter().map(entry_line).collect());
    let sstables = model
        .segments()
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            Panel::new(
                format!("SSTable {}", i + 1),
                segment.iter().map(entry_line).collect(),
            )
        })
        .collect();
    let operations = Panel::new(
        "Recent Operations",
        model.oplog().latest(RECENT_OPERATIONS).cloned().collect(),
    );
    Frame {
        memtable,
        sstables,
        operations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::proto::{Event, EventKind};
    use chrono::{DateTime, FixedOffset};

    fn ts() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T09:15:00+00:00").unwrap()
    }

    #[test]
    fn empty_model_has_titled_empty_panels() {
        let frame = compose(&ShadowModel::new());
        assert_eq!(frame.memtable.title, "MemTable");
        assert!(frame.memtable.lines.is_empty());
        assert!(frame.sstables.is_empty());
        assert_eq!(frame.operations.title, "Recent Operations");
        assert!(frame.operations.lines.is_empty());
    }

    #[test]
    fn segments_are_numbered_newest_first() {
        let mut model = ShadowModel::new();
        model.apply(&Event::new(EventKind::Set, "old", Some("1"), ts()));
        model.apply(&Event::new(EventKind::Flush, "", None, ts()));
        model.apply(&Event::new(EventKind::Set, "new", Some("2"), ts()));
        model.apply(&Event::new(EventKind::Flush, "", None, ts()));

        let frame = compose(&model);
        assert_eq!(frame.sstables[0].title, "SSTable 1");
        assert_eq!(frame.sstables[0].lines, vec!["new: 2"]);
        assert_eq!(frame.sstables[1].title, "SSTable 2");
        assert_eq!(frame.sstables[1].lines, vec!["old: 1"]);
    }

    #[test]
    fn shows_only_last_four_operations() {
        let mut model = ShadowModel::new();
        for i in 0..6 {
            model.apply(&Event::new(EventKind::Get, format!("k{}", i), None, ts()));
        }

        let frame = compose(&model);
        assert_eq!(
            frame.operations.lines,
            vec![
                "09:15:00 - GET: k2",
                "09:15:00 - GET: k3",
                "09:15:00 - GET: k4",
                "09:15:00 - GET: k5",
            ]
        );
    }

    #[test]
    fn compose_is_idempotent() {
        let mut model = ShadowModel::new();
        model.apply(&Event::new(EventKind::Set, "a", Some("1"), ts()));
        model.apply(&Event::new(EventKind::Flush, "", None, ts()));
        model.apply(&Event::new(EventKind::Set, "b", Some("2"), ts()));
        let before = model.clone();

        let first = compose(&model);
        for _ in 0..5 {
            assert_eq!(compose(&model), first);
        }
        assert_eq!(model, before);
    }

    #[test]
    fn panel_width_counts_chars() {
        let panel = Panel::new("MemTable", vec!["ключ: значение".to_string()]);
        assert_eq!(panel.width(), 14);
    }
}
