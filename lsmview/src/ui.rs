//! UI output port
//!
//! The connection manager talks to whatever presents it through `UiPort`
//! only, so the whole core runs headless in tests. `Presenter` is the
//! stateful implementation the terminal front-end paints from:
//! - one status slot, cleared `STATUS_LIFETIME` after it was shown. A new
//!   status replaces both the text and the deadline, so an older clear can
//!   never wipe a newer message;
//! - a transcript of feedback lines bounded to `TRANSCRIPT_CAPACITY`;
//! - whether the request controls are enabled.

use crate::shadow::Ring;
use crate::timer::Timer;
use crate::ws::proto::{Event, EventKind};

use std::time::{Duration, Instant};

pub trait UiPort {
    fn show_status(&mut self, text: &str, is_error: bool);
    fn append_log_line(&mut self, text: &str);
    fn set_controls_enabled(&mut self, enabled: bool);
}

pub const STATUS_LIFETIME: Duration = Duration::from_secs(3);
pub const TRANSCRIPT_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct Presenter {
    status: Option<Status>,
    clear: Timer,
    transcript: Ring<String>,
    controls_enabled: bool,
}

impl Default for Presenter {
    fn default() -> Self {
        Presenter::new()
    }
}

impl Presenter {
    pub fn new() -> Presenter {
        Presenter {
            status: None,
            clear: Timer::new(),
            transcript: Ring::new(TRANSCRIPT_CAPACITY),
            controls_enabled: false,
        }
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Feedback lines, oldest first.
    pub fn transcript(&self) -> &Ring<String> {
        &self.transcript
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn show_status_at(&mut self, text: &str, is_error: bool, now: Instant) {
        self.status = Some(Status {
            text: text.to_string(),
            is_error,
        });
        self.clear.schedule(now, STATUS_LIFETIME);
    }

    /// Clear the status if its lifetime is over. Returns whether it was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.clear.fire(now) {
            self.status = None;
            true
        } else {
            false
        }
    }
}

impl UiPort for Presenter {
    fn show_status(&mut self, text: &str, is_error: bool) {
        self.show_status_at(text, is_error, Instant::now());
    }

    fn append_log_line(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }
}

/// Status message for an applied event, with whether it is an error.
pub fn status_for(event: &Event) -> Option<(String, bool)> {
    let status = match &event.kind {
        EventKind::Set => (
            format!("Set {} = {}", event.key, event.value.as_deref().unwrap_or("")),
            false,
        ),
        EventKind::Get => match event.shown_value() {
            Some(value) => (format!("Got {} = {}", event.key, value), false),
            None => (format!("Got {}", event.key), false),
        },
        EventKind::Delete => (format!("Deleted {}", event.key), false),
        EventKind::Flush => ("Flushed MemTable".to_string(), false),
        EventKind::Error => (
            event
                .shown_value()
                .unwrap_or("Server reported an error")
                .to_string(),
            true,
        ),
        EventKind::Unknown(_) => return None,
    };
    Some(status)
}

/// Transcript line for an event: `HH:MM:SS - TYPE: key[ = value]`.
pub fn transcript_for(event: &Event) -> Option<String> {
    if let EventKind::Unknown(_) = event.kind {
        return None;
    }
    let key = match event.kind {
        EventKind::Flush if event.key.is_empty() => "MemTable",
        _ => event.key.as_str(),
    };
    let mut line = format!("{} - {}: {}", event.clock(), event.kind.label(), key);
    if let Some(value) = event.shown_value() {
        line.push_str(" = ");
        line.push_str(value);
    }
    Some(line)
}
