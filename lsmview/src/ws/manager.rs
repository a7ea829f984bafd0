//! Connection manager
//!
//! Owns the lifecycle of the connection to the engine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected (close/error)
//!      ^                                          |
//!      +------------- Connecting (after 3s) <-----+
//! ```
//!
//! There is no terminal state, no backoff growth and no retry limit. Only a
//! close schedules a reconnect: an error is always followed by a close, and
//! scheduling on both would attempt twice.
//!
//! Nothing in here runs on its own. The owner feeds in link notices with
//! `handle` and drives the reconnect timer with `poll`, all from one thread,
//! so the shadow model is only ever touched by that thread.

use super::link::{Connector, Link, LinkError, LinkEvent, LinkNotice};
use super::proto::{self, EventKind, Request, RequestKind};
use crate::shadow::ShadowModel;
use crate::timer::Timer;
use crate::ui::{self, UiPort};

use chrono::Utc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fixed delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Reasons a request was not sent. The display text is what the user sees.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Key is required")]
    EmptyKey,
    #[error("Value is required for SET operation")]
    MissingValue,
    #[error("Not connected to server")]
    NotConnected,
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to send request: {0}")]
    Link(#[from] LinkError),
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    endpoint: String,
    state: ConnectionState,
    link: Option<C::Link>,
    generation: u64,
    reconnect: Timer,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, endpoint: impl Into<String>) -> ConnectionManager<C> {
        ConnectionManager {
            connector,
            endpoint: endpoint.into(),
            state: ConnectionState::Disconnected,
            link: None,
            generation: 0,
            reconnect: Timer::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Generation of the current link. Bumped by every `connect`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect.deadline()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open a new link, replacing the current one. Cancels a pending
    /// reconnect first so only one connection is ever in flight.
    pub fn connect(&mut self) {
        if self.reconnect.cancel() {
            debug!("cancelled pending reconnect");
        }
        // Dropping the old handle tells its thread to close.
        self.link = None;
        self.generation += 1;
        info!(endpoint = %self.endpoint, generation = self.generation, "connecting");
        self.link = Some(self.connector.open(&self.endpoint, self.generation));
        self.state = ConnectionState::Connecting;
    }

    pub fn on_open(&mut self, ui: &mut dyn UiPort) {
        info!(endpoint = %self.endpoint, "connected");
        self.state = ConnectionState::Connected;
        ui.show_status("Connected to server", false);
        ui.set_controls_enabled(true);
    }

    pub fn on_close(&mut self, ui: &mut dyn UiPort, now: Instant) {
        info!(endpoint = %self.endpoint, delay = ?RECONNECT_DELAY, "disconnected, will reconnect");
        self.state = ConnectionState::Disconnected;
        self.link = None;
        ui.show_status("Disconnected from server - Reconnecting...", true);
        ui.set_controls_enabled(false);
        self.reconnect.schedule(now, RECONNECT_DELAY);
    }

    pub fn on_error(&mut self, ui: &mut dyn UiPort, reason: &str) {
        warn!(endpoint = %self.endpoint, reason, "connection error");
        self.state = ConnectionState::Disconnected;
        ui.show_status("Connection error", true);
        ui.set_controls_enabled(false);
    }

    /// Decode one frame and apply it. Status and transcript lines are
    /// derived from the same event, separately from the model update.
    pub fn on_message(&mut self, raw: &str, model: &mut ShadowModel, ui: &mut dyn UiPort) {
        let event = match proto::decode(raw, proto::local_now()) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, raw, "dropping malformed frame");
                ui.show_status("Error processing server response", true);
                return;
            }
        };
        if let EventKind::Unknown(tag) = &event.kind {
            debug!(
                tag = tag.as_str(),
                key = event.key.as_str(),
                "ignoring unrecognized event type"
            );
            return;
        }
        debug!(kind = event.kind.tag(), key = event.key.as_str(), "applying event");
        model.apply(&event);
        if let Some((text, is_error)) = ui::status_for(&event) {
            ui.show_status(&text, is_error);
        }
        if let Some(line) = ui::transcript_for(&event) {
            ui.append_log_line(&line);
        }
    }

    /// Route a link notice. Notices from links replaced by a later
    /// `connect` are dropped.
    pub fn handle(
        &mut self,
        notice: LinkNotice,
        model: &mut ShadowModel,
        ui: &mut dyn UiPort,
        now: Instant,
    ) {
        if notice.generation != self.generation || self.link.is_none() {
            debug!(
                generation = notice.generation,
                current = self.generation,
                "dropping notice from stale link"
            );
            return;
        }
        match notice.event {
            LinkEvent::Opened => self.on_open(ui),
            LinkEvent::Message(raw) => self.on_message(&raw, model, ui),
            LinkEvent::Error(reason) => self.on_error(ui, &reason),
            LinkEvent::Closed => self.on_close(ui, now),
        }
    }

    /// Fire the reconnect timer if it is due. Returns whether a connection
    /// attempt was started.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.reconnect.fire(now) {
            self.connect();
            true
        } else {
            false
        }
    }

    /// Validate and send a request. Failures are shown as an error status and
    /// nothing is written; requests are never queued for later.
    pub fn send(&mut self, request: &Request, ui: &mut dyn UiPort) -> Result<(), SendError> {
        let result = self.try_send(request);
        if let Err(err) = &result {
            ui.show_status(&err.to_string(), true);
        }
        result
    }

    fn try_send(&self, request: &Request) -> Result<(), SendError> {
        if request.key.is_empty() {
            return Err(SendError::EmptyKey);
        }
        if request.kind == RequestKind::Set
            && request.value.as_deref().map_or(true, str::is_empty)
        {
            return Err(SendError::MissingValue);
        }
        let link = match (&self.link, self.state) {
            (Some(link), ConnectionState::Connected) => link,
            _ => return Err(SendError::NotConnected),
        };
        let frame = proto::encode(request, Utc::now())?;
        link.send_text(frame)?;
        debug!(kind = request.kind.tag(), key = request.key.as_str(), "request sent");
        Ok(())
    }
}
