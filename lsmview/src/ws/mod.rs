//! Connection to the engine's event socket.
//!
//! `proto` defines the frames, `link` moves them over a WebSocket on a
//! dedicated thread, and `manager` owns the connection lifecycle and hands
//! decoded events to the shadow model.

pub mod link;
pub mod manager;
pub mod proto;
pub mod util;

pub use link::{Connector, Link, LinkError, LinkEvent, LinkNotice, WsConnector};
pub use manager::{ConnectionManager, ConnectionState, SendError, RECONNECT_DELAY};
pub use proto::{Event, EventKind, Request, RequestKind};
