//! Shadow state
//!
//! Client-side reconstruction of the engine's write buffer and segments,
//! rebuilt purely from the events the engine pushes. It is display-only and
//! best-effort: nothing here is reconciled against the real engine.

pub mod model;
pub mod render;
pub mod ring;

pub use model::{Entry, Segment, ShadowModel, OPLOG_CAPACITY};
pub use render::{compose, Frame, Panel, RECENT_OPERATIONS};
pub use ring::Ring;
