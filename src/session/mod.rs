//! # Session State & Lifecycle
//!
//! Per-participant analysis state keyed by an opaque, client-supplied session
//! id. Entries are created lazily on first frame- or audio-touch, mutated
//! only under their own lock during an analyze call, and reclaimed either by
//! an explicit clear request or by the idle-timeout sweep.

pub mod state;
pub mod store;

pub use state::{SessionState, VocalSample};
pub use store::SessionStore;
