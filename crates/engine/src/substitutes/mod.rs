//! Substitute bindings for test environments.
//!
//! Each substitute implements the same port as its live counterpart, records
//! what it was asked to do, and performs no network or service I/O. All of
//! them report [`BindingKind::Substitute`](hermetic_domain::BindingKind).

pub mod memory_kv;
pub mod recording_http;

pub use memory_kv::{InMemoryKvConnector, InMemoryKvStore};
pub use recording_http::RecordingHttpVerb;
