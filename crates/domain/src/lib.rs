//! Hermetic domain vocabulary.
//!
//! Pure types shared by the engine: which environment bindings exist, what a
//! binding may resolve to, and the error raised when isolation is broken.
//! No I/O happens in this crate.

pub mod binding;
pub mod error;

pub use binding::{BindingKind, BindingName, MonitoredSet};
pub use error::{DomainError, IsolationViolation};
