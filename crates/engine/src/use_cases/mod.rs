//! Use cases - orchestration over the environment's ports.
//!
//! Each module contains use cases for a specific area. Use cases receive
//! their bindings from an [`Environment`](crate::environment::Environment)
//! and never construct clients themselves.

pub mod fetch;

pub use fetch::{CachedFetcher, FetchError};
