//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod config;
pub mod http_client;
pub mod ports;
pub mod sqlite_kv;
