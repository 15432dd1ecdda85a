//! Hermetic engine library.
//!
//! Keeps test suites away from real network and service I/O.
//!
//! ## Structure
//!
//! - `infrastructure/` - Ports, live adapters (reqwest, SQLite), config
//! - `substitutes/` - Recording test doubles for every port
//! - `environment` - The context object holding all bindings
//! - `guard` - Isolation checks over an environment
//! - `bootstrap` - Scoped substitute installation for tests
//! - `use_cases/` - Code that consumes the environment

pub mod bootstrap;
pub mod environment;
pub mod guard;
pub mod infrastructure;
pub mod substitutes;
pub mod use_cases;

pub use bootstrap::{init_test_tracing, SubstituteScope};
pub use environment::{Environment, HttpVerbs};
pub use guard::IsolationGuard;
pub use hermetic_domain::{BindingKind, BindingName, IsolationViolation, MonitoredSet};
