//! Environment isolation guard.
//!
//! Asserts that every monitored binding in an [`Environment`] is a substitute
//! before tests that depend on isolation run. Checks are read-only, so calling
//! them repeatedly always gives the same answer for the same environment.
//!
//! # Usage
//!
//! ```rust,ignore
//! let env = Environment::substitutes();
//! IsolationGuard::new(&env).assert_http_mocked();
//! IsolationGuard::new(&env).assert_store_client_mocked();
//! ```

use hermetic_domain::{IsolationViolation, MonitoredSet};

use crate::environment::Environment;

/// Read-only isolation checks over one environment.
pub struct IsolationGuard<'a> {
    env: &'a Environment,
}

impl<'a> IsolationGuard<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    /// Passes when all five HTTP verbs are substitutes.
    ///
    /// The violation names every live verb, not just the first.
    pub fn verify_http_mocked(&self) -> Result<(), IsolationViolation> {
        self.verify(&MonitoredSet::http(), "http")
    }

    /// Passes when the store connector itself is a substitute.
    pub fn verify_store_client_mocked(&self) -> Result<(), IsolationViolation> {
        self.verify(&MonitoredSet::store(), "store")
    }

    /// Both checks; the violation is the union of both.
    pub fn verify_all(&self) -> Result<(), IsolationViolation> {
        match (self.verify_http_mocked(), self.verify_store_client_mocked()) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(violation), Ok(())) | (Ok(()), Err(violation)) => Err(violation),
            (Err(http), Err(store)) => Err(http.merge(store)),
        }
    }

    /// Panicking form of [`verify_http_mocked`](Self::verify_http_mocked) for tests.
    #[track_caller]
    pub fn assert_http_mocked(&self) {
        if let Err(violation) = self.verify_http_mocked() {
            panic!("{violation}");
        }
    }

    /// Panicking form of [`verify_store_client_mocked`](Self::verify_store_client_mocked) for tests.
    #[track_caller]
    pub fn assert_store_client_mocked(&self) {
        if let Err(violation) = self.verify_store_client_mocked() {
            panic!("{violation}");
        }
    }

    fn verify(&self, set: &MonitoredSet, check: &'static str) -> Result<(), IsolationViolation> {
        let live = set.violations(self.env.bindings());
        match IsolationViolation::from_bindings(live) {
            None => {
                tracing::debug!(check, "Isolation check passed");
                Ok(())
            }
            Some(violation) => {
                tracing::error!(
                    check,
                    bindings = ?violation.names().collect::<Vec<_>>(),
                    "Isolation check failed: live bindings present"
                );
                Err(violation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{HttpMethod, MockHttpVerbPort, MockKvConnectorPort};
    use hermetic_domain::{BindingKind, BindingName};
    use std::sync::Arc;

    fn live_verb(method: HttpMethod) -> Arc<MockHttpVerbPort> {
        let mut verb = MockHttpVerbPort::new();
        verb.expect_kind().return_const(BindingKind::Live);
        verb.expect_method().return_const(method);
        verb.expect_send().never();
        Arc::new(verb)
    }

    fn live_connector() -> Arc<MockKvConnectorPort> {
        let mut connector = MockKvConnectorPort::new();
        connector.expect_kind().return_const(BindingKind::Live);
        connector.expect_connect().never();
        Arc::new(connector)
    }

    #[test]
    fn substitutes_pass_both_checks() {
        let env = Environment::substitutes();
        let guard = IsolationGuard::new(&env);
        assert!(guard.verify_http_mocked().is_ok());
        assert!(guard.verify_store_client_mocked().is_ok());
        assert!(guard.verify_all().is_ok());
    }

    #[test]
    fn every_live_verb_is_reported() {
        let env = Environment::substitutes()
            .with_put(live_verb(HttpMethod::Put))
            .with_delete(live_verb(HttpMethod::Delete));

        let violation = IsolationGuard::new(&env)
            .verify_http_mocked()
            .expect_err("two live verbs");
        assert_eq!(
            violation.bindings(),
            &[BindingName::HttpPut, BindingName::HttpDelete]
        );
    }

    #[test]
    fn http_check_ignores_store_connector() {
        let env = Environment::substitutes().with_store_connector(live_connector());
        let guard = IsolationGuard::new(&env);
        assert!(guard.verify_http_mocked().is_ok());

        let violation = guard
            .verify_store_client_mocked()
            .expect_err("live connector");
        assert_eq!(violation.bindings(), &[BindingName::StoreConnector]);
    }

    #[test]
    fn verify_all_merges_violations() {
        let env = Environment::substitutes()
            .with_get(live_verb(HttpMethod::Get))
            .with_store_connector(live_connector());

        let violation = IsolationGuard::new(&env)
            .verify_all()
            .expect_err("two checks fail");
        assert_eq!(
            violation.bindings(),
            &[BindingName::HttpGet, BindingName::StoreConnector]
        );
    }

    #[test]
    fn checks_never_touch_the_bindings() {
        // The mocks above forbid send/connect; repeated checks must agree.
        let env = Environment::substitutes().with_patch(live_verb(HttpMethod::Patch));
        let guard = IsolationGuard::new(&env);
        let first = guard.verify_http_mocked();
        let second = guard.verify_http_mocked();
        assert_eq!(first, second);
        assert!(first.is_err());
    }

    #[test]
    #[should_panic(expected = "live implementation bound to post")]
    fn assert_form_panics_with_binding_name() {
        let env = Environment::substitutes().with_post(live_verb(HttpMethod::Post));
        IsolationGuard::new(&env).assert_http_mocked();
    }
}
