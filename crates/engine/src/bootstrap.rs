//! Test bootstrap: scoped installation of substitute bindings.
//!
//! [`SubstituteScope::install`] swaps every monitored binding of an
//! [`Environment`] for a fresh substitute and puts the originals back when the
//! scope is dropped, including on panic.

use std::ops::Deref;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::environment::{Environment, HttpVerbs};
use crate::infrastructure::ports::HttpMethod;
use crate::substitutes::{InMemoryKvConnector, InMemoryKvStore, RecordingHttpVerb};

/// Substitutes installed into a borrowed environment for the scope's lifetime.
pub struct SubstituteScope<'a> {
    env: &'a mut Environment,
    original: Option<Environment>,
    doubles: [Arc<RecordingHttpVerb>; 5],
    connector: Arc<InMemoryKvConnector>,
}

impl<'a> SubstituteScope<'a> {
    pub fn install(env: &'a mut Environment) -> Self {
        let doubles = HttpMethod::all().map(|method| Arc::new(RecordingHttpVerb::new(method)));
        let connector = Arc::new(InMemoryKvConnector::new());

        let [get, put, post, patch, delete] = doubles.clone();
        let replacement = Environment::new(
            HttpVerbs {
                get,
                put,
                post,
                patch,
                delete,
            },
            connector.clone(),
        )
        .with_store_url(env.store_url.clone());

        let original = std::mem::replace(env, replacement);
        tracing::debug!("Installed substitute bindings");

        Self {
            env,
            original: Some(original),
            doubles,
            connector,
        }
    }

    /// The recording double bound to `method`.
    pub fn http(&self, method: HttpMethod) -> &Arc<RecordingHttpVerb> {
        let index = match method {
            HttpMethod::Get => 0,
            HttpMethod::Put => 1,
            HttpMethod::Post => 2,
            HttpMethod::Patch => 3,
            HttpMethod::Delete => 4,
        };
        &self.doubles[index]
    }

    pub fn connector(&self) -> &Arc<InMemoryKvConnector> {
        &self.connector
    }

    /// The store every substitute connection resolves to.
    pub fn store(&self) -> Arc<InMemoryKvStore> {
        self.connector.store()
    }
}

impl Deref for SubstituteScope<'_> {
    type Target = Environment;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl Drop for SubstituteScope<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            *self.env = original;
            tracing::debug!("Restored original bindings");
        }
    }
}

/// Initialize tracing for tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hermetic_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::IsolationGuard;
    use crate::infrastructure::config::EnvironmentConfig;
    use crate::infrastructure::ports::{HttpRequest, HttpResponse};
    use hermetic_domain::{BindingKind, BindingName};

    #[test]
    fn install_then_restore_live_bindings() {
        init_test_tracing();
        let mut env = Environment::live(&EnvironmentConfig::default());

        {
            let scope = SubstituteScope::install(&mut env);
            assert!(IsolationGuard::new(&scope).verify_all().is_ok());
        }

        assert!(env
            .bindings()
            .iter()
            .all(|(_, kind)| *kind == BindingKind::Live));
        assert!(IsolationGuard::new(&env).verify_all().is_err());
    }

    #[test]
    fn restores_even_when_the_test_body_panics() {
        let mut env = Environment::live(&EnvironmentConfig::default());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = SubstituteScope::install(&mut env);
            panic!("test body failed");
        }));

        assert!(result.is_err());
        assert_eq!(env.kind_of(BindingName::HttpGet), BindingKind::Live);
        assert_eq!(env.kind_of(BindingName::StoreConnector), BindingKind::Live);
    }

    #[tokio::test]
    async fn exposes_installed_doubles() {
        let mut env = Environment::substitutes();
        let scope = SubstituteScope::install(&mut env);

        scope
            .http(HttpMethod::Post)
            .respond_with(HttpResponse::new(202, Vec::new()));

        let response = scope
            .http
            .post
            .send(HttpRequest::new(HttpMethod::Post, "https://remote.example/inbox"))
            .await
            .expect("substitute post");
        assert_eq!(response.status, 202);
        assert_eq!(scope.http(HttpMethod::Post).call_count(), 1);
        assert_eq!(scope.http(HttpMethod::Get).call_count(), 0);

        let store = scope
            .store_connector
            .connect("redis://localhost:6379/0")
            .await
            .expect("substitute connect");
        store.set("k", b"v", None).await.expect("set");
        assert_eq!(scope.store().keys().await, vec!["k".to_string()]);
        assert_eq!(
            scope.connector().connected_urls(),
            vec!["redis://localhost:6379/0"]
        );
    }

    #[tokio::test]
    async fn substitute_connector_sees_the_configured_store_url() {
        let config = EnvironmentConfig {
            kv_url: "sqlite:/var/lib/app/cache.db".to_string(),
            ..EnvironmentConfig::default()
        };
        let mut env = Environment::live(&config);
        let scope = SubstituteScope::install(&mut env);

        scope.connect_store().await.expect("substitute connect");
        assert_eq!(
            scope.connector().connected_urls(),
            vec!["sqlite:/var/lib/app/cache.db"]
        );
    }
}
