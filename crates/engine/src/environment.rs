//! The environment context object.
//!
//! Code that talks to the outside world takes an [`Environment`] instead of
//! reaching for process-wide clients. Test bootstraps swap substitutes into
//! it; the isolation guard reads it.

use std::sync::Arc;

use hermetic_domain::{BindingKind, BindingName};

use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::{ConfigError, EnvironmentConfig, DEFAULT_KV_URL};
use crate::infrastructure::http_client::ReqwestVerb;
use crate::infrastructure::ports::{
    HttpError, HttpMethod, HttpVerbPort, KvConnectorPort, KvError, KvStorePort,
};
use crate::infrastructure::sqlite_kv::SqliteKvConnector;
use crate::substitutes::{InMemoryKvConnector, RecordingHttpVerb};

/// One binding per HTTP verb.
#[derive(Clone)]
pub struct HttpVerbs {
    pub get: Arc<dyn HttpVerbPort>,
    pub put: Arc<dyn HttpVerbPort>,
    pub post: Arc<dyn HttpVerbPort>,
    pub patch: Arc<dyn HttpVerbPort>,
    pub delete: Arc<dyn HttpVerbPort>,
}

impl HttpVerbs {
    pub fn live(config: &EnvironmentConfig) -> Self {
        let [get, put, post, patch, delete] = ReqwestVerb::verbs(config);
        Self {
            get,
            put,
            post,
            patch,
            delete,
        }
    }

    pub fn substitutes() -> Self {
        Self {
            get: Arc::new(RecordingHttpVerb::new(HttpMethod::Get)),
            put: Arc::new(RecordingHttpVerb::new(HttpMethod::Put)),
            post: Arc::new(RecordingHttpVerb::new(HttpMethod::Post)),
            patch: Arc::new(RecordingHttpVerb::new(HttpMethod::Patch)),
            delete: Arc::new(RecordingHttpVerb::new(HttpMethod::Delete)),
        }
    }

    pub fn verb(&self, method: HttpMethod) -> &Arc<dyn HttpVerbPort> {
        match method {
            HttpMethod::Get => &self.get,
            HttpMethod::Put => &self.put,
            HttpMethod::Post => &self.post,
            HttpMethod::Patch => &self.patch,
            HttpMethod::Delete => &self.delete,
        }
    }

    /// Bind `binding` to the `method` slot. The binding must serve that method.
    pub fn set(
        &mut self,
        method: HttpMethod,
        binding: Arc<dyn HttpVerbPort>,
    ) -> Result<(), HttpError> {
        if binding.method() != method {
            return Err(HttpError::MethodMismatch {
                bound: binding.method(),
                requested: method,
            });
        }

        let slot = match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Delete => &mut self.delete,
        };
        *slot = binding;
        Ok(())
    }
}

/// Everything code under test may use to reach external services.
#[derive(Clone)]
pub struct Environment {
    pub http: HttpVerbs,
    pub store_connector: Arc<dyn KvConnectorPort>,
    /// Where `connect_store` points the connector.
    pub store_url: String,
}

impl Environment {
    pub fn new(http: HttpVerbs, store_connector: Arc<dyn KvConnectorPort>) -> Self {
        Self {
            http,
            store_connector,
            store_url: DEFAULT_KV_URL.to_string(),
        }
    }

    /// Real reqwest verbs and a SQLite store connector aimed at `config.kv_url`.
    pub fn live(config: &EnvironmentConfig) -> Self {
        Self::new(
            HttpVerbs::live(config),
            Arc::new(SqliteKvConnector::new(Arc::new(SystemClock::new()))),
        )
        .with_store_url(config.kv_url.clone())
    }

    /// Live bindings configured from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = EnvironmentConfig::from_env()?;
        tracing::info!(kv_url = %config.kv_url, "Building live environment");
        Ok(Self::live(&config))
    }

    /// Recording verbs and an in-memory store connector. Performs no I/O.
    pub fn substitutes() -> Self {
        Self::new(
            HttpVerbs::substitutes(),
            Arc::new(InMemoryKvConnector::new()),
        )
    }

    /// Panics if `binding` serves a different method than `method`.
    #[track_caller]
    pub fn with_verb(mut self, method: HttpMethod, binding: Arc<dyn HttpVerbPort>) -> Self {
        if let Err(e) = self.http.set(method, binding) {
            panic!("{e}");
        }
        self
    }

    #[track_caller]
    pub fn with_get(self, binding: Arc<dyn HttpVerbPort>) -> Self {
        self.with_verb(HttpMethod::Get, binding)
    }

    #[track_caller]
    pub fn with_put(self, binding: Arc<dyn HttpVerbPort>) -> Self {
        self.with_verb(HttpMethod::Put, binding)
    }

    #[track_caller]
    pub fn with_post(self, binding: Arc<dyn HttpVerbPort>) -> Self {
        self.with_verb(HttpMethod::Post, binding)
    }

    #[track_caller]
    pub fn with_patch(self, binding: Arc<dyn HttpVerbPort>) -> Self {
        self.with_verb(HttpMethod::Patch, binding)
    }

    #[track_caller]
    pub fn with_delete(self, binding: Arc<dyn HttpVerbPort>) -> Self {
        self.with_verb(HttpMethod::Delete, binding)
    }

    pub fn with_store_connector(mut self, connector: Arc<dyn KvConnectorPort>) -> Self {
        self.store_connector = connector;
        self
    }

    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = url.into();
        self
    }

    /// Open the configured store through whichever connector is bound.
    pub async fn connect_store(&self) -> Result<Arc<dyn KvStorePort>, KvError> {
        self.store_connector.connect(&self.store_url).await
    }

    /// Kind of a single binding.
    pub fn kind_of(&self, name: BindingName) -> BindingKind {
        match name {
            BindingName::HttpGet => self.http.get.kind(),
            BindingName::HttpPut => self.http.put.kind(),
            BindingName::HttpPost => self.http.post.kind(),
            BindingName::HttpPatch => self.http.patch.kind(),
            BindingName::HttpDelete => self.http.delete.kind(),
            BindingName::StoreConnector => self.store_connector.kind(),
        }
    }

    /// Every binding with its current kind, in monitored-set order.
    pub fn bindings(&self) -> Vec<(BindingName, BindingKind)> {
        BindingName::all()
            .into_iter()
            .map(|name| (name, self.kind_of(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_are_all_substitute() {
        let env = Environment::substitutes();
        assert!(env
            .bindings()
            .iter()
            .all(|(_, kind)| *kind == BindingKind::Substitute));
    }

    #[test]
    fn live_is_all_live() {
        let env = Environment::live(&EnvironmentConfig::default());
        let bindings = env.bindings();
        assert_eq!(bindings.len(), 6);
        assert!(bindings.iter().all(|(_, kind)| *kind == BindingKind::Live));
    }

    #[test]
    fn builder_replaces_single_binding() {
        let config = EnvironmentConfig::default();
        let live_verbs = HttpVerbs::live(&config);
        let env = Environment::substitutes().with_post(live_verbs.post.clone());

        assert_eq!(env.kind_of(BindingName::HttpPost), BindingKind::Live);
        assert_eq!(env.kind_of(BindingName::HttpGet), BindingKind::Substitute);
        assert_eq!(env.kind_of(BindingName::StoreConnector), BindingKind::Substitute);
    }

    #[test]
    fn verbs_sit_in_their_own_slots() {
        let verbs = HttpVerbs::substitutes();
        for method in HttpMethod::all() {
            assert_eq!(verbs.verb(method).method(), method);
        }
    }

    #[test]
    fn set_rejects_a_verb_in_the_wrong_slot() {
        let mut verbs = HttpVerbs::substitutes();
        let post: Arc<dyn HttpVerbPort> = Arc::new(RecordingHttpVerb::new(HttpMethod::Post));

        let err = verbs
            .set(HttpMethod::Get, post.clone())
            .expect_err("post double in get slot");
        assert!(matches!(
            err,
            HttpError::MethodMismatch {
                bound: HttpMethod::Post,
                requested: HttpMethod::Get
            }
        ));
        assert_eq!(verbs.get.method(), HttpMethod::Get);

        verbs.set(HttpMethod::Post, post).expect("matching slot");
    }

    #[test]
    #[should_panic(expected = "cannot send a GET request")]
    fn builder_panics_on_a_verb_in_the_wrong_slot() {
        let post = HttpVerbs::live(&EnvironmentConfig::default()).post;
        let _ = Environment::substitutes().with_get(post);
    }

    #[test]
    fn live_points_at_configured_store() {
        let config = EnvironmentConfig {
            kv_url: "sqlite::memory:".to_string(),
            ..EnvironmentConfig::default()
        };
        assert_eq!(Environment::live(&config).store_url, "sqlite::memory:");
        assert_eq!(Environment::substitutes().store_url, DEFAULT_KV_URL);
    }

    #[test]
    fn from_env_builds_live_bindings() {
        let env = Environment::from_env().expect("default config is valid");
        assert!(env
            .bindings()
            .iter()
            .all(|(_, kind)| *kind == BindingKind::Live));
    }

    #[tokio::test]
    async fn env_file_config_reaches_the_live_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("kv.db");
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, format!("HERMETIC_KV_URL=sqlite:{}\n", db.display()))
            .expect("write env file");

        let config = EnvironmentConfig::from_env_file(&env_file).expect("valid env file");
        let env = Environment::live(&config);
        let store = env.connect_store().await.expect("open configured store");

        store.set("k", b"v", None).await.expect("set");
        assert_eq!(store.get("k").await.expect("get"), Some(b"v".to_vec()));
        assert!(db.exists());
    }
}
