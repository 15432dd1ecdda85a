//! Environment isolation checks, run the way a test suite would run them.

use std::sync::Arc;
use std::time::Duration;

use hermetic_engine::infrastructure::clock::SystemClock;
use hermetic_engine::infrastructure::config::{EnvironmentConfig, DEFAULT_KV_URL};
use hermetic_engine::infrastructure::ports::HttpMethod;
use hermetic_engine::infrastructure::sqlite_kv::SqliteKvConnector;
use hermetic_engine::use_cases::CachedFetcher;
use hermetic_engine::{
    init_test_tracing, BindingName, Environment, HttpVerbs, IsolationGuard, SubstituteScope,
};

fn live_environment() -> Environment {
    Environment::live(&EnvironmentConfig::default())
}

// =============================================================================
// Under the test bootstrap
// =============================================================================

#[test]
fn test_http_verbs_are_mocked() {
    init_test_tracing();
    let mut env = live_environment();
    let scope = SubstituteScope::install(&mut env);

    IsolationGuard::new(&scope).assert_http_mocked();
}

#[test]
fn test_store_client_is_mocked() {
    init_test_tracing();
    let mut env = live_environment();
    let scope = SubstituteScope::install(&mut env);

    IsolationGuard::new(&scope).assert_store_client_mocked();
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn all_substitutes_pass_both_checks() {
    let env = Environment::substitutes();
    let guard = IsolationGuard::new(&env);

    assert!(guard.verify_http_mocked().is_ok());
    assert!(guard.verify_store_client_mocked().is_ok());
}

#[test]
fn live_post_fails_http_check_naming_post() {
    let live = HttpVerbs::live(&EnvironmentConfig::default());
    let env = Environment::substitutes().with_post(live.post);

    let violation = IsolationGuard::new(&env)
        .verify_http_mocked()
        .expect_err("post is live");
    assert_eq!(violation.bindings(), &[BindingName::HttpPost]);
    assert!(violation.to_string().contains("post"));

    assert!(IsolationGuard::new(&env).verify_store_client_mocked().is_ok());
}

#[test]
fn live_store_connector_fails_store_check() {
    let env = Environment::substitutes()
        .with_store_connector(Arc::new(SqliteKvConnector::new(Arc::new(SystemClock::new()))));

    let violation = IsolationGuard::new(&env)
        .verify_store_client_mocked()
        .expect_err("connector is live");
    assert_eq!(violation.bindings(), &[BindingName::StoreConnector]);

    assert!(IsolationGuard::new(&env).verify_http_mocked().is_ok());
}

#[test]
fn fully_live_environment_fails_both_checks() {
    let env = live_environment();
    let guard = IsolationGuard::new(&env);

    let http = guard.verify_http_mocked().expect_err("all verbs live");
    assert_eq!(http.bindings(), &BindingName::http_verbs());

    let store = guard.verify_store_client_mocked().expect_err("connector live");
    assert_eq!(store.bindings(), &[BindingName::StoreConnector]);
}

#[test]
fn checks_are_idempotent() {
    let env = Environment::substitutes().with_delete(
        HttpVerbs::live(&EnvironmentConfig::default())
            .verb(HttpMethod::Delete)
            .clone(),
    );
    let guard = IsolationGuard::new(&env);

    let outcomes: Vec<_> = (0..3).map(|_| guard.verify_http_mocked()).collect();
    assert!(outcomes.iter().all(|outcome| outcome == &outcomes[0]));
    assert!(outcomes[0].is_err());
}

// =============================================================================
// Code under test sees only substitutes
// =============================================================================

#[tokio::test]
async fn fetcher_runs_without_network() -> anyhow::Result<()> {
    init_test_tracing();
    let mut env = live_environment();
    let scope = SubstituteScope::install(&mut env);
    IsolationGuard::new(&scope).verify_all()?;

    let fetcher = CachedFetcher::connect(&scope).await?;
    fetcher
        .fetch("https://remote.example/.well-known/nodeinfo", Duration::from_secs(60))
        .await?;

    let get = scope.http(HttpMethod::Get);
    assert_eq!(get.call_count(), 1);
    assert_eq!(
        get.last_call().map(|request| request.url),
        Some("https://remote.example/.well-known/nodeinfo".to_string())
    );
    assert_eq!(scope.connector().connected_urls(), vec![DEFAULT_KV_URL]);
    Ok(())
}
