//! End-to-end scenario: launch two toy services concurrently, wait for
//! both to become healthy, then shut them both down and confirm the
//! registry and port assignments are clean.
//!
//! Real Node/Python toolchains are out of scope for this crate's own test
//! suite, so the "services" here are plain `sleep` shims, health-checked
//! by PID liveness: a `RuntimeDescriptor` is built by hand rather than
//! through `runtime::builder`, which is exercised separately by its own
//! unit tests in `src/runtime/builder.rs`.

use std::collections::HashMap;
use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use polyrun::detect::Language;
use polyrun::health;
use polyrun::launcher;
use polyrun::logs::LogManager;
use polyrun::ports::manager::PortManager;
use polyrun::ports::spec::Protocol;
use polyrun::registry::ServiceRegistry;
use polyrun::runtime::{HealthCheckPolicy, RuntimeDescriptor};
use polyrun::shutdown::ShutdownCoordinator;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

/// A "service" that just sleeps until killed, standing in for a real dev
/// server; health is checked via PID liveness (`process` policy) rather
/// than a port dial, since a plain `sleep` never binds one.
fn sleeper_descriptor(name: &str, port: u16) -> RuntimeDescriptor {
    RuntimeDescriptor::new(
        name.to_string(),
        PathBuf::from("."),
        "sleep".to_string(),
        vec!["30".to_string()],
        HashMap::new(),
        Language::Go,
        "Go".to_string(),
        None,
        port,
        Protocol::Tcp,
        HealthCheckPolicy::process().with_total_timeout(Duration::from_secs(5)),
    )
}

#[tokio::test]
#[cfg_attr(not(unix), ignore)]
async fn two_services_launch_become_healthy_and_shut_down_cleanly() {
    let state_dir = tempfile::tempdir().unwrap();
    let registry = ServiceRegistry::load(state_dir.path()).await.unwrap();
    let port_manager = PortManager::load(state_dir.path()).await.unwrap();
    let log_manager = std::sync::Arc::new(LogManager::new(None));

    let web_port = free_port();
    let api_port = free_port();

    let descriptors = vec![
        sleeper_descriptor("web", web_port),
        sleeper_descriptor("api", api_port),
    ];

    let mut project_dir_labels = HashMap::new();
    project_dir_labels.insert("web".to_string(), "./web".to_string());
    project_dir_labels.insert("api".to_string(), "./api".to_string());

    let report = launcher::launch_all(
        descriptors,
        &registry,
        &port_manager,
        &log_manager,
        &project_dir_labels,
    )
    .await;

    assert!(report.errors.is_empty(), "unexpected launch errors: {:?}", report.errors.keys().collect::<Vec<_>>());
    assert_eq!(report.started.len(), 2);

    for process in &report.started {
        let outcome = health::wait_healthy(process.descriptor().health_check(), process.port(), Some(process.pid())).await;
        assert_eq!(outcome, health::HealthOutcome::Healthy, "{} never became healthy", process.name());
    }

    assert!(registry.get("web").await.is_some());
    assert!(registry.get("api").await.is_some());

    let coordinator = ShutdownCoordinator::new(Duration::from_secs(2));
    coordinator
        .shutdown_all(report.started, &registry, &port_manager, Duration::from_secs(10))
        .await
        .unwrap();

    assert!(registry.get("web").await.is_none());
    assert!(registry.get("api").await.is_none());
    assert!(registry.list().await.is_empty());
}

#[tokio::test]
async fn launch_reports_error_for_already_bound_port() {
    let state_dir = tempfile::tempdir().unwrap();
    let registry = ServiceRegistry::load(state_dir.path()).await.unwrap();
    let port_manager = PortManager::load(state_dir.path()).await.unwrap();
    let log_manager = std::sync::Arc::new(LogManager::new(None));

    let taken_port = free_port();
    let _holder = TcpListener::bind(("127.0.0.1", taken_port)).unwrap();

    let descriptors = vec![sleeper_descriptor("busy", taken_port)];
    let report = launcher::launch_all(
        descriptors,
        &registry,
        &port_manager,
        &log_manager,
        &HashMap::new(),
    )
    .await;

    assert!(report.started.is_empty());
    assert!(report.errors.contains_key("busy"));
}
