//! `run` command: loads the manifest, produces a runtime descriptor per
//! requested service, starts all of them in parallel while probing
//! readiness, and then blocks until an operator signal before tearing
//! everything down.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::context::ExecutionContext;
use crate::detect;
use crate::error::{PolyrunError, Result};
use crate::graph::DependencyGraph;
use crate::guard;
use crate::health;
use crate::launcher::{self, LaunchReport};
use crate::ports::resolver::{self, ResolverInput};
use crate::registry::{self, HealthState, ServiceStatus};
use crate::runtime::builder;
use crate::shutdown::{self, ShutdownCoordinator, DEFAULT_PER_SERVICE_TIMEOUT};

const SHUTDOWN_TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run(
    cwd: &Path,
    manifest_override: Option<&Path>,
    services_filter: &[String],
    write_ports: bool,
    mirror_logs: bool,
) -> Result<i32> {
    let ctx = ExecutionContext::load(cwd, manifest_override, mirror_logs).await?;
    registry::reconcile(&ctx.registry).await;

    // Dependency graph is parsed and validated for cycles but never used
    // to sequence launch — services still start fully in parallel.
    let graph = DependencyGraph::build(&ctx.manifest)?;
    for name in graph.node_names() {
        tracing::debug!(node = %name, level = ?graph.level(name), "dependency graph node");
    }

    let selected: Vec<(String, crate::manifest::Service)> = if services_filter.is_empty() {
        ctx.manifest.services.clone().into_iter().collect()
    } else {
        services_filter
            .iter()
            .filter_map(|name| ctx.manifest.services.get(name).map(|s| (name.clone(), s.clone())))
            .collect()
    };

    if selected.is_empty() {
        return Err(PolyrunError::LanguageUndetected(ctx.repo_root.clone()));
    }

    let environment: HashMap<String, String> = std::env::vars().collect();
    let mut ports_in_use: HashSet<u16> = ctx
        .registry
        .list()
        .await
        .iter()
        .map(|entry| entry.port)
        .collect();

    let mut descriptors = Vec::new();
    let mut project_dir_labels = HashMap::new();
    let mut errors: HashMap<String, PolyrunError> = HashMap::new();
    let mut manifest_update_needed = Vec::new();

    for (name, service) in &selected {
        match prepare_descriptor(
            &ctx,
            name,
            service,
            &environment,
            &ports_in_use,
            &mut project_dir_labels,
        )
        .await
        {
            Ok((descriptor, requires_manifest_update)) => {
                ports_in_use.insert(descriptor.port());
                if requires_manifest_update {
                    manifest_update_needed.push(name.clone());
                }
                descriptors.push(descriptor);
            }
            Err(e) => {
                tracing::error!(service = %name, error = %e, "failed to prepare service");
                errors.insert(name.clone(), e);
            }
        }
    }

    if write_ports && !manifest_update_needed.is_empty() {
        tracing::warn!(
            services = ?manifest_update_needed,
            "flexible port reassignment approved but manifest rewriting is not yet wired up"
        );
    }

    let report: LaunchReport = launcher::launch_all(
        descriptors,
        &ctx.registry,
        &ctx.port_manager,
        &ctx.log_manager,
        &project_dir_labels,
    )
    .await;

    for (name, error) in report.errors {
        errors.insert(name, error);
    }

    if !errors.is_empty() {
        tracing::error!(count = errors.len(), "one or more services failed to start");
        let coordinator = ShutdownCoordinator::new(DEFAULT_PER_SERVICE_TIMEOUT);
        let _ = coordinator
            .shutdown_all(report.started, &ctx.registry, &ctx.port_manager, SHUTDOWN_TOTAL_TIMEOUT)
            .await;
        return Ok(1);
    }

    run_health_checks(&ctx, &report.started).await;

    tracing::info!(
        services = report.started.len(),
        "all services launched; waiting for an interrupt to stop"
    );

    let coordinator = ShutdownCoordinator::new(DEFAULT_PER_SERVICE_TIMEOUT);
    let shutdown_fut = coordinator.shutdown_all(
        report.started,
        &ctx.registry,
        &ctx.port_manager,
        SHUTDOWN_TOTAL_TIMEOUT,
    );
    tokio::pin!(shutdown_fut);

    shutdown::wait_for_signal().await;
    tracing::info!("signal received, shutting down");

    // A second signal here drops `shutdown_fut`, dropping every
    // not-yet-reaped `Child` along with it; `kill_on_drop(true)` (set at
    // spawn in `launcher::launch_one`) turns that drop into an immediate
    // force-kill escalation.
    tokio::select! {
        result = &mut shutdown_fut => {
            if result.is_err() {
                tracing::warn!("shutdown exceeded its bounded timeout; children were force-killed on drop");
            }
        }
        _ = shutdown::wait_for_signal() => {
            tracing::warn!("second signal received; forcing immediate termination");
        }
    }

    Ok(0)
}

async fn prepare_descriptor(
    ctx: &ExecutionContext,
    name: &str,
    service: &crate::manifest::Service,
    environment: &HashMap<String, String>,
    ports_in_use: &HashSet<u16>,
    project_dir_labels: &mut HashMap<String, String>,
) -> Result<(crate::runtime::RuntimeDescriptor, bool)> {
    let project_dir = guard::ensure_within(&ctx.repo_root, Path::new(&service.project))?;
    project_dir_labels.insert(name.to_string(), project_dir.display().to_string());

    let detection = detect::detect(&project_dir, service.host.as_deref())?;

    let resolution = resolver::resolve(&ResolverInput {
        service_name: name,
        project_dir: &project_dir,
        manifest_ports: &service.ports,
        containerized: service.is_containerized(),
        detection: &detection,
        environment,
        ports_in_use,
    })?;

    let outcome = ctx
        .port_manager
        .assign_port(name, resolution.port, resolution.explicit, ports_in_use)
        .await?;

    let descriptor = builder::build(name, &ctx.repo_root, service, &detection, outcome.port)?;
    Ok((descriptor, outcome.requires_manifest_update))
}

async fn run_health_checks(ctx: &ExecutionContext, processes: &[std::sync::Arc<crate::launcher::ServiceProcess>]) {
    let checks = processes.iter().map(|process| {
        let process = process.clone();
        async move {
            let outcome = health::wait_healthy(
                process.descriptor().health_check(),
                process.port(),
                Some(process.pid()),
            )
            .await;
            (process, outcome)
        }
    });

    let results = futures::future::join_all(checks).await;
    for (process, outcome) in results {
        match outcome {
            health::HealthOutcome::Healthy => {
                process.mark_ready();
                ctx.registry
                    .update(process.name(), |e| {
                        e.status = ServiceStatus::Running;
                        e.health = HealthState::Healthy;
                        e.last_checked_at = chrono::Utc::now();
                    })
                    .await
                    .ok();
            }
            health::HealthOutcome::Unhealthy => {
                ctx.registry
                    .update(process.name(), |e| {
                        e.health = HealthState::Unhealthy;
                        e.last_checked_at = chrono::Utc::now();
                    })
                    .await
                    .ok();
                tracing::warn!(service = process.name(), "service did not become healthy in time");
            }
        }
    }
}
