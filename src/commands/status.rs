//! `status` command: reconciles the registry against the live OS and
//! prints the resulting entries. Pretty table rendering and colorization
//! are left to a terminal UI layer; this command only produces the data
//! and a plain line per service.

use std::path::Path;

use crate::context::ExecutionContext;
use crate::error::Result;

pub async fn status(cwd: &Path, manifest_override: Option<&Path>) -> Result<i32> {
    let ctx = ExecutionContext::load(cwd, manifest_override, false).await?;
    registry_reconcile_and_print(&ctx).await
}

async fn registry_reconcile_and_print(ctx: &ExecutionContext) -> Result<i32> {
    crate::registry::reconcile(&ctx.registry).await;
    let mut entries = ctx.registry.list().await;
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    if entries.is_empty() {
        println!("no services registered under {}", ctx.state_dir.display());
        return Ok(0);
    }

    for entry in entries {
        println!(
            "{:<16} {:<10} {:<10} port={:<6} pid={:<8} {}",
            entry.name,
            status_label(entry.status),
            health_label(entry.health),
            entry.port,
            entry.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            entry.url,
        );
    }
    Ok(0)
}

fn status_label(status: crate::registry::ServiceStatus) -> &'static str {
    use crate::registry::ServiceStatus::*;
    match status {
        Starting => "starting",
        Running => "running",
        Error => "error",
        Stopping => "stopping",
        Stopped => "stopped",
    }
}

fn health_label(health: crate::registry::HealthState) -> &'static str {
    use crate::registry::HealthState::*;
    match health {
        Healthy => "healthy",
        Unhealthy => "unhealthy",
        Unknown => "unknown",
    }
}
