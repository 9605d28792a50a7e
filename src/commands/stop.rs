//! `stop` command: a standalone invocation that never held the live
//! `ServiceProcess` set from the `run` invocation that started these
//! services, so it force-terminates by recorded PID rather than going
//! through `ShutdownCoordinator`'s graceful-then-force path.

use std::path::Path;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::shutdown;

pub async fn stop(cwd: &Path, manifest_override: Option<&Path>) -> Result<i32> {
    let ctx = ExecutionContext::load(cwd, manifest_override, false).await?;
    let before = ctx.registry.list().await.len();
    shutdown::force_stop_registered(&ctx.registry, &ctx.port_manager).await;
    tracing::info!(count = before, "stopped registered services");
    Ok(0)
}
