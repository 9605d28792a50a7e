//! Cross-platform port-holder PID lookup and kill.
//!
//! Unix resolves the holder PID via `lsof -ti:PORT` and signals it
//! directly with `nix::sys::signal::kill(..., SIGKILL)` — never piped
//! through a shell pipeline, which would be non-portable and harder to
//! reason about. Windows resolves via `netstat` filtered by port and
//! terminates with `taskkill /F /PID`.

use tokio::process::Command;

/// Returns the PIDs currently listening on `port`, or an empty vec if
/// none (or if the lookup tool itself is unavailable).
pub async fn holders(port: u16) -> Vec<u32> {
    #[cfg(unix)]
    {
        unix_holders(port).await
    }
    #[cfg(windows)]
    {
        windows_holders(port).await
    }
}

#[cfg(unix)]
async fn unix_holders(port: u16) -> Vec<u32> {
    let output = Command::new("lsof")
        .arg("-ti")
        .arg(format!(":{port}"))
        .output()
        .await;

    let Ok(output) = output else {
        return Vec::new();
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}

#[cfg(windows)]
async fn windows_holders(port: u16) -> Vec<u32> {
    let output = Command::new("netstat").args(["-ano"]).output().await;

    let Ok(output) = output else {
        return Vec::new();
    };

    let needle = format!(":{port} ");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| line.contains(&needle) && line.contains("LISTENING"))
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|pid| pid.parse::<u32>().ok())
        .collect()
}

/// Kills every PID currently listening on `port`. Each process is
/// terminated individually by PID, never via a shell pipeline.
pub async fn kill_holders(port: u16) -> Vec<u32> {
    let pids = holders(port).await;
    for &pid in &pids {
        kill_pid(pid).await;
    }
    pids
}

#[cfg(unix)]
async fn kill_pid(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

#[cfg(windows)]
async fn kill_pid(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .output()
        .await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[tokio::test]
    async fn finds_holder_of_a_bound_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let pids = holders(port).await;
        // Best-effort: lsof may be unavailable in the test sandbox.
        assert!(pids.is_empty() || pids.contains(&std::process::id()));
    }
}
