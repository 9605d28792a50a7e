//! Health checker: per-service readiness probe with bounded exponential
//! backoff.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use reqwest::redirect::Policy;

use crate::runtime::descriptor::{HealthCheckKind, HealthCheckPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    Unhealthy,
}

/// Runs one probe attempt for `policy` against `port` (and `pid` for the
/// `process` kind).
pub async fn probe_once(policy: &HealthCheckPolicy, port: u16, pid: Option<u32>) -> bool {
    match policy.kind() {
        HealthCheckKind::Http => probe_http(port, policy.path().unwrap_or("/")).await,
        HealthCheckKind::Port => probe_port(port).await,
        HealthCheckKind::Process => pid.map(pid_alive).unwrap_or(false),
    }
}

async fn probe_http(port: u16, path: &str) -> bool {
    let client = match reqwest::Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(c) => c,
        Err(_) => return false,
    };

    let url = format!("http://127.0.0.1:{port}{path}");

    if let Ok(resp) = client.head(&url).send().await {
        if is_success_or_redirect(resp.status().as_u16()) {
            return true;
        }
    }

    match client.get(&url).send().await {
        Ok(resp) => is_success_or_redirect(resp.status().as_u16()),
        Err(_) => false,
    }
}

fn is_success_or_redirect(status: u16) -> bool {
    (200..400).contains(&status)
}

async fn probe_port(port: u16) -> bool {
    let addr: IpAddr = "127.0.0.1".parse().unwrap();
    tokio::time::timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect((addr, port)),
    )
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false)
}

#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    false
}

/// Exponential backoff loop: `initial_interval`, multiplier
/// 2.0, capped at `policy.max_interval()`, bounded by
/// `policy.total_timeout()`. Returns `Healthy` as soon as a probe
/// succeeds; `Unhealthy` once the total timeout elapses without success.
pub async fn wait_healthy(policy: &HealthCheckPolicy, port: u16, pid: Option<u32>) -> HealthOutcome {
    let start = Instant::now();
    let mut interval = policy.initial_interval();

    loop {
        if probe_once(policy, port, pid).await {
            return HealthOutcome::Healthy;
        }

        if start.elapsed() >= policy.total_timeout() {
            return HealthOutcome::Unhealthy;
        }

        let remaining = policy.total_timeout().saturating_sub(start.elapsed());
        tokio::time::sleep(interval.min(remaining)).await;
        interval = (interval * 2).min(policy.max_interval());

        if start.elapsed() >= policy.total_timeout() {
            return HealthOutcome::Unhealthy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn port_probe_succeeds_against_bound_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                if stream.is_err() {
                    break;
                }
            }
        });
        assert!(probe_port(port).await);
    }

    #[tokio::test]
    async fn port_probe_fails_against_closed_port() {
        assert!(!probe_port(3).await);
    }

    #[tokio::test]
    async fn backoff_gives_up_within_timeout_bounds() {
        let policy = HealthCheckPolicy::port().with_total_timeout(Duration::from_millis(300));
        let start = Instant::now();
        let outcome = wait_healthy(&policy, 3, None).await;
        assert_eq!(outcome, HealthOutcome::Unhealthy);
        // Elapsed lies within [timeout - max_interval, timeout + max_interval].
        let elapsed = start.elapsed();
        assert!(elapsed + policy.max_interval() >= policy.total_timeout());
        assert!(elapsed <= policy.total_timeout() + policy.max_interval());
    }
}
