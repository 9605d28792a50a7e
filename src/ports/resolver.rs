//! 5-step port priority resolution.
//!
//! Priority, highest first: (1) manifest `ports[0]` — explicit; (2)
//! framework config file; (3) environment variables; (4) framework
//! default table; (5) dynamic upward scan from 3000. Steps 2-5 are
//! flexible.

use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::path::Path;

use crate::detect::Detection;
use crate::error::Result;
use crate::ports::spec::parse as parse_port_spec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub port: u16,
    pub explicit: bool,
}

pub struct ResolverInput<'a> {
    pub service_name: &'a str,
    pub project_dir: &'a Path,
    pub manifest_ports: &'a [String],
    pub containerized: bool,
    pub detection: &'a Detection,
    pub environment: &'a HashMap<String, String>,
    pub ports_in_use: &'a HashSet<u16>,
}

pub fn resolve(input: &ResolverInput) -> Result<Resolution> {
    if let Some(first) = input.manifest_ports.first() {
        let mapping = parse_port_spec(first, input.containerized)?;
        let port = if mapping.host_port == 0 {
            mapping.container_port
        } else {
            mapping.host_port
        };
        return Ok(Resolution { port, explicit: true });
    }

    if let Some(port) = from_framework_config(input.project_dir, &input.detection.framework) {
        return Ok(Resolution { port, explicit: false });
    }

    if let Some(port) = from_environment(input.service_name, input.environment) {
        return Ok(Resolution { port, explicit: false });
    }

    if let Some(port) = from_framework_default(&input.detection.framework) {
        return Ok(Resolution { port, explicit: false });
    }

    let port = scan_for_free_port(input.ports_in_use);
    Ok(Resolution { port, explicit: false })
}

fn from_framework_config(project_dir: &Path, framework: &str) -> Option<u16> {
    match framework {
        "Next.js" | "Angular" | "Nuxt" | "Vite-React" | "SvelteKit" | "Remix" | "Astro"
        | "NestJS" | "react" | "vue" | "express" | "Node.js" => {
            node_script_port(project_dir)
        }
        "ASP.NET Core" | "Aspire" | ".NET" => dotnet_launch_settings_port(project_dir),
        "Django" => django_settings_port(project_dir),
        "Spring Boot" => spring_boot_port(project_dir),
        _ => None,
    }
}

fn node_script_port(project_dir: &Path) -> Option<u16> {
    let contents = crate::detect::read_to_string_lossy(&project_dir.join("package.json"))?;
    for script_key in ["\"dev\"", "\"start\"", "\"serve\""] {
        if let Some(idx) = contents.find(script_key) {
            let rest = &contents[idx..];
            let line_end = rest.find(['\n', ',']).unwrap_or(rest.len().min(300));
            let snippet = &rest[..line_end.min(rest.len())];
            if let Some(port) = extract_port_after_flag(snippet) {
                return Some(port);
            }
        }
    }
    None
}

/// Matches `(--port[=\s]|:)(\d+)` against a script snippet.
fn extract_port_after_flag(snippet: &str) -> Option<u16> {
    if let Some(idx) = snippet.find("--port") {
        let rest = &snippet[idx + "--port".len()..];
        let rest = rest.trim_start_matches(['=', ' ']);
        return take_leading_digits(rest);
    }
    if let Some(idx) = snippet.rfind(':') {
        let rest = &snippet[idx + 1..];
        return take_leading_digits(rest);
    }
    None
}

fn take_leading_digits(s: &str) -> Option<u16> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn dotnet_launch_settings_port(project_dir: &Path) -> Option<u16> {
    let contents = crate::detect::read_to_string_lossy(
        &project_dir.join("Properties").join("launchSettings.json"),
    )?;
    let idx = contents.find("http://")?;
    let rest = &contents[idx + "http://".len()..];
    let colon = rest.find(':')?;
    take_leading_digits(&rest[colon + 1..])
}

fn django_settings_port(project_dir: &Path) -> Option<u16> {
    let contents = crate::detect::read_to_string_lossy(&project_dir.join("settings.py"))?;
    for line in contents.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("PORT") {
            let rest = rest.trim_start();
            if let Some(rest) = rest.strip_prefix('=') {
                if let Some(port) = take_leading_digits(rest.trim_start()) {
                    return Some(port);
                }
            }
        }
    }
    None
}

fn spring_boot_port(project_dir: &Path) -> Option<u16> {
    if let Some(contents) = crate::detect::read_to_string_lossy(
        &project_dir.join("src/main/resources/application.properties"),
    ) {
        for line in contents.lines() {
            if let Some(rest) = line.trim().strip_prefix("server.port") {
                let rest = rest.trim_start().strip_prefix('=')?;
                if let Some(port) = take_leading_digits(rest.trim_start()) {
                    return Some(port);
                }
            }
        }
    }
    if let Some(contents) = crate::detect::read_to_string_lossy(
        &project_dir.join("src/main/resources/application.yml"),
    )
    .or_else(|| {
        crate::detect::read_to_string_lossy(
            &project_dir.join("src/main/resources/application.yaml"),
        )
    }) {
        for line in contents.lines() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("port:") {
                if let Some(port) = take_leading_digits(rest.trim_start()) {
                    return Some(port);
                }
            }
        }
    }
    None
}

fn from_environment(service_name: &str, environment: &HashMap<String, String>) -> Option<u16> {
    let upper = service_name.to_uppercase().replace('-', "_");
    let service_key = format!("{upper}_PORT");
    for key in [
        service_key.as_str(),
        "PORT",
        "HTTP_PORT",
        "WEB_PORT",
        "SERVICE_PORT",
    ] {
        if let Some(value) = environment.get(key) {
            if let Ok(port) = value.parse() {
                return Some(port);
            }
        }
    }
    None
}

/// Framework default table — must match exactly.
fn from_framework_default(framework: &str) -> Option<u16> {
    let port = match framework {
        "Next.js" | "express" | "NestJS" | "Remix" | "Nuxt" => 3000,
        "react" | "vue" | "Vite-React" | "SvelteKit" => 5173,
        "Angular" => 4200,
        "Astro" => 4321,
        "Django" | "FastAPI" => 8000,
        "Flask" => 5000,
        "Streamlit" => 8501,
        "Gradio" => 7860,
        "ASP.NET Core" | "Blazor" => 5000,
        "Aspire" => 15888,
        "Spring Boot" | "Quarkus" | "Micronaut" => 8080,
        _ => return None,
    };
    Some(port)
}

/// Scans upward from 3000, skipping ports in `ports_in_use` and any port
/// that fails a bind probe on loopback; caps at 65534.
fn scan_for_free_port(ports_in_use: &HashSet<u16>) -> u16 {
    for port in 3000..65534u16 {
        if ports_in_use.contains(&port) {
            continue;
        }
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return port;
        }
    }
    65534
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Detection, Language};
    use std::fs;

    fn detection(framework: &str) -> Detection {
        Detection {
            language: Language::JavaScript,
            framework: framework.to_string(),
            package_manager: Some("npm".to_string()),
        }
    }

    #[test]
    fn explicit_port_wins_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        let env = HashMap::new();
        let in_use = HashSet::new();
        let d = detection("Next.js");
        let input = ResolverInput {
            service_name: "web",
            project_dir: dir.path(),
            manifest_ports: &["9999".to_string()],
            containerized: false,
            detection: &d,
            environment: &env,
            ports_in_use: &in_use,
        };
        let r = resolve(&input).unwrap();
        assert_eq!(r.port, 9999);
        assert!(r.explicit);
    }

    #[test]
    fn node_script_port_extraction() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"scripts":{"dev":"next dev --port 3500"}}"#,
        )
        .unwrap();
        assert_eq!(node_script_port(dir.path()), Some(3500));
    }

    #[test]
    fn framework_default_for_flask() {
        assert_eq!(from_framework_default("Flask"), Some(5000));
    }

    #[test]
    fn env_var_precedence_service_specific_first() {
        let mut env = HashMap::new();
        env.insert("WEB_PORT".to_string(), "1234".to_string());
        env.insert("PORT".to_string(), "9000".to_string());
        assert_eq!(from_environment("web", &env), Some(1234));
    }

    #[test]
    fn falls_through_to_scan_when_nothing_else_matches() {
        let dir = tempfile::tempdir().unwrap();
        let env = HashMap::new();
        let in_use = HashSet::new();
        let d = detection("unknown-framework");
        let input = ResolverInput {
            service_name: "svc",
            project_dir: dir.path(),
            manifest_ports: &[],
            containerized: false,
            detection: &d,
            environment: &env,
            ports_in_use: &in_use,
        };
        let r = resolve(&input).unwrap();
        assert!(!r.explicit);
        assert!(r.port >= 3000);
    }
}
