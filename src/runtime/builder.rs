//! Turns a detected language/framework plus an assigned port into the
//! concrete program, arguments, and environment overlay needed to launch
//! a service. One function per language family, dispatched by a `match`
//! over the detection result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::detect::{Detection, Language};
use crate::error::{PolyrunError, Result};
use crate::manifest::Service;
use crate::ports::spec::Protocol;
use crate::runtime::descriptor::{HealthCheckPolicy, RuntimeDescriptor};
use crate::runtime::python_interpreter;

/// Builds the concrete launch plan for one service. `manifest_dir` is the
/// repository root the service's `project` path is relative to.
pub fn build(
    service_name: &str,
    manifest_dir: &Path,
    service: &Service,
    detection: &Detection,
    port: u16,
) -> Result<RuntimeDescriptor> {
    let project_dir = manifest_dir.join(&service.project);
    let mut env_overlay = HashMap::new();

    let (command, argv) = match detection.language {
        Language::TypeScript | Language::JavaScript => {
            node_command(&project_dir, detection, port)?
        }
        Language::DotNet => dotnet_command(manifest_dir, &project_dir, service, detection)?,
        Language::Java => java_command(detection),
        Language::Go => ("go".to_string(), vec!["run".to_string(), ".".to_string()]),
        Language::Rust => ("cargo".to_string(), vec!["run".to_string()]),
        Language::Php => php_command(&project_dir, detection, port),
        Language::Python => python_command(
            service_name,
            &project_dir,
            service,
            detection,
            port,
            &mut env_overlay,
        )?,
        Language::Docker => {
            return Err(PolyrunError::FrameworkUnsupported(
                "Docker services are launched by an external collaborator, not this core"
                    .to_string(),
            ))
        }
    };

    let health_check = default_health_check(&detection.framework);

    Ok(RuntimeDescriptor::new(
        service_name.to_string(),
        project_dir,
        command,
        argv,
        env_overlay,
        detection.language,
        detection.framework.clone(),
        detection.package_manager.clone(),
        port,
        Protocol::Tcp,
        health_check,
    ))
}

fn node_command(
    project_dir: &Path,
    detection: &Detection,
    port: u16,
) -> Result<(String, Vec<String>)> {
    let pm = detection.package_manager.as_deref().unwrap_or("npm");

    Ok(match detection.framework.as_str() {
        "Angular" => (
            "ng".to_string(),
            vec!["serve".to_string(), "--port".to_string(), port.to_string()],
        ),
        "NestJS" => (pm.to_string(), vec!["run".to_string(), "start:dev".to_string()]),
        "Next.js" | "Nuxt" | "Vite-React" | "SvelteKit" | "Remix" | "Astro" | "react" | "vue" => {
            (pm.to_string(), vec!["run".to_string(), "dev".to_string()])
        }
        _ => {
            let script = if has_script(project_dir, "dev") {
                "dev"
            } else {
                "start"
            };
            (pm.to_string(), vec!["run".to_string(), script.to_string()])
        }
    })
}

fn has_script(project_dir: &Path, name: &str) -> bool {
    crate::detect::read_to_string_lossy(&project_dir.join("package.json"))
        .map(|contents| contents.contains(&format!("\"{name}\"")))
        .unwrap_or(false)
}

fn dotnet_command(
    manifest_dir: &Path,
    project_dir: &Path,
    service: &Service,
    detection: &Detection,
) -> Result<(String, Vec<String>)> {
    let csproj = find_csproj(project_dir)
        .ok_or_else(|| PolyrunError::EntrypointMissing(service.project.clone()))?;

    let mut args = vec!["run".to_string(), "--project".to_string(), csproj];

    // A repo checked out with the Azure Developer CLI carries an
    // `azure.yaml` at its root; under that workflow azd itself drives the
    // launch profile, so dotnet must be told not to apply one.
    if detection.framework == "Aspire" && manifest_dir.join("azure.yaml").is_file() {
        args.push("--no-launch-profile".to_string());
    }

    Ok(("dotnet".to_string(), args))
}

fn find_csproj(project_dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(project_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csproj") {
            return Some(path.to_string_lossy().into_owned());
        }
    }
    None
}

fn java_command(detection: &Detection) -> (String, Vec<String>) {
    let is_maven = detection.package_manager.as_deref() == Some("maven");
    match detection.framework.as_str() {
        "Spring Boot" if is_maven => ("mvn".to_string(), vec!["spring-boot:run".to_string()]),
        "Spring Boot" => ("gradle".to_string(), vec!["bootRun".to_string()]),
        _ if is_maven => ("mvn".to_string(), vec!["exec:java".to_string()]),
        _ => ("gradle".to_string(), vec!["run".to_string()]),
    }
}

fn php_command(project_dir: &Path, detection: &Detection, port: u16) -> (String, Vec<String>) {
    if detection.framework == "Laravel" {
        (
            "php".to_string(),
            vec![
                "artisan".to_string(),
                "serve".to_string(),
                "--host=0.0.0.0".to_string(),
                format!("--port={port}"),
            ],
        )
    } else {
        let _ = project_dir;
        (
            "php".to_string(),
            vec!["-S".to_string(), format!("0.0.0.0:{port}")],
        )
    }
}

fn python_command(
    service_name: &str,
    project_dir: &Path,
    service: &Service,
    detection: &Detection,
    port: u16,
    env_overlay: &mut HashMap<String, String>,
) -> Result<(String, Vec<String>)> {
    let interpreter = python_interpreter::resolve(project_dir);

    if detection.framework == "Django" {
        if !project_dir.join("manage.py").is_file() {
            return Err(PolyrunError::EntrypointMissing(service_name.to_string()));
        }
        return Ok((
            interpreter,
            vec![
                "manage.py".to_string(),
                "runserver".to_string(),
                format!("0.0.0.0:{port}"),
            ],
        ));
    }

    let entry = resolve_entrypoint(project_dir, service, service_name)?;
    let module_stem = entry.trim_end_matches(".py").replace(['/', '\\'], ".");

    Ok(match detection.framework.as_str() {
        "FastAPI" => (
            interpreter,
            vec![
                "-m".to_string(),
                "uvicorn".to_string(),
                format!("{module_stem}:app"),
                "--reload".to_string(),
                "--host".to_string(),
                "0.0.0.0".to_string(),
                "--port".to_string(),
                port.to_string(),
            ],
        ),
        "Flask" => {
            env_overlay.insert("FLASK_APP".to_string(), entry.clone());
            env_overlay.insert("FLASK_ENV".to_string(), "development".to_string());
            (
                interpreter,
                vec![
                    "-m".to_string(),
                    "flask".to_string(),
                    "run".to_string(),
                    "--host".to_string(),
                    "0.0.0.0".to_string(),
                    "--port".to_string(),
                    port.to_string(),
                ],
            )
        }
        "Streamlit" => (
            interpreter,
            vec![
                "-m".to_string(),
                "streamlit".to_string(),
                "run".to_string(),
                entry,
                "--server.port".to_string(),
                port.to_string(),
            ],
        ),
        _ => (interpreter, vec![entry]),
    })
}

/// Uses the manifest's `entrypoint` when set, else the first existing of
/// `main.py | app.py | src/main.py | src/app.py`.
fn resolve_entrypoint(project_dir: &Path, service: &Service, service_name: &str) -> Result<String> {
    if let Some(entrypoint) = &service.entrypoint {
        return Ok(entrypoint.clone());
    }
    for candidate in ["main.py", "app.py", "src/main.py", "src/app.py"] {
        if project_dir.join(candidate).is_file() {
            return Ok(candidate.to_string());
        }
    }
    Err(PolyrunError::EntrypointMissing(service_name.to_string()))
}

fn default_health_check(framework: &str) -> HealthCheckPolicy {
    match framework {
        "FastAPI" => HealthCheckPolicy::http("/docs"),
        "Spring Boot" => HealthCheckPolicy::http("/actuator/health"),
        "Go" | "Rust" => HealthCheckPolicy::port(),
        _ => HealthCheckPolicy::http("/"),
    }
}
