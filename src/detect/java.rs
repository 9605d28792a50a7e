//! Java detection: Spring Boot vs. generic, Maven vs. Gradle.

use std::path::Path;

use super::read_to_string_lossy;

pub fn matches(project_dir: &Path) -> bool {
    project_dir.join("pom.xml").is_file()
        || project_dir.join("build.gradle").is_file()
        || project_dir.join("build.gradle.kts").is_file()
}

/// Returns `(framework, package_manager)` where `package_manager` is
/// `"maven"` or `"gradle"`.
pub fn detect(project_dir: &Path) -> (String, Option<String>) {
    let package_manager = if project_dir.join("pom.xml").is_file() {
        "maven"
    } else {
        "gradle"
    };

    let is_spring_boot = match package_manager {
        "maven" => read_to_string_lossy(&project_dir.join("pom.xml"))
            .map(|c| c.contains("spring-boot"))
            .unwrap_or(false),
        _ => {
            let gradle = read_to_string_lossy(&project_dir.join("build.gradle"))
                .or_else(|| read_to_string_lossy(&project_dir.join("build.gradle.kts")))
                .unwrap_or_default();
            gradle.contains("spring-boot")
        }
    };

    let framework = if is_spring_boot {
        "Spring Boot".to_string()
    } else {
        "Java".to_string()
    };

    (framework, Some(package_manager.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn maven_spring_boot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project><artifactId>spring-boot-starter-web</artifactId></project>",
        )
        .unwrap();
        let (framework, pm) = detect(dir.path());
        assert_eq!(framework, "Spring Boot");
        assert_eq!(pm, Some("maven".to_string()));
    }

    #[test]
    fn gradle_generic_java() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("build.gradle"), "plugins { id 'java' }").unwrap();
        let (framework, pm) = detect(dir.path());
        assert_eq!(framework, "Java");
        assert_eq!(pm, Some("gradle".to_string()));
    }
}
