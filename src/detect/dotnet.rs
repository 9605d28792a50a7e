//! .NET detection: Aspire (AppHost.cs) > ASP.NET Core (csproj scan for
//! `Microsoft.NET.Sdk.Web`) > generic ".NET".

use std::path::Path;

use super::read_to_string_lossy;

pub fn matches(project_dir: &Path) -> bool {
    find_csproj(project_dir).is_some()
        || has_extension(project_dir, "sln")
        || has_extension(project_dir, "fsproj")
}

pub fn detect(project_dir: &Path) -> String {
    if project_dir.join("AppHost.cs").is_file() {
        return "Aspire".to_string();
    }
    if let Some(csproj) = find_csproj(project_dir) {
        if let Some(contents) = read_to_string_lossy(&csproj) {
            if contents.contains("Microsoft.NET.Sdk.Web") {
                return "ASP.NET Core".to_string();
            }
        }
    }
    ".NET".to_string()
}

fn find_csproj(project_dir: &Path) -> Option<std::path::PathBuf> {
    first_with_extension(project_dir, "csproj")
}

fn has_extension(project_dir: &Path, ext: &str) -> bool {
    first_with_extension(project_dir, ext).is_some()
}

fn first_with_extension(project_dir: &Path, ext: &str) -> Option<std::path::PathBuf> {
    let entries = std::fs::read_dir(project_dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            return Some(path);
        }
    }
    None
}
