//! `logs` command: a standalone invocation has no access to the live
//! `LogManager` owned by a `run` invocation's process, so it reads
//! `.polyrun/logs/<service>.jsonl` instead, via the disk mirror. A
//! dashboard's live-tail experience would instead run in-process and use
//! the in-memory `LogBuffer` directly.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use crate::context::ExecutionContext;
use crate::error::{PolyrunError, Result};
use crate::logs::LogEntry;

pub async fn logs(
    cwd: &Path,
    manifest_override: Option<&Path>,
    service: &str,
    follow: bool,
    lines: usize,
) -> Result<i32> {
    let ctx = ExecutionContext::load(cwd, manifest_override, false).await?;
    let path = ctx.state_dir.join("logs").join(format!("{service}.jsonl"));

    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| PolyrunError::LogIoError(format!("{}: {e}", path.display())))?;

    let entries: Vec<LogEntry> = contents
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    let skip = entries.len().saturating_sub(lines);
    for entry in &entries[skip..] {
        print_entry(entry);
    }

    if follow {
        follow_file(&path, contents.len() as u64).await?;
    }

    Ok(0)
}

async fn follow_file(path: &Path, mut offset: u64) -> Result<()> {
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;

        let mut file = match tokio::fs::File::open(path).await {
            Ok(f) => f,
            Err(_) => continue,
        };

        let len = file
            .metadata()
            .await
            .map(|m| m.len())
            .unwrap_or(offset);
        if len <= offset {
            continue;
        }

        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| PolyrunError::LogIoError(e.to_string()))?;

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| PolyrunError::LogIoError(e.to_string()))?;
            if read == 0 {
                break;
            }
            offset += read as u64;
            if let Ok(entry) = serde_json::from_str::<LogEntry>(line.trim_end()) {
                print_entry(&entry);
            }
        }
    }
}

fn print_entry(entry: &LogEntry) {
    println!(
        "[{}] {:<5} {}",
        entry.timestamp.to_rfc3339(),
        format!("{:?}", entry.level).to_lowercase(),
        entry.message
    );
}
