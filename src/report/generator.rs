use crate::persistence::{atomic_write, reports_dir};
use crate::report::stats::Report;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Write a report as one timestamped JSON artifact under `reports/`, or to an
/// explicit output path. Returns the written path.
pub fn export_report(base: &Path, report: &Report, output: Option<PathBuf>) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path,
        None => {
            let dir = reports_dir(base);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            dir.join(format!(
                "report_{}.json",
                Local::now().format("%Y%m%d_%H%M%S")
            ))
        }
    };

    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    atomic_write(&path, &json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;

    Ok(path)
}
