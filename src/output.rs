//! 結果ファイルの保存

use std::path::Path;

use tracing::info;

use crate::error::ScraperError;
use crate::maps::RunReport;

/// 前回の結果ファイルを削除する。削除した場合は true
pub fn remove_previous(path: &Path) -> Result<bool, ScraperError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed previous output {:?}", path);
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    info!("Saved {} places to {:?}", report.results.len(), path);
    Ok(())
}

pub fn read_report(path: &Path) -> Result<RunReport, ScraperError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
