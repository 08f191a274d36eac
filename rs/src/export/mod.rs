use crate::core::errors::Result;
use crate::core::types::{Report, Route, Status};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Downloadable record of one route scan. Write-only; there is no import path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteScanExport {
    pub export_id: String,
    pub exported_at_unix_ms: u64,
    pub buffer_meters: f64,
    pub excluded_statuses: Vec<Status>,
    pub route: Route,
    pub matched_count: usize,
    pub matched_reports: Vec<Report>,
}

impl RouteScanExport {
    pub fn new(
        route: Route,
        matched_reports: Vec<Report>,
        buffer_meters: f64,
        excluded: &FxHashSet<Status>,
    ) -> Self {
        let mut excluded_statuses: Vec<Status> = excluded.iter().copied().collect();
        excluded_statuses.sort();

        let exported_at_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        RouteScanExport {
            export_id: Uuid::new_v4().to_string(),
            exported_at_unix_ms,
            buffer_meters,
            excluded_statuses,
            route,
            matched_count: matched_reports.len(),
            matched_reports,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn file_name(&self) -> String {
        format!("route-scan-{}.json", self.export_id)
    }
}
