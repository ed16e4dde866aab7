//! Schema check for raw recording directories
//!
//! Every `Accelerometer.csv` and `Gyroscope.csv` under a root directory must
//! carry exactly the expected header set (order is irrelevant). The overall
//! result is written to a status file as `Validation status: <bool>`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::dataset::{ACCEL_FILE, GYRO_FILE};
use crate::error::PipelineResult;

/// Columns written by the phone sensor logger for both streams
pub const RECORDING_COLUMNS: [&str; 5] = ["time", "seconds_elapsed", "x", "y", "z"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSchema {
    pub accelerometer: BTreeSet<String>,
    pub gyroscope: BTreeSet<String>,
}

impl Default for RecordingSchema {
    fn default() -> Self {
        let columns: BTreeSet<String> = RECORDING_COLUMNS.iter().map(|c| c.to_string()).collect();
        Self {
            accelerometer: columns.clone(),
            gyroscope: columns,
        }
    }
}

impl RecordingSchema {
    fn expected_for(&self, file_name: &str) -> Option<&BTreeSet<String>> {
        match file_name {
            ACCEL_FILE => Some(&self.accelerometer),
            GYRO_FILE => Some(&self.gyroscope),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheck {
    pub path: PathBuf,
    pub valid: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checked: Vec<FileCheck>,
}

impl ValidationReport {
    /// True when every checked file matched. An empty tree is valid.
    pub fn is_valid(&self) -> bool {
        self.checked.iter().all(|c| c.valid)
    }

    pub fn invalid_files(&self) -> impl Iterator<Item = &Path> {
        self.checked
            .iter()
            .filter(|c| !c.valid)
            .map(|c| c.path.as_path())
    }
}

/// Header names of a CSV file, whitespace-trimmed.
pub fn read_header(path: &Path) -> PipelineResult<BTreeSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

fn collect_sensor_files(dir: &Path, out: &mut Vec<PathBuf>) -> PipelineResult<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_sensor_files(&path, out)?;
        } else if matches!(
            path.file_name().and_then(|n| n.to_str()),
            Some(ACCEL_FILE) | Some(GYRO_FILE)
        ) {
            out.push(path);
        }
    }
    Ok(())
}

/// Check every sensor file below `root` against `schema`.
pub fn validate_recordings(root: &Path, schema: &RecordingSchema) -> PipelineResult<ValidationReport> {
    let mut files = Vec::new();
    collect_sensor_files(root, &mut files)?;

    let mut report = ValidationReport::default();
    for path in files {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let Some(expected) = schema.expected_for(name) else {
            continue;
        };
        let valid = &read_header(&path)? == expected;
        if valid {
            info!("Validated: {}", path.display());
        } else {
            warn!("Invalid columns in: {}", path.display());
        }
        report.checked.push(FileCheck { path, valid });
    }
    Ok(report)
}

/// Validate `root` and record the outcome in `status_file`.
pub fn validate_and_record(
    root: &Path,
    schema: &RecordingSchema,
    status_file: &Path,
) -> PipelineResult<ValidationReport> {
    let report = validate_recordings(root, schema)?;
    if let Some(parent) = status_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(
        status_file,
        format!("Validation status: {}", report.is_valid()),
    )?;
    info!(
        "{} sensor files checked, status {} written to {}",
        report.checked.len(),
        report.is_valid(),
        status_file.display()
    );
    Ok(report)
}
