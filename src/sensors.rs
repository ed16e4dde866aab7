use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::types::AxisReading;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const SECONDS_ELAPSED_COLUMN: &str = "seconds_elapsed";
const AXIS_COLUMNS: [&str; 3] = ["x", "y", "z"];

/// Column positions of one sensor CSV
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamColumns {
    pub time: usize,
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl StreamColumns {
    /// Locate the time and axis columns by name.
    ///
    /// `timestamp` wins over `seconds_elapsed` when both are present.
    pub fn from_headers(headers: &StringRecord, source_name: &str) -> PipelineResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let time = find(TIMESTAMP_COLUMN).or_else(|| find(SECONDS_ELAPSED_COLUMN));
        let axes: Vec<Option<usize>> = AXIS_COLUMNS.iter().map(|c| find(c)).collect();

        let mut missing = Vec::new();
        if time.is_none() {
            missing.push(format!("{} (or {})", TIMESTAMP_COLUMN, SECONDS_ELAPSED_COLUMN));
        }
        for (name, pos) in AXIS_COLUMNS.iter().zip(&axes) {
            if pos.is_none() {
                missing.push(name.to_string());
            }
        }

        match (time, axes[0], axes[1], axes[2]) {
            (Some(time), Some(x), Some(y), Some(z)) => Ok(Self { time, x, y, z }),
            _ => Err(PipelineError::SchemaMismatch {
                source_name: source_name.to_string(),
                missing,
            }),
        }
    }
}

/// Parse a cell, treating blanks and unparseable text as missing.
fn parse_cell(record: &StringRecord, idx: usize) -> f64 {
    record
        .get(idx)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Read one three-axis sensor stream from any CSV reader.
///
/// Rows without a usable time value are dropped here; rows with a missing
/// axis value are kept as NaN and dropped later by the merger.
pub fn read_sensor_csv<R: std::io::Read>(
    reader: R,
    source_name: &str,
) -> PipelineResult<Vec<AxisReading>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = StreamColumns::from_headers(&headers, source_name)?;

    let mut readings = Vec::new();
    let mut dropped = 0usize;
    for result in reader.records() {
        let record = result?;
        let timestamp = parse_cell(&record, columns.time);
        if !timestamp.is_finite() {
            dropped += 1;
            continue;
        }
        readings.push(AxisReading {
            timestamp,
            x: parse_cell(&record, columns.x),
            y: parse_cell(&record, columns.y),
            z: parse_cell(&record, columns.z),
        });
    }

    if dropped > 0 {
        debug!("{}: dropped {} rows without a time value", source_name, dropped);
    }
    Ok(readings)
}

/// Load a sensor CSV from disk.
pub fn load_sensor_csv(path: impl AsRef<Path>) -> PipelineResult<Vec<AxisReading>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let readings = read_sensor_csv(file, &path.display().to_string())?;
    info!("Loaded {} rows from {}", readings.len(), path.display());
    Ok(readings)
}

/// Sort readings by time. NaN-free timestamps are guaranteed by the loader.
pub fn sort_by_time(readings: &mut [AxisReading]) {
    readings.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}
