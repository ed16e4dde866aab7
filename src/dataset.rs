//! Labelled training data
//!
//! Training recordings come from a phone sensor logger: one directory per
//! session holding `Accelerometer.csv` and `Gyroscope.csv`, both keyed by
//! `seconds_elapsed`. A JSON manifest assigns each directory an activity
//! label and a usable duration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::features::{extract_features_parallel, feature_names};
use crate::sensors::{load_sensor_csv, sort_by_time};
use crate::storage;
use crate::types::{AxisReading, MergedSeries, SensorSample, Window};
use crate::windowing::segment;

pub const ACCEL_FILE: &str = "Accelerometer.csv";
pub const GYRO_FILE: &str = "Gyroscope.csv";

/// Seconds skipped at the start of every training recording
pub const RECORDING_LEAD_IN_SECS: f64 = 10.0;

fn default_duration() -> f64 {
    60.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecordings {
    pub label: String,
    pub dirs: Vec<PathBuf>,
    /// Seconds kept after the lead-in
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityManifest {
    pub activities: Vec<ActivityRecordings>,
}

impl ActivityManifest {
    /// Load a manifest; relative directories resolve against the manifest's
    /// own directory.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let mut manifest: Self = storage::read_json(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for activity in &mut manifest.activities {
            for dir in &mut activity.dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(manifest)
    }
}

/// A merged recording whose every row carries the same label
#[derive(Clone, Debug)]
pub struct LabelledRecording {
    pub label: String,
    pub source: PathBuf,
    pub series: MergedSeries,
}

impl LabelledRecording {
    pub fn row_labels(&self) -> Vec<String> {
        vec![self.label.clone(); self.series.len()]
    }
}

/// Millisecond key of a `seconds_elapsed` value rounded to 3 decimals.
fn elapsed_key(t: f64) -> i64 {
    (t * 1000.0).round() as i64
}

/// Join accelerometer and gyroscope rows with identical rounded
/// `seconds_elapsed`, keeping `lead_in < t <= lead_in + duration`.
///
/// Unlike [`crate::merge::merge_streams`] this is an exact join: training
/// recordings are sampled on a shared clock.
pub fn join_on_elapsed(
    accel: &[AxisReading],
    gyro: &[AxisReading],
    duration_secs: f64,
) -> MergedSeries {
    let mut gyro_by_key: HashMap<i64, &AxisReading> = HashMap::with_capacity(gyro.len());
    for g in gyro {
        gyro_by_key.entry(elapsed_key(g.timestamp)).or_insert(g);
    }

    let mut accel = accel.to_vec();
    sort_by_time(&mut accel);

    let lower = elapsed_key(RECORDING_LEAD_IN_SECS);
    let upper = elapsed_key(RECORDING_LEAD_IN_SECS + duration_secs);

    let mut samples: Vec<SensorSample> = Vec::new();
    let mut last_key = None;
    for a in &accel {
        let key = elapsed_key(a.timestamp);
        if key <= lower || key > upper || last_key == Some(key) {
            continue;
        }
        let Some(g) = gyro_by_key.get(&key) else {
            continue;
        };
        if !a.is_complete() || !g.is_complete() {
            continue;
        }
        samples.push(SensorSample::from_readings(key as f64 / 1000.0, a, g));
        last_key = Some(key);
    }

    // keys strictly increase, so ordering always holds
    MergedSeries::from_samples(samples).unwrap_or_default()
}

/// Load and join one recording directory.
pub fn load_recording(
    dir: &Path,
    label: &str,
    duration_secs: f64,
) -> PipelineResult<LabelledRecording> {
    let accel = load_sensor_csv(dir.join(ACCEL_FILE))?;
    let gyro = load_sensor_csv(dir.join(GYRO_FILE))?;
    let series = join_on_elapsed(&accel, &gyro, duration_secs);
    info!(
        "{}: {} joined rows labelled {:?}",
        dir.display(),
        series.len(),
        label
    );
    Ok(LabelledRecording {
        label: label.to_string(),
        source: dir.to_path_buf(),
        series,
    })
}

/// Load every recording named by the manifest.
///
/// Directories missing a sensor file, or yielding no rows, are logged and
/// skipped. Fails with [`PipelineError::EmptyMerge`] if nothing is left.
pub fn collect_recordings(manifest: &ActivityManifest) -> PipelineResult<Vec<LabelledRecording>> {
    let mut recordings = Vec::new();
    for activity in &manifest.activities {
        for dir in &activity.dirs {
            if !dir.join(ACCEL_FILE).exists() || !dir.join(GYRO_FILE).exists() {
                warn!("Missing sensor file in {}", dir.display());
                continue;
            }
            let recording = load_recording(dir, &activity.label, activity.duration_secs)?;
            if recording.series.is_empty() {
                warn!("No usable rows in {}", dir.display());
                continue;
            }
            recordings.push(recording);
        }
    }
    if recordings.is_empty() {
        return Err(PipelineError::EmptyMerge);
    }
    Ok(recordings)
}

/// Training-mode windows of every recording. Windows never span two
/// recordings; recordings shorter than one window are skipped.
pub fn labelled_windows(
    recordings: &[LabelledRecording],
    config: &PipelineConfig,
) -> PipelineResult<Vec<Window>> {
    let mut windows = Vec::new();
    for recording in recordings {
        let labels = recording.row_labels();
        match segment(
            &recording.series,
            config.window_size,
            config.step_size,
            Some(&labels),
        ) {
            Ok(w) => windows.extend(w),
            Err(PipelineError::InsufficientData { rows, window_size }) => {
                warn!(
                    "{}: {} rows is shorter than one window of {}, skipped",
                    recording.source.display(),
                    rows,
                    window_size
                );
            }
            Err(e) => return Err(e),
        }
    }
    if windows.is_empty() {
        let rows = recordings.iter().map(|r| r.series.len()).max().unwrap_or(0);
        return Err(PipelineError::InsufficientData {
            rows,
            window_size: config.window_size,
        });
    }
    info!("Created {} windows of size {}", windows.len(), config.window_size);
    Ok(windows)
}

/// Feature matrix with its labels, as persisted between training stages
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl FeatureSet {
    pub fn from_windows(
        windows: &[Window],
        sampling_rate: f64,
        threads: usize,
    ) -> PipelineResult<Self> {
        let matrix = extract_features_parallel(windows, sampling_rate, threads)?;
        let labels = windows
            .iter()
            .map(|w| w.label.clone().unwrap_or_default())
            .collect();
        Ok(Self {
            feature_names: feature_names(),
            features: matrix.rows().into_iter().map(|r| r.to_vec()).collect(),
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_matrix(&self) -> PipelineResult<Array2<f64>> {
        let cols = self.feature_names.len();
        let mut data = Vec::with_capacity(self.features.len() * cols);
        for row in &self.features {
            if row.len() != cols {
                return Err(PipelineError::FeatureWidthMismatch {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Array2::from_shape_vec((self.features.len(), cols), data).map_err(|_| {
            PipelineError::FeatureWidthMismatch {
                expected: cols,
                actual: 0,
            }
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        storage::write_json(path.as_ref(), self)?;
        info!(
            "Saved {} feature rows to {}",
            self.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        storage::read_json(path)
    }
}
