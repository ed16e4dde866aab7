//! Inference: two raw sensor streams in, per-activity durations out
//!
//! merge -> segment -> extract -> predict -> summarize. Every stage error is
//! returned as is; nothing partial is produced once a stage fails.

use std::path::Path;

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::classifier::ActivityClassifier;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::features::extract_features_parallel;
use crate::merge::merge_streams;
use crate::sensors::load_sensor_csv;
use crate::summary::{summarize, ActivitySummary};
use crate::types::AxisReading;
use crate::windowing::segment;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowPrediction {
    pub start_timestamp: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub summary: ActivitySummary,
    pub windows: Vec<WindowPrediction>,
    pub merged_rows: usize,
    pub feature_count: usize,
    /// RFC 3339, UTC
    pub generated_at: String,
}

/// Payload written by the inference binary
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub activity_summary_seconds: ActivitySummary,
}

impl PredictionReport {
    pub fn to_output(&self, friendly: bool) -> SummaryOutput {
        let summary = if friendly {
            self.summary.with_friendly_names()
        } else {
            self.summary.clone()
        };
        SummaryOutput {
            activity_summary_seconds: summary,
        }
    }
}

pub struct ActivityPipeline<'a> {
    config: PipelineConfig,
    classifier: &'a dyn ActivityClassifier,
    threads: usize,
}

impl<'a> ActivityPipeline<'a> {
    pub fn new(
        config: PipelineConfig,
        classifier: &'a dyn ActivityClassifier,
    ) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            classifier,
            threads: 1,
        })
    }

    /// Feature extraction threads; 0 is treated as 1.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, accel: &[AxisReading], gyro: &[AxisReading]) -> PipelineResult<PredictionReport> {
        let series = merge_streams(accel, gyro)?;
        let windows = segment(&series, self.config.window_size, self.config.step_size, None)?;
        let features =
            extract_features_parallel(&windows, self.config.sampling_rate, self.threads)?;

        let labels = self.classifier.predict(features.view())?;
        if labels.len() != windows.len() {
            return Err(PipelineError::LabelMismatch {
                rows: windows.len(),
                labels: labels.len(),
            });
        }

        let summary = summarize(&labels, self.config.window_duration);
        info!(
            "Classified {} windows into {} activities ({} s total)",
            windows.len(),
            summary.len(),
            summary.total_seconds()
        );

        let predictions = windows
            .iter()
            .zip(labels)
            .map(|(w, label)| WindowPrediction {
                start_timestamp: w.start_timestamp,
                label,
            })
            .collect();

        Ok(PredictionReport {
            summary,
            windows: predictions,
            merged_rows: series.len(),
            feature_count: features.ncols(),
            generated_at: Utc::now().to_rfc3339(),
        })
    }

    pub fn run_files(&self, accel_path: &Path, gyro_path: &Path) -> PipelineResult<PredictionReport> {
        let accel = load_sensor_csv(accel_path)?;
        let gyro = load_sensor_csv(gyro_path)?;
        self.run(&accel, &gyro)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::CentroidClassifier;
    use crate::features::{FeatureExtractor, FEATURE_COUNT};
    use ndarray::{concatenate, ArrayView2, Axis};
    use std::fs;

    struct ConstantClassifier(&'static str);

    impl ActivityClassifier for ConstantClassifier {
        fn predict(&self, features: ArrayView2<'_, f64>) -> PipelineResult<Vec<String>> {
            Ok(vec![self.0.to_string(); features.nrows()])
        }
    }

    struct ShortClassifier;

    impl ActivityClassifier for ShortClassifier {
        fn predict(&self, _features: ArrayView2<'_, f64>) -> PipelineResult<Vec<String>> {
            Ok(vec!["walking".to_string()])
        }
    }

    /// `n` rows at 50 Hz starting from t = 0
    fn stream(n: usize, phase: f64) -> Vec<AxisReading> {
        scaled_stream(n, phase, 1.0)
    }

    fn scaled_stream(n: usize, phase: f64, amplitude: f64) -> Vec<AxisReading> {
        (0..n)
            .map(|i| {
                let t = i as f64 / 50.0;
                let s = amplitude * (t * 2.0 + phase).sin();
                AxisReading::new(t, s, 0.5 * s, 9.81 + s)
            })
            .collect()
    }

    /// Five extracted 78-column feature rows of one amplitude
    fn extracted_features(amplitude: f64) -> ndarray::Array2<f64> {
        let series = merge_streams(
            &scaled_stream(1551, 0.0, amplitude),
            &scaled_stream(1551, 1.0, amplitude),
        )
        .unwrap();
        let windows = segment(&series, 250, 250, None).unwrap();
        FeatureExtractor::new(50.0).extract_many(&windows).unwrap()
    }

    #[test]
    fn test_end_to_end_five_windows() {
        // t > 5.0 keeps rows 251..=1550
        let accel = stream(1551, 0.0);
        let gyro = stream(1551, 1.0);
        let classifier = ConstantClassifier("walking");
        let pipeline = ActivityPipeline::new(PipelineConfig::default(), &classifier).unwrap();

        let report = pipeline.run(&accel, &gyro).unwrap();
        assert_eq!(report.merged_rows, 1300);
        assert_eq!(report.windows.len(), 5);
        assert_eq!(report.feature_count, 78);
        assert_eq!(report.summary.get("walking"), Some(25));
        assert_eq!(report.summary.len(), 1);
        assert!(report.windows[0].start_timestamp > 5.0);
    }

    #[test]
    fn test_fitted_model_accepts_extracted_features() {
        let active = extracted_features(1.0);
        let still = extracted_features(0.1);
        let features = concatenate(Axis(0), &[active.view(), still.view()]).unwrap();
        assert_eq!(features.dim(), (10, FEATURE_COUNT));
        let labels: Vec<String> = ["1"; 5].iter().chain(&["3"; 5]).map(|s| s.to_string()).collect();

        let config = PipelineConfig::default();
        let model = CentroidClassifier::fit(features.view(), &labels, &config).unwrap();
        assert_eq!(model.n_features(), FEATURE_COUNT);

        let pipeline = ActivityPipeline::new(config, &model).unwrap();
        let report = pipeline.run(&stream(1551, 0.0), &stream(1551, 1.0)).unwrap();
        assert_eq!(report.feature_count, FEATURE_COUNT);
        assert_eq!(report.summary.get("1"), Some(25));
        assert_eq!(report.summary.len(), 1);

        let quiet = pipeline
            .run(&scaled_stream(1551, 0.0, 0.1), &scaled_stream(1551, 1.0, 0.1))
            .unwrap();
        assert_eq!(quiet.summary.get("3"), Some(25));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let accel = stream(1551, 0.0);
        let gyro = stream(1551, 1.0);
        let classifier = ConstantClassifier("1");
        let sequential = ActivityPipeline::new(PipelineConfig::default(), &classifier)
            .unwrap()
            .run(&accel, &gyro)
            .unwrap();
        let parallel = ActivityPipeline::new(PipelineConfig::default(), &classifier)
            .unwrap()
            .with_threads(3)
            .run(&accel, &gyro)
            .unwrap();
        assert_eq!(sequential.summary, parallel.summary);
        assert_eq!(sequential.windows, parallel.windows);
    }

    #[test]
    fn test_friendly_output() {
        let accel = stream(1551, 0.0);
        let gyro = stream(1551, 1.0);
        let classifier = ConstantClassifier("1");
        let report = ActivityPipeline::new(PipelineConfig::default(), &classifier)
            .unwrap()
            .run(&accel, &gyro)
            .unwrap();

        let raw = serde_json::to_string(&report.to_output(false)).unwrap();
        assert_eq!(raw, r#"{"activity_summary_seconds":{"1":25}}"#);
        let friendly = serde_json::to_string(&report.to_output(true)).unwrap();
        assert_eq!(friendly, r#"{"activity_summary_seconds":{"walking":25}}"#);
    }

    #[test]
    fn test_short_recording_is_insufficient() {
        // 100 rows survive the warm-up discard
        let accel = stream(351, 0.0);
        let gyro = stream(351, 0.0);
        let classifier = ConstantClassifier("walking");
        let pipeline = ActivityPipeline::new(PipelineConfig::default(), &classifier).unwrap();
        assert!(matches!(
            pipeline.run(&accel, &gyro),
            Err(PipelineError::InsufficientData {
                rows: 100,
                window_size: 250
            })
        ));
    }

    #[test]
    fn test_disjoint_streams_fail_merge() {
        let accel = stream(600, 0.0);
        let gyro: Vec<AxisReading> = stream(600, 0.0)
            .into_iter()
            .map(|r| AxisReading::new(r.timestamp + 100.0, r.x, r.y, r.z))
            .collect();
        let classifier = ConstantClassifier("walking");
        let pipeline = ActivityPipeline::new(PipelineConfig::default(), &classifier).unwrap();
        assert!(matches!(
            pipeline.run(&accel, &gyro),
            Err(PipelineError::EmptyMerge)
        ));
    }

    #[test]
    fn test_prediction_count_checked() {
        let accel = stream(1551, 0.0);
        let gyro = stream(1551, 0.0);
        let pipeline = ActivityPipeline::new(PipelineConfig::default(), &ShortClassifier).unwrap();
        assert!(matches!(
            pipeline.run(&accel, &gyro),
            Err(PipelineError::LabelMismatch { rows: 5, labels: 1 })
        ));
    }

    #[test]
    fn test_run_files() {
        let dir = std::env::temp_dir().join("activity_summary_pipeline_files");
        fs::create_dir_all(&dir).unwrap();
        let write = |name: &str, rows: &[AxisReading]| {
            let mut text = String::from("timestamp,x,y,z,accuracy\n");
            for r in rows {
                text.push_str(&format!("{},{},{},{},3\n", r.timestamp, r.x, r.y, r.z));
            }
            let path = dir.join(name);
            fs::write(&path, text).unwrap();
            path
        };
        let accel_path = write("accel.csv", &stream(1551, 0.0));
        let gyro_path = write("gyro.csv", &stream(1551, 0.5));

        let classifier = ConstantClassifier("walking");
        let pipeline = ActivityPipeline::new(PipelineConfig::default(), &classifier).unwrap();
        let report = pipeline.run_files(&accel_path, &gyro_path).unwrap();
        assert_eq!(report.summary.get("walking"), Some(25));
        let _ = fs::remove_dir_all(dir);
    }
}
