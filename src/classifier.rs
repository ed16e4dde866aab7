//! Classifier boundary and the bundled reference model
//!
//! The pipeline only sees [`ActivityClassifier`]: a read-only object that maps
//! a feature matrix to one label per row. [`CentroidClassifier`] is a small
//! standardised nearest-centroid model so the binaries work end to end; any
//! other model can be plugged in behind the same trait.

use std::path::Path;

use log::info;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::features::{feature_names, FEATURE_COUNT};
use crate::storage;

/// A pre-trained model: feature matrix in, one label per row out.
///
/// Implementations are shared between concurrent pipeline runs, so
/// `predict` takes `&self` and must not mutate.
pub trait ActivityClassifier: Send + Sync {
    fn predict(&self, features: ArrayView2<'_, f64>) -> PipelineResult<Vec<String>>;
}

/// Per-column standardisation, `(x - mean) / std`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population std per column; zero-variance columns use 1.0
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(features: ArrayView2<'_, f64>) -> PipelineResult<Self> {
        let mean = features
            .mean_axis(Axis(0))
            .ok_or(PipelineError::UntrainedModel)?;
        let scale = features
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 && s.is_finite() { s } else { 1.0 });
        Ok(Self {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, features: ArrayView2<'_, f64>) -> PipelineResult<Array2<f64>> {
        if features.ncols() != self.n_features() {
            return Err(PipelineError::FeatureWidthMismatch {
                expected: self.n_features(),
                actual: features.ncols(),
            });
        }
        let mut out = features.to_owned();
        for mut row in out.rows_mut() {
            for (x, (m, s)) in row.iter_mut().zip(self.mean.iter().zip(&self.scale)) {
                *x = (*x - m) / s;
            }
        }
        Ok(out)
    }
}

/// Sorted, de-duplicated class labels; a label's position is its code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Nearest class centroid in standardised feature space
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CentroidClassifier {
    /// Window geometry and rate the training features were built with
    pub config: PipelineConfig,
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
    /// One standardised centroid per encoder class
    pub centroids: Vec<Vec<f64>>,
}

impl CentroidClassifier {
    pub fn fit<S: AsRef<str>>(
        features: ArrayView2<'_, f64>,
        labels: &[S],
        config: &PipelineConfig,
    ) -> PipelineResult<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::LabelMismatch {
                rows: features.nrows(),
                labels: labels.len(),
            });
        }
        if features.nrows() == 0 {
            return Err(PipelineError::UntrainedModel);
        }

        let scaler = StandardScaler::fit(features)?;
        let scaled = scaler.transform(features)?;
        let encoder = LabelEncoder::fit(labels);

        let mut sums = vec![vec![0.0; scaled.ncols()]; encoder.len()];
        let mut counts = vec![0usize; encoder.len()];
        for (row, label) in scaled.rows().into_iter().zip(labels) {
            // every label is in the encoder it was fitted on
            let Some(code) = encoder.encode(label.as_ref()) else {
                continue;
            };
            counts[code] += 1;
            for (acc, x) in sums[code].iter_mut().zip(row.iter()) {
                *acc += x;
            }
        }
        let centroids: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .map(|(sum, &n)| sum.into_iter().map(|s| s / n as f64).collect())
            .collect();

        let names = if features.ncols() == FEATURE_COUNT {
            feature_names()
        } else {
            (0..features.ncols()).map(|i| format!("f{}", i)).collect()
        };

        info!(
            "Fitted centroid classifier: {} classes over {} features from {} windows",
            encoder.len(),
            features.ncols(),
            features.nrows()
        );

        Ok(Self {
            config: config.clone(),
            feature_names: names,
            scaler,
            encoder,
            centroids,
        })
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    /// `None` when the row holds a NaN or infinite value.
    fn nearest(&self, scaled: ArrayView1<'_, f64>) -> Option<usize> {
        if scaled.iter().any(|x| !x.is_finite()) {
            return None;
        }
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (code, centroid) in self.centroids.iter().enumerate() {
            let dist: f64 = scaled
                .iter()
                .zip(centroid)
                .map(|(x, c)| (x - c).powi(2))
                .sum();
            if dist < best_dist {
                best = code;
                best_dist = dist;
            }
        }
        Some(best)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        storage::write_json(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let model: Self = storage::read_json(path)?;
        if model.centroids.is_empty() || model.centroids.len() != model.encoder.len() {
            return Err(PipelineError::UntrainedModel);
        }
        let width = model.n_features();
        for centroid in &model.centroids {
            if centroid.len() != width {
                return Err(PipelineError::FeatureWidthMismatch {
                    expected: width,
                    actual: centroid.len(),
                });
            }
        }
        if model.scaler.scale.len() != width {
            return Err(PipelineError::FeatureWidthMismatch {
                expected: width,
                actual: model.scaler.scale.len(),
            });
        }
        Ok(model)
    }
}

impl ActivityClassifier for CentroidClassifier {
    fn predict(&self, features: ArrayView2<'_, f64>) -> PipelineResult<Vec<String>> {
        if self.centroids.is_empty() {
            return Err(PipelineError::UntrainedModel);
        }
        let scaled = self.scaler.transform(features)?;
        scaled
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let code = self
                    .nearest(row)
                    .ok_or(PipelineError::NonFiniteFeatures { row: i })?;
                Ok(self.encoder.decode(code).unwrap_or_default().to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_scaler_standardises_columns() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]); // second column has zero variance
        let t = scaler.transform(x.view()).unwrap();
        assert_abs_diff_eq!(t[[0, 0]], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t[[1, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t[[1, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_label_encoder_sorted() {
        let encoder = LabelEncoder::fit(&["walking", "sitting", "walking", "jogging"]);
        assert_eq!(encoder.classes(), &["jogging", "sitting", "walking"]);
        assert_eq!(encoder.encode("sitting"), Some(1));
        assert_eq!(encoder.encode("flying"), None);
        assert_eq!(encoder.decode(2), Some("walking"));
    }

    #[test]
    fn test_centroid_classifier_separates_clusters() {
        let x = array![
            [0.0, 0.1],
            [0.2, 0.0],
            [10.0, 9.9],
            [9.8, 10.1],
        ];
        let labels = ["sit", "sit", "run", "run"];
        let model = CentroidClassifier::fit(x.view(), &labels, &PipelineConfig::default()).unwrap();
        assert_eq!(model.classes(), &["run", "sit"]);

        let query = array![[0.1, 0.0], [9.0, 9.0]];
        let predicted = model.predict(query.view()).unwrap();
        assert_eq!(predicted, vec!["sit", "run"]);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let model = CentroidClassifier::fit(x.view(), &["a", "b"], &PipelineConfig::default()).unwrap();
        let wrong = array![[0.0, 1.0, 2.0]];
        assert!(matches!(
            model.predict(wrong.view()),
            Err(PipelineError::FeatureWidthMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_fit_rejects_mismatched_labels() {
        let x = array![[0.0], [1.0]];
        assert!(matches!(
            CentroidClassifier::fit(x.view(), &["a"], &PipelineConfig::default()),
            Err(PipelineError::LabelMismatch { rows: 2, labels: 1 })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let model = CentroidClassifier::fit(x.view(), &["a", "b"], &PipelineConfig::default()).unwrap();
        let path = std::env::temp_dir().join("activity_summary_model_test.json.gz");
        model.save(&path).unwrap();
        let loaded = CentroidClassifier::load(&path).unwrap();
        assert_eq!(loaded, model);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_non_finite_row_rejected() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let model = CentroidClassifier::fit(x.view(), &["a", "b"], &PipelineConfig::default()).unwrap();
        let rows = array![[0.0, 1.0], [f64::NAN, 0.0]];
        assert!(matches!(
            model.predict(rows.view()),
            Err(PipelineError::NonFiniteFeatures { row: 1 })
        ));
    }

    #[test]
    fn test_load_rejects_short_centroid() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let mut model =
            CentroidClassifier::fit(x.view(), &["a", "b"], &PipelineConfig::default()).unwrap();
        model.centroids[1].pop();
        let path = std::env::temp_dir().join("activity_summary_model_short_centroid.json");
        model.save(&path).unwrap();
        assert!(matches!(
            CentroidClassifier::load(&path),
            Err(PipelineError::FeatureWidthMismatch {
                expected: 2,
                actual: 1
            })
        ));
        let _ = std::fs::remove_file(path);
    }
}
