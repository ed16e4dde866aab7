//! Hold-out split and classification metrics for the training run

use log::warn;
use ndarray::{Array2, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::classifier::LabelEncoder;
use crate::error::{PipelineError, PipelineResult};

/// Rows of a feature matrix split into train and test parts
#[derive(Clone, Debug)]
pub struct TrainTestSplit {
    pub train_features: Array2<f64>,
    pub train_labels: Vec<String>,
    pub test_features: Array2<f64>,
    pub test_labels: Vec<String>,
}

/// Shuffle rows with a seeded RNG and hold out `ceil(test_size * n)` of
/// them for testing. At least one row always stays in the training part.
pub fn train_test_split(
    features: ArrayView2<'_, f64>,
    labels: &[String],
    test_size: f64,
    seed: u64,
) -> PipelineResult<TrainTestSplit> {
    let n = features.nrows();
    if n != labels.len() {
        return Err(PipelineError::LabelMismatch {
            rows: n,
            labels: labels.len(),
        });
    }
    if n < 2 {
        return Err(PipelineError::InsufficientData {
            rows: n,
            window_size: 2,
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "test_size must lie strictly between 0 and 1 (got {})",
            test_size
        )));
    }

    let n_test = ((test_size * n as f64).ceil() as usize).clamp(1, n - 1);
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let (test_idx, train_idx) = order.split_at(n_test);
    let pick_labels =
        |idx: &[usize]| -> Vec<String> { idx.iter().map(|&i| labels[i].clone()).collect() };

    Ok(TrainTestSplit {
        train_features: features.select(Axis(0), train_idx),
        train_labels: pick_labels(train_idx),
        test_features: features.select(Axis(0), test_idx),
        test_labels: pick_labels(test_idx),
    })
}

/// Counts of (true, predicted) pairs; rows are true classes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &[String], y_pred: &[String]) -> Self {
        let all: Vec<&String> = y_true.iter().chain(y_pred).collect();
        let encoder = LabelEncoder::fit(&all);
        let k = encoder.len();
        let mut counts = vec![vec![0u64; k]; k];
        for (t, p) in y_true.iter().zip(y_pred) {
            if let (Some(ti), Some(pi)) = (encoder.encode(t), encoder.encode(p)) {
                counts[ti][pi] += 1;
            }
        }
        Self {
            labels: encoder.classes().to_vec(),
            counts,
        }
    }

    fn true_count(&self, class: usize) -> u64 {
        self.counts[class].iter().sum()
    }

    fn predicted_count(&self, class: usize) -> u64 {
        self.counts.iter().map(|row| row[class]).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    /// Support-weighted averages over classes
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub samples: usize,
    pub confusion_matrix: ConfusionMatrix,
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Accuracy plus support-weighted precision, recall and F1.
///
/// A class that is never predicted has precision 0 (a warning is logged),
/// matching the usual zero-division convention.
pub fn evaluate(y_true: &[String], y_pred: &[String]) -> PipelineResult<EvaluationMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::LabelMismatch {
            rows: y_true.len(),
            labels: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::EmptyWindowBatch);
    }

    let cm = ConfusionMatrix::new(y_true, y_pred);
    let total = y_true.len() as u64;
    let correct: u64 = (0..cm.labels.len()).map(|i| cm.counts[i][i]).sum();

    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for (i, label) in cm.labels.iter().enumerate() {
        let support = cm.true_count(i);
        if support == 0 {
            continue;
        }
        let tp = cm.counts[i][i];
        let predicted = cm.predicted_count(i);
        if predicted == 0 {
            warn!("Class {:?} was never predicted; precision set to 0", label);
        }
        let p = ratio(tp, predicted);
        let r = ratio(tp, support);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

        let weight = support as f64 / total as f64;
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    Ok(EvaluationMetrics {
        accuracy: ratio(correct, total),
        precision,
        recall,
        f1,
        samples: y_true.len(),
        confusion_matrix: cm,
    })
}
