//! Per-window feature vectors
//!
//! Every channel contributes [`FEATURES_PER_CHANNEL`] descriptors, laid out
//! channel-major in canonical channel order:
//!
//! | # | descriptor                   |
//! |---|------------------------------|
//! | 0 | mean                         |
//! | 1 | std (population)             |
//! | 2 | min                          |
//! | 3 | max                          |
//! | 4 | median                       |
//! | 5 | energy, sum of squares       |
//! | 6 | jerk mean                    |
//! | 7 | jerk std                     |
//! | 8 | jerk energy                  |
//! | 9 | zero crossings               |
//! |10 | mean FFT magnitude           |
//! |11 | max FFT magnitude            |
//! |12 | std FFT magnitude            |
//!
//! Jerk is the first difference multiplied by the sampling rate. A trained
//! model only accepts vectors built with the same layout and rate.

use log::{debug, info};
use ndarray::Array2;
use rustfft::FftPlanner;

use crate::error::{PipelineError, PipelineResult};
use crate::stats;
use crate::types::{Channel, Window, CHANNEL_COUNT};

pub const FEATURES_PER_CHANNEL: usize = 13;

/// Width of a feature vector for the canonical six channels
pub const FEATURE_COUNT: usize = FEATURES_PER_CHANNEL * CHANNEL_COUNT;

const DESCRIPTOR_NAMES: [&str; FEATURES_PER_CHANNEL] = [
    "mean",
    "std",
    "min",
    "max",
    "median",
    "energy",
    "jerk_mean",
    "jerk_std",
    "jerk_energy",
    "zero_crossings",
    "fft_mean",
    "fft_max",
    "fft_std",
];

/// Column names of the feature matrix, e.g. `acc_z_mean`.
pub fn feature_names() -> Vec<String> {
    Channel::ALL
        .iter()
        .flat_map(|c| DESCRIPTOR_NAMES.iter().map(move |d| format!("{}_{}", c.name(), d)))
        .collect()
}

/// The 13 descriptors of a single channel signal.
pub fn channel_features(
    planner: &mut FftPlanner<f64>,
    signal: &[f64],
    sampling_rate: f64,
) -> [f64; FEATURES_PER_CHANNEL] {
    let jerk = stats::scaled_diff(signal, sampling_rate);
    let spectrum = stats::fft_magnitudes(planner, signal);

    [
        stats::mean(signal),
        stats::std_dev(signal),
        stats::min(signal),
        stats::max(signal),
        stats::median(signal),
        stats::energy(signal),
        stats::mean(&jerk),
        stats::std_dev(&jerk),
        stats::energy(&jerk),
        stats::zero_crossings(signal) as f64,
        stats::mean(&spectrum),
        stats::max(&spectrum),
        stats::std_dev(&spectrum),
    ]
}

pub struct FeatureExtractor {
    planner: FftPlanner<f64>,
    sampling_rate: f64,
}

impl FeatureExtractor {
    pub fn new(sampling_rate: f64) -> Self {
        Self {
            planner: FftPlanner::new(),
            sampling_rate,
        }
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Feature vector of one window, [`FEATURE_COUNT`] values long.
    pub fn extract(&mut self, window: &Window) -> Vec<f64> {
        let mut features = Vec::with_capacity(FEATURE_COUNT);
        for channel in Channel::ALL {
            let signal = window.channel(channel);
            features.extend(channel_features(&mut self.planner, &signal, self.sampling_rate));
        }
        features
    }

    /// Feature matrix with one row per window, in window order.
    pub fn extract_many(&mut self, windows: &[Window]) -> PipelineResult<Array2<f64>> {
        if windows.is_empty() {
            return Err(PipelineError::EmptyWindowBatch);
        }
        let mut data = Vec::with_capacity(windows.len() * FEATURE_COUNT);
        for window in windows {
            data.extend(self.extract(window));
        }
        let matrix = to_matrix(windows.len(), data)?;
        info!(
            "Extracted features: {} features per {} windows",
            matrix.ncols(),
            matrix.nrows()
        );
        Ok(matrix)
    }
}

fn to_matrix(rows: usize, data: Vec<f64>) -> PipelineResult<Array2<f64>> {
    let actual = data.len() / rows.max(1);
    Array2::from_shape_vec((rows, FEATURE_COUNT), data).map_err(|_| {
        PipelineError::FeatureWidthMismatch {
            expected: FEATURE_COUNT,
            actual,
        }
    })
}

/// Batch extraction spread over `threads` scoped worker threads.
///
/// Windows are split into contiguous chunks and the rows are reassembled in
/// the original window order. `threads <= 1` runs on the calling thread.
pub fn extract_features_parallel(
    windows: &[Window],
    sampling_rate: f64,
    threads: usize,
) -> PipelineResult<Array2<f64>> {
    if windows.is_empty() {
        return Err(PipelineError::EmptyWindowBatch);
    }
    if threads <= 1 || windows.len() == 1 {
        return FeatureExtractor::new(sampling_rate).extract_many(windows);
    }

    let chunk_size = windows.len().div_ceil(threads);
    debug!(
        "Extracting {} windows on {} threads ({} per chunk)",
        windows.len(),
        threads,
        chunk_size
    );

    let chunks: Vec<Vec<f64>> = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = windows
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move |_| {
                    let mut extractor = FeatureExtractor::new(sampling_rate);
                    let mut data = Vec::with_capacity(chunk.len() * FEATURE_COUNT);
                    for window in chunk {
                        data.extend(extractor.extract(window));
                    }
                    data
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
    .unwrap_or_else(|e| std::panic::resume_unwind(e));

    let data: Vec<f64> = chunks.into_iter().flatten().collect();
    let matrix = to_matrix(windows.len(), data)?;
    info!(
        "Extracted features: {} features per {} windows",
        matrix.ncols(),
        matrix.nrows()
    );
    Ok(matrix)
}
