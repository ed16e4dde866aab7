//! Numeric helpers shared by feature extraction
//!
//! Reductions over an empty slice return NaN, the same value a
//! `numpy` reduction would produce, instead of a misleading zero.

use rustfft::{num_complex::Complex, FftPlanner};

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by N).
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

pub fn min(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().fold(f64::INFINITY, |a, &b| a.min(b))
}

pub fn max(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
}

/// Median; even lengths average the two middle values.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sum of squares ("energy").
pub fn energy(data: &[f64]) -> f64 {
    data.iter().map(|x| x * x).sum()
}

/// First difference scaled by `rate`: `(c[i+1] - c[i]) * rate`.
pub fn scaled_diff(data: &[f64], rate: f64) -> Vec<f64> {
    data.windows(2).map(|pair| (pair[1] - pair[0]) * rate).collect()
}

/// Count of adjacent pairs whose product is strictly negative.
///
/// A sample of exactly zero never forms a crossing with either neighbour:
/// `[1, 0, -1]` yields 0 because both products are 0.
pub fn zero_crossings(data: &[f64]) -> usize {
    data.windows(2).filter(|pair| pair[0] * pair[1] < 0.0).count()
}

/// Magnitudes of the full complex DFT of a real signal.
pub fn fft_magnitudes(planner: &mut FftPlanner<f64>, data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut buffer: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer.iter().map(|c| c.norm()).collect()
}
