//! Fixed-length sliding windows over a merged series
//!
//! Window starts are `0, step, 2*step, ...` while a full window still fits;
//! a short tail is dropped, never padded. For a series of length `L >= w`
//! this yields `floor((L - w) / s) + 1` windows.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{MergedSeries, Window};

/// Number of full windows that fit in `len` rows.
pub fn window_count(len: usize, window_size: usize, step_size: usize) -> usize {
    if window_size == 0 || step_size == 0 || len < window_size {
        return 0;
    }
    (len - window_size) / step_size + 1
}

/// Most frequent label.
///
/// Ties resolve to the lexicographically smallest label. That rule is an
/// implementation detail, callers should not depend on it.
pub fn majority_label<S: AsRef<str>>(labels: &[S]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_ref()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}

/// Slice a series into windows.
///
/// With `labels` (training mode, one label per row) each window carries the
/// majority label of the rows it covers. Fails with
/// [`PipelineError::InsufficientData`] when no full window fits.
pub fn segment(
    series: &MergedSeries,
    window_size: usize,
    step_size: usize,
    labels: Option<&[String]>,
) -> PipelineResult<Vec<Window>> {
    if window_size == 0 || step_size == 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "window_size and step_size must be positive (got {}, {})",
            window_size, step_size
        )));
    }
    if let Some(labels) = labels {
        if labels.len() != series.len() {
            return Err(PipelineError::LabelMismatch {
                rows: series.len(),
                labels: labels.len(),
            });
        }
    }

    let count = window_count(series.len(), window_size, step_size);
    if count == 0 {
        return Err(PipelineError::InsufficientData {
            rows: series.len(),
            window_size,
        });
    }

    let samples = series.samples();
    let windows: Vec<Window> = (0..count)
        .map(|i| {
            let start = i * step_size;
            let end = start + window_size;
            let label = labels.and_then(|l| majority_label(&l[start..end]));
            Window::new(start, samples[start..end].to_vec(), label)
        })
        .collect();

    debug!(
        "Segmented {} rows into {} windows (size {}, step {})",
        series.len(),
        windows.len(),
        window_size,
        step_size
    );
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SensorSample, CHANNEL_COUNT};

    fn series(len: usize) -> MergedSeries {
        let samples = (0..len)
            .map(|i| SensorSample {
                timestamp: 10.0 + i as f64 * 0.02,
                channels: [i as f64; CHANNEL_COUNT],
            })
            .collect();
        MergedSeries::from_samples(samples).unwrap()
    }

    #[test]
    fn test_window_count_formula() {
        for &(len, w, s) in &[(1300, 250, 250), (1000, 250, 250), (999, 250, 250), (600, 250, 100), (250, 250, 1)] {
            let windows = segment(&series(len), w, s, None).unwrap();
            assert_eq!(windows.len(), (len - w) / s + 1, "len={len} w={w} s={s}");
            assert_eq!(windows.len(), window_count(len, w, s));
        }
        assert_eq!(window_count(249, 250, 250), 0);
    }

    #[test]
    fn test_windows_are_full_and_strided() {
        let windows = segment(&series(1300), 250, 250, None).unwrap();
        assert_eq!(windows.len(), 5);
        for (i, w) in windows.iter().enumerate() {
            assert_eq!(w.len(), 250);
            assert_eq!(w.start_index, i * 250);
            assert_eq!(w.samples()[0].channels[0], (i * 250) as f64);
            assert!(w.label.is_none());
        }
    }

    #[test]
    fn test_start_timestamp_is_first_row() {
        let windows = segment(&series(600), 250, 100, None).unwrap();
        assert_eq!(windows.len(), 4);
        assert!((windows[0].start_timestamp - 10.0).abs() < 1e-9);
        assert!((windows[1].start_timestamp - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let err = segment(&series(249), 250, 250, None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                rows: 249,
                window_size: 250
            }
        ));
    }

    #[test]
    fn test_majority_label_per_window() {
        let s = series(8);
        let labels: Vec<String> = ["walk", "walk", "run", "walk", "sit", "sit", "sit", "run"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        let windows = segment(&s, 4, 4, Some(&labels)).unwrap();
        assert_eq!(windows[0].label.as_deref(), Some("walk"));
        assert_eq!(windows[1].label.as_deref(), Some("sit"));
    }

    #[test]
    fn test_majority_tie_takes_smallest() {
        assert_eq!(majority_label(&["b", "a", "b", "a"]).as_deref(), Some("a"));
        assert_eq!(majority_label::<&str>(&[]), None);
    }

    #[test]
    fn test_label_length_mismatch_rejected() {
        let labels = vec!["walk".to_string(); 3];
        assert!(matches!(
            segment(&series(8), 4, 4, Some(&labels)),
            Err(PipelineError::LabelMismatch { rows: 8, labels: 3 })
        ));
    }
}
