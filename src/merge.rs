//! Accelerometer/gyroscope time alignment
//!
//! Each accelerometer row is paired with the gyroscope row closest in time,
//! incomplete pairs are dropped, and the first [`WARM_UP_SECS`] of the
//! surviving timeline are discarded as sensor start-up transient.

use log::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::sensors::sort_by_time;
use crate::types::{AxisReading, MergedSeries, SensorSample};

/// Leading interval dropped from every merged series
pub const WARM_UP_SECS: f64 = 5.0;

/// Largest accepted gap between an accelerometer row and its gyroscope match
pub const MERGE_TOLERANCE_SECS: f64 = 0.1;

/// Index of the gyroscope reading nearest to `t`, if within tolerance.
///
/// `sorted` must be ordered by timestamp. Equidistant candidates resolve to
/// the earlier reading.
fn nearest_index(sorted: &[AxisReading], t: f64) -> Option<usize> {
    let after = sorted.partition_point(|g| g.timestamp <= t);
    let backward = after.checked_sub(1);
    let forward = {
        let i = sorted.partition_point(|g| g.timestamp < t);
        (i < sorted.len()).then_some(i)
    };

    let best = match (backward, forward) {
        (Some(b), Some(f)) => {
            let db = t - sorted[b].timestamp;
            let df = sorted[f].timestamp - t;
            if df < db {
                f
            } else {
                b
            }
        }
        (Some(b), None) => b,
        (None, Some(f)) => f,
        (None, None) => return None,
    };

    ((sorted[best].timestamp - t).abs() <= MERGE_TOLERANCE_SECS).then_some(best)
}

/// Align two sensor streams onto the accelerometer timeline.
///
/// Inputs need not be sorted. Fails with [`PipelineError::EmptyMerge`] when
/// no row survives association and warm-up discard.
pub fn merge_streams(accel: &[AxisReading], gyro: &[AxisReading]) -> PipelineResult<MergedSeries> {
    let mut accel = accel.to_vec();
    let mut gyro = gyro.to_vec();
    sort_by_time(&mut accel);
    sort_by_time(&mut gyro);

    let mut paired: Vec<SensorSample> = Vec::with_capacity(accel.len());
    let mut unmatched = 0usize;
    let mut incomplete = 0usize;
    let mut duplicates = 0usize;

    for a in &accel {
        let Some(g) = nearest_index(&gyro, a.timestamp).map(|i| &gyro[i]) else {
            unmatched += 1;
            continue;
        };
        if !a.is_complete() || !g.is_complete() {
            incomplete += 1;
            continue;
        }
        // Keep the first of repeated accelerometer timestamps.
        if paired.last().is_some_and(|p| p.timestamp >= a.timestamp) {
            duplicates += 1;
            continue;
        }
        paired.push(SensorSample::from_readings(a.timestamp, a, g));
    }

    debug!(
        "Merge: {} paired, {} unmatched, {} incomplete, {} duplicate timestamps",
        paired.len(),
        unmatched,
        incomplete,
        duplicates
    );

    let Some(t0) = paired.first().map(|s| s.timestamp) else {
        return Err(PipelineError::EmptyMerge);
    };
    let cutoff = t0 + WARM_UP_SECS;
    let kept: Vec<SensorSample> = paired.into_iter().filter(|s| s.timestamp > cutoff).collect();

    if kept.is_empty() {
        return Err(PipelineError::EmptyMerge);
    }
    info!("Merged series: {} rows after {:.1}s warm-up discard", kept.len(), WARM_UP_SECS);

    MergedSeries::from_samples(kept).ok_or(PipelineError::EmptyMerge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;

    fn stream(n: usize, rate: f64, offset: f64, value: f64) -> Vec<AxisReading> {
        (0..n)
            .map(|i| {
                let t = offset + i as f64 / rate;
                AxisReading::new(t, value, value + 1.0, value + 2.0)
            })
            .collect()
    }

    #[test]
    fn test_nearest_prefers_closer_and_earlier_on_tie() {
        let gyro = vec![
            AxisReading::new(1.0, 0.0, 0.0, 0.0),
            AxisReading::new(1.125, 0.0, 0.0, 0.0),
        ];
        assert_eq!(nearest_index(&gyro, 1.01), Some(0));
        assert_eq!(nearest_index(&gyro, 1.1), Some(1));
        // exactly halfway
        assert_eq!(nearest_index(&gyro, 1.0625), Some(0));
        assert_eq!(nearest_index(&gyro, 0.95), Some(0));
        assert_eq!(nearest_index(&gyro, 1.2), Some(1));
        assert_eq!(nearest_index(&gyro, 2.0), None);
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_merge_discards_warm_up() {
        let accel = stream(500, 50.0, 0.0, 1.0);
        let gyro = stream(500, 50.0, 0.005, 10.0);
        let merged = merge_streams(&accel, &gyro).unwrap();

        // t = i / 50 > 5.0 keeps i in 251..500
        assert_eq!(merged.len(), 249);
        assert!(merged.first_timestamp().unwrap() > WARM_UP_SECS);
    }

    #[test]
    fn test_merge_canonical_channels() {
        let accel = vec![
            AxisReading::new(0.0, 1.0, 2.0, 3.0),
            AxisReading::new(6.0, 1.0, 2.0, 3.0),
        ];
        let gyro = vec![
            AxisReading::new(0.0, 4.0, 5.0, 6.0),
            AxisReading::new(6.01, 4.0, 5.0, 6.0),
        ];
        let merged = merge_streams(&accel, &gyro).unwrap();
        assert_eq!(merged.len(), 1);
        let s = merged.samples()[0];
        assert_eq!(s.timestamp, 6.0);
        assert_eq!(s.get(Channel::AccZ), 3.0);
        assert_eq!(s.get(Channel::AccY), 2.0);
        assert_eq!(s.get(Channel::AccX), 1.0);
        assert_eq!(s.get(Channel::GyroZ), 6.0);
        assert_eq!(s.get(Channel::GyroY), 5.0);
        assert_eq!(s.get(Channel::GyroX), 4.0);
    }

    #[test]
    fn test_merge_sorts_inputs() {
        let mut accel = stream(400, 50.0, 0.0, 1.0);
        accel.reverse();
        let gyro = stream(400, 50.0, 0.0, 2.0);
        let merged = merge_streams(&accel, &gyro).unwrap();
        let ts: Vec<f64> = merged.samples().iter().map(|s| s.timestamp).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_disjoint_ranges_yield_empty_merge() {
        let accel = stream(500, 50.0, 0.0, 1.0);
        let gyro = stream(500, 50.0, 100.0, 1.0);
        assert!(matches!(
            merge_streams(&accel, &gyro),
            Err(PipelineError::EmptyMerge)
        ));
    }

    #[test]
    fn test_everything_inside_warm_up_is_empty() {
        let accel = stream(100, 50.0, 0.0, 1.0);
        let gyro = stream(100, 50.0, 0.0, 1.0);
        assert!(matches!(
            merge_streams(&accel, &gyro),
            Err(PipelineError::EmptyMerge)
        ));
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let mut accel = stream(400, 50.0, 0.0, 1.0);
        accel[300].y = f64::NAN;
        let gyro = stream(400, 50.0, 0.0, 1.0);
        let merged = merge_streams(&accel, &gyro).unwrap();
        // 149 rows past warm-up, one of them incomplete
        assert_eq!(merged.len(), 148);
    }
}
