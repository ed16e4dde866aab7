use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of signal channels in a merged sample
pub const CHANNEL_COUNT: usize = 6;

/// One row of a single three-axis sensor stream. Missing cells are NaN.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisReading {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AxisReading {
    pub fn new(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    pub fn is_complete(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Signal channels in canonical order.
///
/// The trained model's feature schema depends on this order, so the
/// discriminants double as column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    AccZ = 0,
    AccY = 1,
    AccX = 2,
    GyroZ = 3,
    GyroY = 4,
    GyroX = 5,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::AccZ,
        Channel::AccY,
        Channel::AccX,
        Channel::GyroZ,
        Channel::GyroY,
        Channel::GyroX,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::AccZ => "acc_z",
            Channel::AccY => "acc_y",
            Channel::AccX => "acc_x",
            Channel::GyroZ => "gyro_z",
            Channel::GyroY => "gyro_y",
            Channel::GyroX => "gyro_x",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One time-aligned accelerometer + gyroscope sample
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: f64,
    /// Indexed by [`Channel::index`]
    pub channels: [f64; CHANNEL_COUNT],
}

impl SensorSample {
    /// Combine two readings into canonical channel order.
    pub fn from_readings(timestamp: f64, accel: &AxisReading, gyro: &AxisReading) -> Self {
        Self {
            timestamp,
            channels: [accel.z, accel.y, accel.x, gyro.z, gyro.y, gyro.x],
        }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.channels[channel.index()]
    }
}

/// Time-ordered merged samples. Built once, never mutated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedSeries {
    samples: Vec<SensorSample>,
}

impl MergedSeries {
    /// Wrap samples whose timestamps must strictly increase.
    ///
    /// Returns `None` when the ordering does not hold.
    pub fn from_samples(samples: Vec<SensorSample>) -> Option<Self> {
        let ordered = samples
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp);
        ordered.then_some(Self { samples })
    }

    pub fn samples(&self) -> &[SensorSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<f64> {
        self.samples.first().map(|s| s.timestamp)
    }

    /// All values of one channel, in time order.
    pub fn channel(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.get(channel)).collect()
    }
}

/// A fixed-length run of consecutive merged samples
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    pub start_timestamp: f64,
    /// Row offset of the first sample within its series
    pub start_index: usize,
    /// Majority label, present only in training mode
    pub label: Option<String>,
    samples: Vec<SensorSample>,
}

impl Window {
    pub fn new(start_index: usize, samples: Vec<SensorSample>, label: Option<String>) -> Self {
        let start_timestamp = samples.first().map(|s| s.timestamp).unwrap_or(f64::NAN);
        Self {
            start_timestamp,
            start_index,
            label,
            samples,
        }
    }

    pub fn samples(&self) -> &[SensorSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Column view of one channel.
    pub fn channel(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.get(channel)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_channel_order() {
        let names: Vec<&str> = Channel::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["acc_z", "acc_y", "acc_x", "gyro_z", "gyro_y", "gyro_x"]
        );
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_sample_from_readings() {
        let accel = AxisReading::new(1.0, 0.1, 0.2, 9.8);
        let gyro = AxisReading::new(1.01, 0.01, 0.02, 0.03);
        let sample = SensorSample::from_readings(1.0, &accel, &gyro);

        assert_eq!(sample.get(Channel::AccZ), 9.8);
        assert_eq!(sample.get(Channel::AccX), 0.1);
        assert_eq!(sample.get(Channel::GyroZ), 0.03);
        assert_eq!(sample.get(Channel::GyroX), 0.01);
    }

    #[test]
    fn test_series_requires_increasing_time() {
        let s = |t: f64| SensorSample {
            timestamp: t,
            channels: [0.0; CHANNEL_COUNT],
        };
        assert!(MergedSeries::from_samples(vec![s(0.0), s(0.1), s(0.2)]).is_some());
        assert!(MergedSeries::from_samples(vec![s(0.0), s(0.0)]).is_none());
        assert!(MergedSeries::from_samples(vec![s(0.2), s(0.1)]).is_none());
        assert!(MergedSeries::from_samples(Vec::new()).is_some());
    }

    #[test]
    fn test_incomplete_reading() {
        assert!(AxisReading::new(0.0, 1.0, 2.0, 3.0).is_complete());
        assert!(!AxisReading::new(0.0, f64::NAN, 2.0, 3.0).is_complete());
    }
}
