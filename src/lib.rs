//! Activity summaries from phone accelerometer and gyroscope recordings.
//!
//! The two raw streams are aligned on time, cut into fixed windows, reduced
//! to 78 statistical and spectral features per window, classified by a
//! pre-trained model and summed into seconds per activity.

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod merge;
pub mod pipeline;
pub mod sensors;
pub mod stats;
pub mod storage;
pub mod summary;
pub mod types;
pub mod validation;
pub mod windowing;

pub use classifier::{ActivityClassifier, CentroidClassifier};
pub use config::{PipelineConfig, TrainerConfig};
pub use error::{PipelineError, PipelineResult};
pub use features::{extract_features_parallel, FeatureExtractor, FEATURE_COUNT};
pub use merge::merge_streams;
pub use pipeline::{ActivityPipeline, PredictionReport};
pub use summary::{summarize, ActivitySummary};
pub use types::{AxisReading, Channel, MergedSeries, SensorSample, Window};
pub use windowing::segment;
