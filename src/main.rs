use std::path::PathBuf;

use activity_summary_rs::{ActivityPipeline, CentroidClassifier, PipelineConfig};
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "activity_summary")]
#[command(about = "Summarise time spent per activity from accelerometer and gyroscope CSVs", long_about = None)]
struct Args {
    /// Accelerometer CSV (timestamp or seconds_elapsed, x, y, z)
    #[arg(long)]
    accel: PathBuf,

    /// Gyroscope CSV (timestamp or seconds_elapsed, x, y, z)
    #[arg(long)]
    gyro: PathBuf,

    /// Trained model (.json or .json.gz)
    #[arg(long, default_value = "artifacts/model.json.gz")]
    model: PathBuf,

    /// Pipeline config JSON; defaults to the model's own configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Samples per window
    #[arg(long)]
    window_size: Option<usize>,

    /// Samples between window starts
    #[arg(long)]
    step_size: Option<usize>,

    /// Sampling rate in Hz
    #[arg(long)]
    sampling_rate: Option<f64>,

    /// Seconds credited per classified window
    #[arg(long)]
    window_duration: Option<u64>,

    /// Feature extraction threads
    #[arg(long, default_value = "1")]
    threads: usize,

    /// Report numeric activity codes by name
    #[arg(long)]
    friendly: bool,

    /// Write the summary JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn pipeline_config(&self, model: &CentroidClassifier) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => model.config.clone(),
        };
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.step_size {
            config.step_size = v;
        }
        if let Some(v) = self.sampling_rate {
            config.sampling_rate = v;
        }
        if let Some(v) = self.window_duration {
            config.window_duration = v;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let model = CentroidClassifier::load(&args.model)
        .with_context(|| format!("loading model {}", args.model.display()))?;
    info!(
        "Loaded model with {} classes from {}",
        model.classes().len(),
        args.model.display()
    );

    let config = args.pipeline_config(&model)?;
    if config != model.config {
        warn!(
            "Runtime config {:?} differs from the model's training config {:?}",
            config, model.config
        );
    }

    let pipeline = ActivityPipeline::new(config, &model)?.with_threads(args.threads);
    let report = pipeline
        .run_files(&args.accel, &args.gyro)
        .context("activity pipeline failed")?;
    info!(
        "{} merged rows, {} windows, generated at {}",
        report.merged_rows,
        report.windows.len(),
        report.generated_at
    );

    let json = serde_json::to_string_pretty(&report.to_output(args.friendly))?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Summary written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
