use std::path::PathBuf;

use activity_summary_rs::classifier::{ActivityClassifier, CentroidClassifier};
use activity_summary_rs::config::TrainerConfig;
use activity_summary_rs::dataset::{collect_recordings, labelled_windows, ActivityManifest, FeatureSet};
use activity_summary_rs::evaluation::{evaluate, train_test_split};
use activity_summary_rs::storage;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::info;

#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(about = "Build windowed features from labelled recordings and fit an activity model", long_about = None)]
struct Args {
    /// Activity manifest JSON ({"activities": [{"label", "dirs", "duration_secs"}]})
    #[arg(long, required_unless_present = "features")]
    manifest: Option<PathBuf>,

    /// Trainer config JSON (pipeline geometry, test_size, random_state)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for features, model and metrics
    #[arg(long, default_value = "artifacts")]
    output_dir: PathBuf,

    /// Feature extraction threads
    #[arg(long, default_value = "4")]
    threads: usize,

    /// Reuse an existing feature set instead of reading recordings
    #[arg(long)]
    features: Option<PathBuf>,
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrainerConfig::from_json_file(path)
            .with_context(|| format!("loading trainer config {}", path.display()))?,
        None => TrainerConfig::default(),
    };
    println!("[{}] Activity model training", ts_now());
    println!("  Window size: {}", config.pipeline.window_size);
    println!("  Step size: {}", config.pipeline.step_size);
    println!("  Sampling rate: {} Hz", config.pipeline.sampling_rate);
    println!("  Test size: {}", config.test_size);
    println!("  Output Dir: {}", args.output_dir.display());

    std::fs::create_dir_all(&args.output_dir)?;

    let feature_set = match &args.features {
        Some(path) => FeatureSet::load(path)
            .with_context(|| format!("loading feature set {}", path.display()))?,
        None => {
            let path = args
                .manifest
                .as_ref()
                .context("either --manifest or --features is required")?;
            let manifest = ActivityManifest::load(path)
                .with_context(|| format!("loading manifest {}", path.display()))?;
            let recordings = collect_recordings(&manifest)?;
            println!("[{}] {} recordings loaded", ts_now(), recordings.len());

            let windows = labelled_windows(&recordings, &config.pipeline)?;
            let set = FeatureSet::from_windows(&windows, config.pipeline.sampling_rate, args.threads)?;
            set.save(args.output_dir.join("features.json.gz"))?;
            set
        }
    };
    println!(
        "[{}] {} windows x {} features",
        ts_now(),
        feature_set.len(),
        feature_set.feature_names.len()
    );

    let matrix = feature_set.to_matrix()?;
    let split = train_test_split(
        matrix.view(),
        &feature_set.labels,
        config.test_size,
        config.random_state,
    )?;
    info!(
        "Split: {} train / {} test windows",
        split.train_labels.len(),
        split.test_labels.len()
    );

    let model = CentroidClassifier::fit(
        split.train_features.view(),
        &split.train_labels,
        &config.pipeline,
    )?;
    let predicted = model.predict(split.test_features.view())?;
    let metrics = evaluate(&split.test_labels, &predicted)?;

    println!("[{}] Evaluation on {} windows", ts_now(), metrics.samples);
    println!("  Accuracy:  {:.4}", metrics.accuracy);
    println!("  Precision: {:.4}", metrics.precision);
    println!("  Recall:    {:.4}", metrics.recall);
    println!("  F1:        {:.4}", metrics.f1);

    let model_path = args.output_dir.join("model.json.gz");
    model.save(&model_path)?;
    storage::write_json(args.output_dir.join("metrics.json"), &metrics)?;
    println!("[{}] Model saved to {}", ts_now(), model_path.display());
    Ok(())
}
