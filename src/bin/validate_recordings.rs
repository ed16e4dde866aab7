use std::path::PathBuf;

use activity_summary_rs::storage;
use activity_summary_rs::validation::{validate_and_record, RecordingSchema};
use anyhow::{bail, Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "validate_recordings")]
#[command(about = "Check sensor CSV headers below a recordings directory", long_about = None)]
struct Args {
    /// Root directory of unpacked recordings
    root: PathBuf,

    /// Status file receiving "Validation status: <bool>"
    #[arg(long, default_value = "artifacts/data_validation/status.txt")]
    status_file: PathBuf,

    /// Schema JSON ({"accelerometer": [...], "gyroscope": [...]})
    #[arg(long)]
    schema: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let schema: RecordingSchema = match &args.schema {
        Some(path) => storage::read_json(path)
            .with_context(|| format!("loading schema {}", path.display()))?,
        None => RecordingSchema::default(),
    };

    let report = validate_and_record(&args.root, &schema, &args.status_file)
        .with_context(|| format!("validating {}", args.root.display()))?;

    if !report.is_valid() {
        for path in report.invalid_files() {
            eprintln!("Invalid columns in: {}", path.display());
        }
        bail!("{} sensor files failed validation", report.invalid_files().count());
    }
    println!("Validated {} sensor files", report.checked.len());
    Ok(())
}
