//! JSON artifact persistence
//!
//! Paths ending in `.gz` are gzip-compressed JSON, anything else is plain
//! pretty-printed JSON.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PipelineResult;

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Serialize `value` to `path`, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> PipelineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        serde_json::to_writer(&mut encoder, value)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> PipelineResult<T> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if is_gzip(path) {
        let reader = BufReader::new(GzDecoder::new(file));
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::env;

    fn sample() -> BTreeMap<String, Vec<f64>> {
        let mut map = BTreeMap::new();
        map.insert("walking".to_string(), vec![1.5, 2.5]);
        map
    }

    #[test]
    fn test_plain_json_file() {
        let path = env::temp_dir().join("activity_summary_storage_test.json");
        write_json(&path, &sample()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("walking"));
        let back: BTreeMap<String, Vec<f64>> = read_json(&path).unwrap();
        assert_eq!(back, sample());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_gzip_json_file() {
        let path = env::temp_dir()
            .join("activity_summary_storage_test")
            .join("nested.json.gz");
        write_json(&path, &sample()).unwrap();
        let raw = fs::read(&path).unwrap();
        // gzip magic
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        let back: BTreeMap<String, Vec<f64>> = read_json(&path).unwrap();
        assert_eq!(back, sample());
        let _ = fs::remove_file(path);
    }
}
