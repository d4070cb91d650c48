//! Append-only JSONL record of every transmitted frame.
//!
//! One line per uplink:
//!
//! ```json
//! {"timestamp":"2026-01-01T00:00:00+00:00","counter":7,"size":39,"payload_hex":"0102...","measurements":[...]}
//! ```

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::measurement::Measurement;
use crate::error::Result;
use crate::hex::to_hex;

#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    timestamp: String,
    counter: u32,
    size: usize,
    payload_hex: String,
    measurements: &'a [Measurement],
}

/// JSONL frame journal
#[derive(Debug)]
pub struct FrameJournal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FrameJournal {
    /// Open `path` for appending, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Frame journal opened at {}", path.display());

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one transmitted frame
    pub fn record(&mut self, counter: u32, frame: &[u8], measurements: &[Measurement]) -> Result<()> {
        let entry = JournalEntry {
            timestamp: Utc::now().to_rfc3339(),
            counter,
            size: frame.len(),
            payload_hex: to_hex(frame),
            measurements,
        };

        serde_json::to_writer(&mut self.writer, &entry)
            .map_err(std::io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_record_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frames.jsonl");
        let mut journal = FrameJournal::open(&path).unwrap();

        let measurements = [Measurement::BatteryVoltage(3.7), Measurement::Counter(1)];
        journal.record(1, &[0x69, 0x02, 0x01, 0x72], &measurements).unwrap();
        journal.record(2, &[0x6A, 0x02], &[Measurement::Counter(2)]).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["counter"], 1);
        assert_eq!(lines[0]["size"], 4);
        assert_eq!(lines[0]["payload_hex"], "69020172");
        assert_eq!(lines[0]["measurements"][1]["kind"], "counter");
        assert_eq!(lines[0]["measurements"][1]["value"], 1);
        assert_eq!(lines[1]["counter"], 2);
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frames.jsonl");
        let mut journal = FrameJournal::open(&path).unwrap();
        journal.record(1, &[0x00], &[]).unwrap();

        let lines = read_lines(&path);
        let timestamp = lines[0]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_acceleration_serializes_as_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frames.jsonl");
        let mut journal = FrameJournal::open(&path).unwrap();
        let accel = Measurement::Acceleration { x: 0.5, y: -0.25, z: 1.0 };
        journal.record(3, &[0x01], &[accel]).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["measurements"][0]["kind"], "acceleration");
        assert_eq!(lines[0]["measurements"][0]["value"]["y"], -0.25);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/journal/frames.jsonl");
        let journal = FrameJournal::open(&path).unwrap();
        assert_eq!(journal.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frames.jsonl");

        FrameJournal::open(&path).unwrap().record(1, &[0x01], &[]).unwrap();
        FrameJournal::open(&path).unwrap().record(2, &[0x02], &[]).unwrap();

        assert_eq!(read_lines(&path).len(), 2);
    }
}
