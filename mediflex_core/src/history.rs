//! Consultation history log.
//!
//! Every successful analysis is appended to a JSONL (JSON Lines) file under an
//! exclusive file lock, so several CLI processes can record at once.

use crate::{ConsultationRecord, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for completed consultations
pub trait ConsultationSink {
    fn record(&mut self, record: &ConsultationRecord) -> Result<()>;
}

/// JSONL-backed history log with file locking
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records; unparseable lines are skipped with a warning
    pub fn read_all(&self) -> Result<Vec<ConsultationRecord>> {
        read_records(&self.path)
    }

    /// Truncate the log; returns how many records were dropped
    pub fn clear(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let dropped = read_records(&self.path)?.len();
        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.lock_exclusive()?;
        file.set_len(0)?;
        file.sync_all()?;
        file.unlock()?;

        tracing::info!("Cleared {} consultations from history", dropped);
        Ok(dropped)
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ConsultationSink for JsonlHistory {
    fn record(&mut self, record: &ConsultationRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Recorded consultation {} in history", record.id);
        Ok(())
    }
}

/// Sink that drops everything (history disabled)
#[derive(Default)]
pub struct NoHistory;

impl ConsultationSink for NoHistory {
    fn record(&mut self, _record: &ConsultationRecord) -> Result<()> {
        Ok(())
    }
}

/// Read all consultations from a history file, oldest first
pub fn read_records(path: &Path) -> Result<Vec<ConsultationRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ConsultationRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping unreadable history entry at line {}: {}",
                    line_num + 1,
                    e
                );
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} consultations from history", records.len());
    Ok(records)
}
