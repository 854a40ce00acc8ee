//! Small JSON documents persisted with file locking.
//!
//! Session flags and UI preferences are each one JSON object on disk. Reads
//! take a shared lock, writes go through a locked temp file that is renamed
//! over the original, and an unreadable or corrupt file yields the default
//! value with a warning instead of an error.

use crate::{Error, Preferences, Result, Session};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A value stored as a single JSON document
pub trait JsonDocument: Serialize + DeserializeOwned + Default {
    /// Name used in log lines
    const KIND: &'static str;

    /// Load from `path`, falling back to the default value
    fn load(path: &Path) -> Result<Self> {
        load_document(path)
    }

    /// Atomically write to `path`
    fn save(&self, path: &Path) -> Result<()> {
        save_document(self, path)
    }

    /// Load, modify, and save back
    fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut Self),
    {
        let mut value = Self::load(path)?;
        f(&mut value);
        value.save(path)?;
        Ok(value)
    }
}

impl JsonDocument for Session {
    const KIND: &'static str = "session";
}

impl JsonDocument for Preferences {
    const KIND: &'static str = "preferences";
}

fn load_document<T: JsonDocument>(path: &Path) -> Result<T> {
    if !path.exists() {
        tracing::debug!("No {} file at {:?}, using defaults", T::KIND, path);
        return Ok(T::default());
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(
                "Unable to open {} file {:?}: {}. Using defaults.",
                T::KIND,
                path,
                e
            );
            return Ok(T::default());
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!(
            "Unable to lock {} file {:?}: {}. Using defaults.",
            T::KIND,
            path,
            e
        );
        return Ok(T::default());
    }

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;

    if let Err(e) = read {
        tracing::warn!(
            "Failed to read {} file {:?}: {}. Using defaults.",
            T::KIND,
            path,
            e
        );
        return Ok(T::default());
    }

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => {
            tracing::debug!("Loaded {} from {:?}", T::KIND, path);
            Ok(value)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} file {:?}: {}. Using defaults.",
                T::KIND,
                path,
                e
            );
            Ok(T::default())
        }
    }
}

fn save_document<T: JsonDocument>(value: &T, path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("{} path {:?} has no parent", T::KIND, path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(serde_json::to_string(value)?.as_bytes())?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved {} to {:?}", T::KIND, path);
    Ok(())
}
