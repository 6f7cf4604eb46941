//! Durable storage for the offline queue.
//!
//! # Responsibilities
//! - Hold one JSON array under a fixed key
//! - Survive process restarts (`FileStore`)
//!
//! # Design Decisions
//! - Whole-image writes; the queue is small and rewritten on every mutation
//! - Write to a temp file then rename, so a crash never leaves a torn image
//! - A missing or empty image is an empty queue

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::queue::types::QueuedRequest;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("queue storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("queue storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value persistence for the queue image.
pub trait QueueStore: Send + Sync {
    fn load(&self) -> Result<Vec<QueuedRequest>, StoreError>;

    fn save(&self, entries: &[QueuedRequest]) -> Result<(), StoreError>;
}

/// Stores the queue as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QueueStore for FileStore {
    fn load(&self) -> Result<Vec<QueuedRequest>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }

        let entries: Vec<QueuedRequest> = serde_json::from_reader(BufReader::new(file))?;
        tracing::debug!(path = %self.path.display(), entries = entries.len(), "Loaded offline queue");
        Ok(entries)
    }

    fn save(&self, entries: &[QueuedRequest]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, entries)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::trace!(path = %self.path.display(), entries = entries.len(), "Saved offline queue");
        Ok(())
    }
}

/// Non-durable store. Shared through an `Arc` it also stands in for a
/// restart: a second queue built on the same store sees the saved image.
#[derive(Debug, Default)]
pub struct MemoryStore {
    image: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The serialized image, if anything was saved.
    pub fn raw(&self) -> Option<String> {
        self.image.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl QueueStore for MemoryStore {
    fn load(&self) -> Result<Vec<QueuedRequest>, StoreError> {
        match self.image.lock().unwrap_or_else(|e| e.into_inner()).as_deref() {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(raw)?),
            _ => Ok(Vec::new()),
        }
    }

    fn save(&self, entries: &[QueuedRequest]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(entries)?;
        *self.image.lock().unwrap_or_else(|e| e.into_inner()) = Some(raw);
        Ok(())
    }
}
