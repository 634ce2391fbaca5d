#![forbid(unsafe_code)]

//! Persistent list of completed downloads.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    pub filename: String,
    /// Object URI the bytes came from.
    pub source: String,
    /// Local path the bytes were written to.
    pub destination: String,
}

impl DownloadItem {
    pub fn new(filename: impl Into<String>, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self { filename: filename.into(), source: source.into(), destination: destination.into() }
    }

    pub fn line(&self) -> String {
        format!("{} {} {}", self.filename, self.source, self.destination)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    items: Vec<DownloadItem>,
}

#[derive(Debug)]
pub struct DownloadHistory {
    path: PathBuf,
    items: Vec<DownloadItem>,
}

impl DownloadHistory {
    /// Loads the history at `path`, creating an empty file on first run.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        if !path.exists() {
            let history = Self { path, items: Vec::new() };
            history.save()?;
            tracing::info!(path = %history.path.display(), "created download history");
            return Ok(history);
        }
        let raw = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
        let file: HistoryFile = if raw.trim().is_empty() {
            HistoryFile::default()
        } else {
            serde_json::from_str(&raw).map_err(|source| HistoryError::Malformed {
                path: path.display().to_string(),
                source,
            })?
        };
        tracing::debug!(items = file.items.len(), "loaded download history");
        Ok(Self { path, items: file.items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[DownloadItem] {
        &self.items
    }

    /// Appends one record and persists the whole list.
    pub fn append(&mut self, item: DownloadItem) -> Result<(), HistoryError> {
        self.items.push(item);
        self.save()
    }

    fn save(&self) -> Result<(), HistoryError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        let body = serde_json::to_vec_pretty(&HistoryFile { items: self.items.clone() })
            .map_err(|source| HistoryError::Malformed { path: self.path.display().to_string(), source })?;
        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(|source| io_error(parent, source))?;
        staged.write_all(&body).map_err(|source| io_error(&self.path, source))?;
        staged
            .persist(&self.path)
            .map_err(|err| io_error(&self.path, err.error))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> HistoryError {
    HistoryError::Io { path: path.display().to_string(), source }
}
