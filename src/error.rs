#![forbid(unsafe_code)]

//! Error types shared by the store, the navigation tree and the provider.

use std::io;

use thiserror::Error;

/// Failures reported by an [`crate::store::ObjectStore`] backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no such bucket: {0}")]
    NoSuchBucket(String),

    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("bucket is read-only: {0}")]
    ReadOnly(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Failures reported by the navigation tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The caller asked for something the tree shape forbids, such as
    /// ascending from the root.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    #[error("listing failed: {0}")]
    Fetch(#[from] StoreError),
}

/// Download history persistence failures.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history I/O error on {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("history file {path} is malformed: {source}")]
    Malformed { path: String, source: serde_json::Error },
}

/// Top level error type of the application.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable (status message, keep running) =====
    #[error("transfer failed: {0}")]
    Transfer(#[from] StoreError),

    #[error("download history: {0}")]
    History(#[from] HistoryError),

    #[error("launch failed: {0}")]
    Launch(#[source] io::Error),

    // ===== Fatal (terminate the process) =====
    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AppError {
    /// Fatal errors end the event loop; everything else becomes a status line.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Tree(_) | AppError::Config(_) | AppError::Terminal(_) | AppError::Io(_)
        )
    }
}
