#![forbid(unsafe_code)]

//! Command line flags and the optional `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Parser, Debug, Default)]
#[command(name = "objfinder", version, about = "Terminal browser for bucket/prefix/object stores")]
pub struct Cli {
    /// Store root: every sub-directory is a bucket, every *.zip a read-only bucket
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Where downloaded objects are written
    #[arg(short, long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `objfinder=trace`
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_root: PathBuf,
    pub download_dir: PathBuf,
    /// Editor command; falls back to `$EDITOR`, then `vi`.
    pub editor: Option<String>,
    /// Opener command; the platform default handler is used when unset.
    pub opener: Option<String>,
    pub history_file: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("."),
            download_dir: PathBuf::from("."),
            editor: None,
            opener: None,
            history_file: config_dir().join("downloads.json"),
            log_level: "info".to_string(),
        }
    }
}

/// Per-user configuration directory, also home of the log and history files.
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("", "", "objfinder")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".objfinder"))
}

impl Config {
    /// Reads the config file (missing file means defaults) and applies the
    /// command line overrides on top.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));
        let mut config = Self::from_file(&path)?;
        if let Some(root) = &cli.root {
            config.store_root = root.clone();
        }
        if let Some(dir) = &cli.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(level) = &cli.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("{}: {}", path.display(), err)))?;
        toml::from_str(&raw).map_err(|err| AppError::Config(format!("{}: {}", path.display(), err)))
    }

    /// Editor command in priority order: config, `$EDITOR`, `vi`.
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| "vi".to_string())
    }
}
