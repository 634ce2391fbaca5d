#![forbid(unsafe_code)]

mod app;
mod config;
mod error;
mod fs_ops;
mod history;
mod keymap;
mod launcher;
mod logging;
mod menu;
mod model;
mod provider;
mod store;
mod tree;
mod ui;
mod vfs;
mod viewport;
mod views;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use crate::app::{App, FatalSlot};
use crate::config::{config_dir, Cli, Config};
use crate::error::AppError;
use crate::history::DownloadHistory;
use crate::launcher::SystemLauncher;
use crate::provider::Provider;
use crate::store::LocalStore;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("objfinder: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli)?;
    let _guard = logging::init(&config_dir(), &config.log_level)?;
    tracing::info!(
        root = %config.store_root.display(),
        downloads = %config.download_dir.display(),
        "starting"
    );

    let history = DownloadHistory::load(&config.history_file).map_err(AppError::from)?;
    tracing::info!(path = %history.path().display(), items = history.items().len(), "download history loaded");
    let store = LocalStore::new(&config.store_root);
    let launcher = SystemLauncher::new(config.editor_command(), config.opener.clone());
    let size = crossterm::terminal::size().map_err(AppError::Terminal)?;
    let provider = Provider::new(store, launcher, history, config.download_dir.clone(), size)?;

    let fatal = FatalSlot::default();
    App::new(provider, size, Arc::clone(&fatal))
        .run()
        .map_err(AppError::Terminal)?;

    if let Some(err) = fatal.get() {
        tracing::error!(error = %err, "exiting after fatal error");
        anyhow::bail!("{}", err);
    }
    tracing::info!("bye");
    Ok(())
}
