#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crossterm::{
    cursor::MoveTo,
    event, execute,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Hands downloaded files to programs outside the browser.
pub trait Launcher {
    /// Opens `path` with an external viewer and returns once it was launched.
    fn open(&mut self, path: &Path) -> io::Result<()>;

    /// Runs an editor on `path` in the foreground and returns when it exits.
    fn edit(&mut self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct SystemLauncher {
    editor: String,
    opener: Option<String>,
}

impl SystemLauncher {
    pub fn new(editor: String, opener: Option<String>) -> Self {
        Self { editor, opener }
    }
}

impl Launcher for SystemLauncher {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        match &self.opener {
            Some(opener) => {
                let status = command_for(opener)?.arg(path).status()?;
                check_status(opener, status)
            }
            None => open::that(path),
        }
    }

    fn edit(&mut self, path: &Path) -> io::Result<()> {
        run_external_editor(&self.editor, path)
    }
}

fn command_for(line: &str) -> io::Result<Command> {
    let mut parts = line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    let mut command = Command::new(program);
    command.args(parts);
    Ok(command)
}

fn check_status(program: &str, status: std::process::ExitStatus) -> io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{} exited with {}", program, status)))
    }
}

/// Leaves the alternate screen, runs the editor, then restores the terminal
/// and drops any input typed while the editor was up.
pub fn run_external_editor(editor: &str, path: &Path) -> io::Result<()> {
    let mut stdout = io::stdout();
    crossterm::terminal::disable_raw_mode().ok();
    execute!(stdout, LeaveAlternateScreen)?;
    let status = command_for(editor).and_then(|mut command| command.arg(path).status());
    execute!(stdout, EnterAlternateScreen, Clear(ClearType::All), MoveTo(0, 0))?;
    stdout.flush()?;
    crossterm::terminal::enable_raw_mode().ok();
    while event::poll(Duration::from_millis(0))? {
        let _ = event::read();
    }
    check_status(editor, status?)
}
