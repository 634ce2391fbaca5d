#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ftui::prelude::*;
use ftui::render::budget::FrameBudgetConfig;
use ftui::render::diff_strategy::DiffStrategyConfig;
use ftui::{KeyEventKind, Program, ProgramConfig, RuntimeDiffConfig};

use crate::error::AppError;
use crate::keymap::{InputEvent, NamedKey};
use crate::launcher::{Launcher, SystemLauncher};
use crate::provider::{Flow, Provider};
use crate::store::{LocalStore, ObjectStore};
use crate::ui::{FrameCanvas, ThemeColors};

/// Slot the event loop stores a fatal error in before quitting.
pub type FatalSlot = Arc<OnceLock<AppError>>;

#[derive(Debug, Clone)]
pub enum Msg {
    Event(Event),
}

impl From<Event> for Msg {
    fn from(event: Event) -> Self {
        Msg::Event(event)
    }
}

pub struct App<S, L> {
    provider: RefCell<Provider<S, L>>,
    theme: ThemeColors,
    size: Cell<(u16, u16)>,
    force_clear_frames: RefCell<u8>,
    fatal: FatalSlot,
}

impl<S: ObjectStore, L: Launcher> App<S, L> {
    pub fn new(provider: Provider<S, L>, size: (u16, u16), fatal: FatalSlot) -> Self {
        Self {
            provider: RefCell::new(provider),
            theme: ThemeColors::classic(),
            size: Cell::new(size),
            force_clear_frames: RefCell::new(0),
            fatal,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Cmd<Msg> {
        if key.kind != KeyEventKind::Press {
            return Cmd::none();
        }
        let provider = self.provider.get_mut();
        let result = provider.handle(input_event(&key));
        if provider.take_needs_clear() {
            *self.force_clear_frames.get_mut() = 3;
        }
        match result {
            Ok(Flow::Continue) => Cmd::none(),
            Ok(Flow::Quit) => {
                tracing::info!("quit requested");
                Cmd::quit()
            }
            Err(err) => {
                tracing::error!(error = %err, "fatal error, shutting down");
                let _ = self.fatal.set(err);
                Cmd::quit()
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        frame.set_cursor(None);
        {
            let mut force_clear = self.force_clear_frames.borrow_mut();
            if *force_clear > 0 {
                frame.clear();
                *force_clear = force_clear.saturating_sub(1);
            }
        }

        let mut provider = self.provider.borrow_mut();
        let size = (frame.width(), frame.height());
        if self.size.get() != size {
            self.size.set(size);
            provider.resize(size.0, size.1);
        }

        let mut canvas = FrameCanvas::new(frame, self.theme);
        canvas.clear();
        provider.draw(&mut canvas);
    }
}

impl App<LocalStore, SystemLauncher> {
    pub fn run(self) -> io::Result<()> {
        let mut budget = FrameBudgetConfig::with_total(Duration::from_millis(50));
        budget.allow_frame_skip = false;
        budget.degradation_cooldown = 0;
        let strategy_config = DiffStrategyConfig {
            c_scan: 1000.0,
            c_emit: 1.0,
            c_row: 100.0,
            prior_alpha: 1.0,
            prior_beta: 1.0,
            decay: 1.0,
            conservative: false,
            conservative_quantile: 0.95,
            min_observation_cells: 0,
            hysteresis_ratio: 0.0,
            uncertainty_guard_variance: 0.0,
        };
        let diff_config = RuntimeDiffConfig::default()
            .with_bayesian_enabled(true)
            .with_dirty_rows_enabled(false)
            .with_dirty_spans_enabled(false)
            .with_tile_skip_enabled(false)
            .with_strategy_config(strategy_config);
        let config = ProgramConfig::fullscreen()
            .with_budget(budget)
            .with_diff_config(diff_config);
        let mut program = Program::with_config(self, config)?;
        program.run()
    }
}

impl<S: ObjectStore, L: Launcher> Model for App<S, L> {
    type Message = Msg;

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::Event(Event::Key(key)) => self.handle_key(key),
            Msg::Event(_) => Cmd::none(),
        }
    }

    fn view(&self, frame: &mut Frame) {
        self.render(frame);
    }
}

/// Converts a terminal key press. Ctrl+letter becomes a named key with no
/// character; keys the browser never binds become an empty event.
pub fn input_event(key: &KeyEvent) -> InputEvent {
    if key.modifiers.contains(Modifiers::CTRL) {
        if let KeyCode::Char(c) = key.code {
            return InputEvent::key(NamedKey::Ctrl(c.to_ascii_lowercase()));
        }
    }
    match key.code {
        KeyCode::Char(c) => InputEvent::char(c),
        KeyCode::Escape => InputEvent::key(NamedKey::Esc),
        KeyCode::Enter => InputEvent::key(NamedKey::Enter),
        KeyCode::Up => InputEvent::key(NamedKey::Up),
        KeyCode::Down => InputEvent::key(NamedKey::Down),
        KeyCode::Left => InputEvent::key(NamedKey::Left),
        KeyCode::Right => InputEvent::key(NamedKey::Right),
        _ => InputEvent::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DownloadHistory;
    use crate::launcher::recording::RecordingLauncher;
    use crate::model::Mode;
    use crate::store::memory::MemoryStore;

    fn press(code: KeyCode, modifiers: Modifiers) -> KeyEvent {
        KeyEvent { code, modifiers, kind: KeyEventKind::Press }
    }

    fn app(dir: &tempfile::TempDir) -> App<MemoryStore, RecordingLauncher> {
        let store = MemoryStore::new();
        store.put("a", "x.txt", b"hello");
        let history = DownloadHistory::load(dir.path().join("downloads.json")).unwrap();
        let provider = Provider::new(
            store,
            RecordingLauncher::default(),
            history,
            dir.path().join("downloads"),
            (80, 24),
        )
        .unwrap();
        App::new(provider, (80, 24), Arc::new(OnceLock::new()))
    }

    #[test]
    fn ctrl_letters_are_named_keys_only() {
        let event = input_event(&press(KeyCode::Char('w'), Modifiers::CTRL));
        assert_eq!(event, InputEvent::key(NamedKey::Ctrl('w')));
        assert_eq!(event.ch, None);
    }

    #[test]
    fn plain_and_named_keys_convert() {
        assert_eq!(input_event(&press(KeyCode::Char('j'), Modifiers::empty())), InputEvent::char('j'));
        assert_eq!(input_event(&press(KeyCode::Escape, Modifiers::empty())), InputEvent::key(NamedKey::Esc));
        assert_eq!(input_event(&press(KeyCode::Tab, Modifiers::empty())), InputEvent::default());
    }

    #[test]
    fn key_releases_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let release = KeyEvent {
            code: KeyCode::Char('l'),
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Release,
        };
        let _ = app.update(Msg::Event(Event::Key(release)));
        assert_eq!(app.provider.get_mut().store().list_children_calls().len(), 0);
    }

    #[test]
    fn ctrl_w_does_not_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let _ = app.update(Msg::Event(Event::Key(press(KeyCode::Char('l'), Modifiers::empty()))));
        let _ = app.update(Msg::Event(Event::Key(press(KeyCode::Char('w'), Modifiers::CTRL))));
        let provider = app.provider.get_mut();
        assert!(provider.store().fetch_calls().is_empty());
        assert_eq!(provider.status(), "no mapping key");
    }

    #[test]
    fn q_quits_through_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let cmd = app.update(Msg::Event(Event::Key(press(KeyCode::Char('m'), Modifiers::empty()))));
        assert!(!matches!(cmd, Cmd::Quit));
        let cmd = app.update(Msg::Event(Event::Key(press(KeyCode::Char('q'), Modifiers::empty()))));
        assert!(!matches!(cmd, Cmd::Quit));
        let cmd = app.update(Msg::Event(Event::Key(press(KeyCode::Char('q'), Modifiers::empty()))));
        assert!(matches!(cmd, Cmd::Quit));
        assert!(app.fatal.get().is_none());
    }

    #[test]
    fn fatal_errors_land_in_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.provider.get_mut().store().fail();
        let _ = app.update(Msg::Event(Event::Key(press(KeyCode::Enter, Modifiers::empty()))));
        assert!(app.fatal.get().is_some_and(AppError::is_fatal));
        assert_eq!(app.provider.get_mut().mode(), Mode::List);
    }
}
