#![forbid(unsafe_code)]

//! The browser state machine: owns the navigation tree and every view, and
//! turns resolved actions into tree motion, view changes or store calls.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{AppError, StoreError};
use crate::history::{DownloadHistory, DownloadItem};
use crate::keymap::{self, InputEvent};
use crate::launcher::Launcher;
use crate::model::{basename, object_uri, Action, EntryKind, MenuCommand, Mode};
use crate::store::ObjectStore;
use crate::tree::{NavigationTree, NodeId};
use crate::views::{
    ActionHandler, Canvas, DetailView, Drawable, EntryListView, HistoryView, Layout, MenuView,
    NavigationView, StatusView,
};

/// Whether the event loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Provider<S, L> {
    store: S,
    launcher: L,
    tree: NavigationTree,
    current: NodeId,
    mode: Mode,
    terminal_height: u16,
    list: EntryListView,
    navigation: NavigationView,
    status: StatusView,
    menu: MenuView,
    detail: DetailView,
    downloads: HistoryView,
    history: DownloadHistory,
    download_dir: PathBuf,
    scratch: TempDir,
    needs_clear: bool,
}

impl<S: ObjectStore, L: Launcher> Provider<S, L> {
    /// Lists the buckets and shows them. A failing bucket listing is fatal.
    pub fn new(
        store: S,
        launcher: L,
        history: DownloadHistory,
        download_dir: PathBuf,
        (width, height): (u16, u16),
    ) -> Result<Self, AppError> {
        let tree = NavigationTree::new(&store)?;
        let scratch = tempfile::Builder::new().prefix("objfinder-").tempdir()?;
        let layout = Layout::new(width, height);
        let mut provider = Self {
            store,
            launcher,
            current: tree.root(),
            tree,
            mode: Mode::List,
            terminal_height: height,
            list: EntryListView::new(layout.list),
            navigation: NavigationView::new(layout.navigation),
            status: StatusView::new(layout.status),
            menu: MenuView::new(layout.menu),
            detail: DetailView::new(layout.detail),
            downloads: HistoryView::new(layout.history),
            history,
            download_dir,
            scratch,
            needs_clear: false,
        };
        provider.show_node(provider.current);
        Ok(provider)
    }

    /// True once after an external program took over the terminal.
    pub fn take_needs_clear(&mut self) -> bool {
        std::mem::take(&mut self.needs_clear)
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        let layout = Layout::new(width, height);
        self.terminal_height = height;
        self.list.set_geometry(layout.list);
        self.navigation.set_geometry(layout.navigation);
        self.status.set_geometry(layout.status);
        self.menu.set_geometry(layout.menu);
        self.detail.set_geometry(layout.detail);
        self.downloads.set_geometry(layout.history);
        tracing::debug!(width, height, "resized");
    }

    /// Handles one key press. Errors returned from here are fatal; anything
    /// recoverable has already been turned into a status message.
    pub fn handle(&mut self, event: InputEvent) -> Result<Flow, AppError> {
        let Some(action) = keymap::resolve(&event, self.mode) else {
            self.status.set("no mapping key");
            return Ok(Flow::Continue);
        };
        tracing::debug!(?action, mode = ?self.mode, "dispatch");
        match self.mode {
            Mode::List => self.handle_list(action),
            Mode::Menu if action == Action::ExecuteMenuItem => {
                let command = self.menu.current().map(|item| item.command);
                self.mode = Mode::List;
                if let Some(command) = command {
                    self.run_object_command(command)?;
                }
                Ok(Flow::Continue)
            }
            Mode::Menu | Mode::Detail | Mode::DownloadHistory => {
                let height = self.terminal_height;
                if action == Action::Quit {
                    self.mode = Mode::List;
                } else if let Some(view) = self.overlay_mut() {
                    view.handle(action, height);
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn overlay_mut(&mut self) -> Option<&mut dyn ActionHandler> {
        match self.mode {
            Mode::List => None,
            Mode::Menu => Some(&mut self.menu),
            Mode::Detail => Some(&mut self.detail),
            Mode::DownloadHistory => Some(&mut self.downloads),
        }
    }

    fn handle_list(&mut self, action: Action) -> Result<Flow, AppError> {
        match action {
            Action::Quit => return Ok(Flow::Quit),
            Action::Up | Action::Down | Action::HalfUp | Action::HalfDown => {
                self.list.handle(action, self.terminal_height);
            }
            Action::Descend => self.descend()?,
            Action::Ascend => {
                if !self.tree.is_root(self.current) {
                    self.ascend()?;
                }
            }
            Action::Reload => self.reload()?,
            Action::Download => self.run_object_command(MenuCommand::Download)?,
            Action::Open => self.run_object_command(MenuCommand::Open)?,
            Action::Edit => self.run_object_command(MenuCommand::Edit)?,
            Action::OpenDetail => self.run_object_command(MenuCommand::Detail)?,
            Action::OpenMenu => self.mode = Mode::Menu,
            Action::OpenDownloadHistory => {
                self.downloads.show(self.history.items());
                self.mode = Mode::DownloadHistory;
            }
            Action::ExecuteMenuItem => {}
        }
        Ok(Flow::Continue)
    }

    fn show_node(&mut self, id: NodeId) {
        self.current = id;
        let node = self.tree.node(id);
        self.list.show(node.entries().len(), node.remembered_cursor());
        self.navigation
            .set_path(self.tree.listing_kind(id), self.tree.bucket_of(id), node.key());
    }

    fn descend(&mut self) -> Result<(), AppError> {
        let entries = self.tree.node(self.current).entries();
        let Some(entry) = self.list.current(entries) else {
            self.status.set("no entry.");
            return Ok(());
        };
        match entry.kind {
            EntryKind::Bucket | EntryKind::Directory => {
                let key = entry.name.clone();
                self.tree.remember_cursor(self.current, self.list.cursor());
                let child = self.tree.descend_into(&self.store, self.current, &key)?;
                self.show_node(child);
            }
            EntryKind::ParentDirectory => self.ascend()?,
            EntryKind::Object => {
                let message = format!("not a directory. {}", entry.name);
                self.status.set(message);
            }
        }
        Ok(())
    }

    fn ascend(&mut self) -> Result<(), AppError> {
        let parent = self.tree.ascend(self.current)?;
        self.tree.remember_cursor(self.current, self.list.cursor());
        self.show_node(parent);
        Ok(())
    }

    fn reload(&mut self) -> Result<(), AppError> {
        self.tree.reload(&self.store, self.current)?;
        let len = self.tree.node(self.current).entries().len();
        self.list.show(len, self.list.cursor());
        self.status.set("reload.");
        Ok(())
    }

    /// Bucket and key of the object under the cursor.
    fn selected_object(&self) -> Result<(String, String), String> {
        let entries = self.tree.node(self.current).entries();
        let entry = self.list.current(entries).ok_or_else(|| "no entry.".to_string())?;
        if entry.kind != EntryKind::Object {
            return Err(format!("{} is not an object.", entry.kind.label()));
        }
        let bucket = self
            .tree
            .bucket_of(self.current)
            .ok_or_else(|| "no bucket.".to_string())?;
        Ok((bucket.to_string(), entry.name.clone()))
    }

    fn run_object_command(&mut self, command: MenuCommand) -> Result<(), AppError> {
        let (bucket, key) = match self.selected_object() {
            Ok(selected) => selected,
            Err(message) => {
                self.status.set(message);
                return Ok(());
            }
        };
        let result = match command {
            MenuCommand::Download => self.download(&bucket, &key),
            MenuCommand::Open => self.open(&bucket, &key),
            MenuCommand::Edit => self.edit(&bucket, &key),
            MenuCommand::Detail => self.show_detail(&bucket, &key),
        };
        match result {
            Ok(message) => self.status.set(message),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!(?command, bucket = %bucket, key = %key, error = %err, "object operation failed");
                self.status.set(format!("{} failed. {}", command.label(), err));
            }
        }
        Ok(())
    }

    /// Streams an object into `dest`. `dest` is only replaced once the whole
    /// body has arrived.
    fn fetch_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, AppError> {
        let mut body = self.store.fetch_object(bucket, key)?;
        let parent = dest.parent().unwrap_or(&self.download_dir);
        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(StoreError::Io)?;
        let written = io::copy(&mut body, &mut staged).map_err(StoreError::Io)?;
        staged.persist(dest).map_err(|err| StoreError::Io(err.error))?;
        Ok(written)
    }

    fn download(&mut self, bucket: &str, key: &str) -> Result<String, AppError> {
        fs::create_dir_all(&self.download_dir).map_err(StoreError::Io)?;
        let filename = basename(key);
        let dest = self.download_dir.join(filename);
        let bytes = self.fetch_to(bucket, key, &dest)?;
        let uri = object_uri(bucket, key);
        tracing::info!(%uri, dest = %dest.display(), bytes, "downloaded");
        self.history
            .append(DownloadItem::new(filename, uri.clone(), dest.display().to_string()))?;
        Ok(format!("download complete. {}", uri))
    }

    fn open(&mut self, bucket: &str, key: &str) -> Result<String, AppError> {
        let path = self.scratch.path().join(basename(key));
        self.fetch_to(bucket, key, &path)?;
        self.launcher.open(&path).map_err(AppError::Launch)?;
        Ok(format!("open. {}", object_uri(bucket, key)))
    }

    fn edit(&mut self, bucket: &str, key: &str) -> Result<String, AppError> {
        let uri = object_uri(bucket, key);
        let path = self.scratch.path().join(basename(key));
        self.fetch_to(bucket, key, &path)?;
        let before = xxh3_64(&fs::read(&path).map_err(StoreError::Io)?);

        let edited = self.launcher.edit(&path);
        self.needs_clear = true;
        edited.map_err(AppError::Launch)?;

        let after = fs::read(&path).map_err(StoreError::Io)?;
        if xxh3_64(&after) == before {
            return Ok(format!("edit. no changes {}", uri));
        }
        let mut body = after.as_slice();
        self.store.put_object(bucket, key, &mut body)?;
        tracing::info!(%uri, bytes = after.len(), "uploaded edited object");
        Ok(format!("edit. {}", uri))
    }

    fn show_detail(&mut self, bucket: &str, key: &str) -> Result<String, AppError> {
        let detail = self.store.stat_object(bucket, key)?;
        self.detail.show(&detail);
        self.mode = Mode::Detail;
        Ok(format!("detail. {}", object_uri(bucket, key)))
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let node = self.tree.node(self.current);
        self.navigation.draw(canvas);
        self.list
            .frame(node.entries(), self.tree.listing_kind(self.current), node.key())
            .draw(canvas);
        self.status.draw(canvas);
        match self.mode {
            Mode::List => {}
            Mode::Menu => self.menu.draw(canvas),
            Mode::Detail => self.detail.draw(canvas),
            Mode::DownloadHistory => self.downloads.draw(canvas),
        }
    }
}

#[cfg(test)]
impl<S, L> Provider<S, L> {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> &str {
        self.status.message()
    }

    pub fn tree(&self) -> &NavigationTree {
        &self.tree
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn list(&self) -> &EntryListView {
        &self.list
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn history(&self) -> &DownloadHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::NamedKey;
    use crate::launcher::recording::RecordingLauncher;
    use crate::store::memory::MemoryStore;
    use crate::views::grid::Grid;

    struct Fixture {
        provider: Provider<MemoryStore, RecordingLauncher>,
        dir: TempDir,
    }

    fn fixture(store: MemoryStore) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let history = DownloadHistory::load(dir.path().join("downloads.json")).unwrap();
        let provider = Provider::new(
            store,
            RecordingLauncher::default(),
            history,
            dir.path().join("downloads"),
            (80, 24),
        )
        .unwrap();
        Fixture { provider, dir }
    }

    fn press(provider: &mut Provider<MemoryStore, RecordingLauncher>, keys: &str) {
        for c in keys.chars() {
            provider.handle(InputEvent::char(c)).unwrap();
        }
    }

    fn two_buckets() -> MemoryStore {
        let store = MemoryStore::new();
        store.put("a", "x.txt", b"hello");
        store.put("a", "logs/app.log", b"log");
        store.put("b", "y.txt", b"y");
        store
    }

    #[test]
    fn descending_twice_lists_once() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        let root = provider.current();
        assert_eq!(provider.list().cursor(), 0);

        press(&mut provider, "l");
        assert_eq!(provider.store().list_children_calls(), vec![("a".to_string(), String::new())]);
        let bucket = provider.current();

        press(&mut provider, "h");
        assert_eq!(provider.current(), root);
        assert_eq!(provider.tree().node(root).child("a"), Some(bucket));

        press(&mut provider, "l");
        assert_eq!(provider.current(), bucket);
        assert_eq!(provider.store().list_children_calls().len(), 1);
    }

    #[test]
    fn download_fetches_records_and_reports() {
        let Fixture { mut provider, dir } = fixture(two_buckets());
        // a/: ../, logs/, x.txt
        press(&mut provider, "lj");
        press(&mut provider, "w");

        assert_eq!(provider.store().fetch_calls(), vec![("a".to_string(), "x.txt".to_string())]);
        assert_eq!(provider.history().items().len(), 1);
        assert!(provider.status().contains("s3://a/x.txt"));
        assert_eq!(provider.status(), "download complete. s3://a/x.txt");
        let written = fs::read(dir.path().join("downloads/x.txt")).unwrap();
        assert_eq!(written, b"hello");

        let reloaded = DownloadHistory::load(dir.path().join("downloads.json")).unwrap();
        assert_eq!(reloaded.items()[0].source, "s3://a/x.txt");
    }

    #[test]
    fn cursor_is_restored_on_reentry() {
        let store = MemoryStore::new();
        for i in 0..6 {
            store.put("a", &format!("f{}.txt", i), b"x");
        }
        let Fixture { mut provider, .. } = fixture(store);
        press(&mut provider, "l");
        assert_eq!(provider.list().cursor(), 1);
        press(&mut provider, "jjj");
        assert_eq!(provider.list().cursor(), 4);
        press(&mut provider, "h");
        assert_eq!(provider.list().cursor(), 0);
        press(&mut provider, "l");
        assert_eq!(provider.list().cursor(), 4);
    }

    #[test]
    fn parent_marker_ascends() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        let root = provider.current();
        press(&mut provider, "lk");
        assert_eq!(provider.list().cursor(), 0);
        provider.handle(InputEvent::key(NamedKey::Enter)).unwrap();
        assert_eq!(provider.current(), root);
    }

    #[test]
    fn ascend_at_root_is_ignored() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        let root = provider.current();
        press(&mut provider, "h");
        assert_eq!(provider.current(), root);
        assert_eq!(provider.status(), "");
    }

    #[test]
    fn unmapped_key_only_sets_status() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        let flow = provider.handle(InputEvent::char('z')).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(provider.status(), "no mapping key");
        assert_eq!(provider.mode(), Mode::List);
        assert_eq!(provider.list().cursor(), 0);
    }

    #[test]
    fn object_commands_reject_containers() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "w");
        assert_eq!(provider.status(), "bucket is not an object.");
        press(&mut provider, "l");
        press(&mut provider, "o");
        assert_eq!(provider.status(), "directory is not an object.");
        assert!(provider.store().fetch_calls().is_empty());
        assert!(provider.launcher().opened.is_empty());
    }

    #[test]
    fn descending_into_an_object_is_rejected() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "ljl");
        assert_eq!(provider.status(), "not a directory. x.txt");
        assert_eq!(provider.store().list_children_calls().len(), 1);
    }

    #[test]
    fn quit_ends_the_loop_only_from_the_list() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "m");
        assert_eq!(provider.mode(), Mode::Menu);
        assert_eq!(provider.handle(InputEvent::key(NamedKey::Esc)).unwrap(), Flow::Continue);
        assert_eq!(provider.mode(), Mode::List);
        assert_eq!(provider.handle(InputEvent::char('q')).unwrap(), Flow::Quit);
    }

    #[test]
    fn menu_executes_selected_item_and_returns() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "ljm");
        press(&mut provider, "j");
        assert_eq!(provider.list().cursor(), 2);
        provider.handle(InputEvent::key(NamedKey::Enter)).unwrap();

        assert_eq!(provider.mode(), Mode::List);
        assert_eq!(provider.launcher().opened.len(), 1);
        assert!(provider.launcher().opened[0].ends_with("x.txt"));
        assert_eq!(provider.status(), "open. s3://a/x.txt");
    }

    #[test]
    fn menu_closes_on_m() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "mm");
        assert_eq!(provider.mode(), Mode::List);
    }

    #[test]
    fn detail_overlay_shows_metadata() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "lji");
        assert_eq!(provider.mode(), Mode::Detail);

        let mut grid = Grid::new(80, 24);
        provider.draw(&mut grid);
        // overlay starts at half the width
        assert_eq!(&grid.row(1)[40..], "x.txt");
        assert_eq!(grid.row(4).trim(), "Size: 5 B");

        press(&mut provider, "q");
        assert_eq!(provider.mode(), Mode::List);
    }

    #[test]
    fn history_overlay_lists_downloads() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "ljwn");
        assert_eq!(provider.mode(), Mode::DownloadHistory);
        let mut grid = Grid::new(80, 24);
        provider.draw(&mut grid);
        assert!(grid.row(1).starts_with("x.txt s3://a/x.txt "));
        press(&mut provider, "q");
        assert_eq!(provider.mode(), Mode::List);
    }

    #[test]
    fn edit_uploads_changed_bytes() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        provider.launcher.edit_result = Some(b"changed".to_vec());
        press(&mut provider, "lje");

        assert_eq!(provider.launcher().edited.len(), 1);
        assert_eq!(provider.store().put_calls(), vec![("a".to_string(), "x.txt".to_string())]);
        assert_eq!(provider.store().get("a", "x.txt"), Some(b"changed".to_vec()));
        assert_eq!(provider.status(), "edit. s3://a/x.txt");
        assert!(provider.take_needs_clear());
        assert!(!provider.take_needs_clear());
    }

    #[test]
    fn edit_without_changes_skips_upload() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "lje");
        assert!(provider.store().put_calls().is_empty());
        assert_eq!(provider.status(), "edit. no changes s3://a/x.txt");
    }

    #[test]
    fn listing_failure_is_fatal() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        let root = provider.current();
        provider.store().fail();
        let err = provider.handle(InputEvent::char('l')).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(provider.tree().node(root).child("a"), None);
        assert_eq!(provider.current(), root);
    }

    #[test]
    fn transfer_failure_is_recoverable() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "lj");
        provider.store().remove("a", "x.txt");
        let flow = provider.handle(InputEvent::char('w')).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(provider.status().starts_with("download failed."));
        assert!(provider.history().items().is_empty());
    }

    #[test]
    fn interrupted_download_keeps_previous_copy() {
        let Fixture { mut provider, dir } = fixture(two_buckets());
        let dest = dir.path().join("downloads/x.txt");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"previous copy").unwrap();
        provider.store().break_reads_after(3);

        press(&mut provider, "ljw");

        assert!(provider.status().starts_with("download failed."));
        assert!(provider.status().contains("connection reset"));
        assert_eq!(fs::read(&dest).unwrap(), b"previous copy");
        assert_eq!(fs::read_dir(dest.parent().unwrap()).unwrap().count(), 1);
        assert!(provider.history().items().is_empty());
    }

    #[test]
    fn failure_status_keeps_key_case() {
        let store = two_buckets();
        store.put("a", "Report.PDF", b"pdf");
        let Fixture { mut provider, .. } = fixture(store);
        // a/: ../, logs/, Report.PDF, x.txt
        press(&mut provider, "lj");
        provider.store().remove("a", "Report.PDF");
        press(&mut provider, "w");
        assert!(provider.status().starts_with("download failed."));
        assert!(provider.status().contains("a/Report.PDF"));
    }

    #[test]
    fn launch_failure_is_recoverable() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        provider.launcher.failing = true;
        press(&mut provider, "ljo");
        assert!(provider.status().starts_with("open failed."));
        assert_eq!(provider.mode(), Mode::List);
    }

    #[test]
    fn reload_refreshes_entries_and_clamps_cursor() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        press(&mut provider, "lj");
        provider.store().remove("a", "x.txt");
        press(&mut provider, "r");
        assert_eq!(provider.tree().node(provider.current()).entries().len(), 2);
        assert_eq!(provider.list().cursor(), 1);
        assert_eq!(provider.status(), "reload.");
    }

    #[test]
    fn half_page_moves_by_half_the_terminal() {
        let store = MemoryStore::new();
        for i in 0..40 {
            store.put("a", &format!("f{:02}", i), b"x");
        }
        let Fixture { mut provider, .. } = fixture(store);
        press(&mut provider, "l");
        provider.handle(InputEvent::key(NamedKey::Ctrl('d'))).unwrap();
        assert_eq!(provider.list().cursor(), 13);
        provider.resize(80, 10);
        provider.handle(InputEvent::key(NamedKey::Ctrl('u'))).unwrap();
        assert_eq!(provider.list().cursor(), 8);
    }

    #[test]
    fn draws_navigation_list_and_status() {
        let Fixture { mut provider, .. } = fixture(two_buckets());
        let mut grid = Grid::new(40, 6);
        provider.resize(40, 6);
        provider.draw(&mut grid);
        assert_eq!(grid.row(0), "list bucket");
        assert_eq!(grid.row(1), "a");
        assert_eq!(grid.row(2), "b");

        press(&mut provider, "lj");
        let mut grid = Grid::new(40, 6);
        provider.draw(&mut grid);
        assert_eq!(grid.row(0), "s3://a");
        assert_eq!(grid.row(3), "x.txt");

        press(&mut provider, "kl");
        let mut grid = Grid::new(40, 6);
        provider.draw(&mut grid);
        assert_eq!(grid.row(0), "s3://a/logs/");
        assert_eq!(grid.row(2), "app.log");
    }
}
