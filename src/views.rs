#![forbid(unsafe_code)]

//! Views drawn by the provider. Every scrollable view owns a [`Viewport`]
//! and draws through the [`Canvas`] capability, so nothing here knows
//! about the terminal backend.

use time::OffsetDateTime;

use crate::history::DownloadItem;
use crate::menu::MENU_ITEMS;
use crate::model::{Action, Entry, EntryKind, ListingKind, MenuItem, ObjectDetail};
use crate::viewport::{Geometry, Viewport};

/// Colour role of a cell; the backend maps it to concrete colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Plain,
    Container,
    Cursor,
    Bar,
}

pub trait Canvas {
    fn put(&mut self, x: u16, y: u16, ch: char, ink: Ink);
}

pub trait Drawable {
    fn draw(&self, canvas: &mut dyn Canvas);
}

/// Views that react to movement actions.
pub trait ActionHandler {
    /// Applies a movement action and returns the new cursor row, or `None`
    /// when the action is not a movement.
    fn handle(&mut self, action: Action, terminal_height: u16) -> Option<usize>;
}

fn apply_movement(viewport: &mut Viewport, action: Action, terminal_height: u16, len: usize) -> Option<usize> {
    match action {
        Action::Up => Some(viewport.move_up(1)),
        Action::Down => Some(viewport.move_down(1, len)),
        Action::HalfUp => Some(viewport.half_page_up(terminal_height)),
        Action::HalfDown => Some(viewport.half_page_down(terminal_height, len)),
        _ => None,
    }
}

/// Writes `text` from `x`, clipped to `width` cells and padded with spaces.
pub fn print_row(canvas: &mut dyn Canvas, x: u16, y: u16, width: u16, ink: Ink, text: &str) {
    let mut chars = text.chars();
    for offset in 0..width {
        let ch = chars.next().unwrap_or(' ');
        canvas.put(x + offset, y, ch, ink);
    }
}

fn fill(canvas: &mut dyn Canvas, geometry: Geometry, ink: Ink) {
    for row in 0..geometry.height {
        print_row(canvas, geometry.x, geometry.y + row, geometry.width, ink, "");
    }
}

fn draw_lines<S: AsRef<str>>(canvas: &mut dyn Canvas, viewport: &Viewport, lines: &[S]) {
    let geometry = viewport.geometry();
    fill(canvas, geometry, Ink::Plain);
    for index in viewport.visible_range(lines.len()) {
        let Some(y) = viewport.screen_row(index) else { continue };
        let ink = if index == viewport.cursor() { Ink::Cursor } else { Ink::Plain };
        print_row(canvas, geometry.x, y, geometry.width, ink, lines[index].as_ref());
    }
}

pub fn format_timestamp(at: Option<OffsetDateTime>) -> String {
    let Some(at) = at else {
        return "-".to_string();
    };
    let Ok(format) = time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]") else {
        return at.to_string();
    };
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    at.to_offset(offset).format(&format).unwrap_or_default()
}

/// Screen areas for a terminal of the given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub navigation: Geometry,
    pub list: Geometry,
    pub status: Geometry,
    pub menu: Geometry,
    pub detail: Geometry,
    pub history: Geometry,
}

impl Layout {
    pub fn new(width: u16, height: u16) -> Self {
        let body = height.saturating_sub(2);
        let half_width = width / 2;
        let half_height = height / 2;
        Self {
            navigation: Geometry::new(0, 0, width, 1.min(height)),
            list: Geometry::new(0, 1, width, body),
            status: Geometry::new(0, height.saturating_sub(1), width, 1.min(height)),
            menu: Geometry::new(0, half_height, width, height - half_height),
            detail: Geometry::new(half_width, 1, width - half_width, body),
            history: Geometry::new(0, 1, width, body),
        }
    }
}

/// Cursor over the entries of the current node.
#[derive(Debug)]
pub struct EntryListView {
    viewport: Viewport,
    len: usize,
}

impl EntryListView {
    pub fn new(geometry: Geometry) -> Self {
        Self { viewport: Viewport::new(geometry), len: 0 }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.viewport.set_geometry(geometry);
    }

    /// Switches to a listing of `len` entries with the cursor at `saved_row`.
    pub fn show(&mut self, len: usize, saved_row: usize) -> usize {
        self.len = len;
        self.viewport.reset_to(saved_row, len)
    }

    pub fn cursor(&self) -> usize {
        self.viewport.cursor()
    }

    /// Entry under the cursor; `None` for an empty listing.
    pub fn current<'a>(&self, entries: &'a [Entry]) -> Option<&'a Entry> {
        entries.get(self.viewport.cursor())
    }

    pub fn frame<'a>(&'a self, entries: &'a [Entry], kind: ListingKind, key: &'a str) -> EntryListFrame<'a> {
        EntryListFrame { view: self, entries, kind, key }
    }
}

impl ActionHandler for EntryListView {
    fn handle(&mut self, action: Action, terminal_height: u16) -> Option<usize> {
        apply_movement(&mut self.viewport, action, terminal_height, self.len)
    }
}

const DETAIL_COLUMNS_MIN_WIDTH: u16 = 60;

/// Object rows on wide terminals also show size and modification time.
fn row_text(label: &str, entry: &Entry, width: u16) -> String {
    match entry.size {
        Some(size) if entry.kind == EntryKind::Object && width >= DETAIL_COLUMNS_MIN_WIDTH => {
            let columns = format!("{:>10}  {}", size, format_timestamp(entry.last_modified));
            let name_width = usize::from(width).saturating_sub(columns.chars().count() + 1);
            let label: String = label.chars().take(name_width).collect();
            format!("{:<name_width$} {}", label, columns)
        }
        _ => label.to_string(),
    }
}

/// An [`EntryListView`] paired with the entries it is showing.
pub struct EntryListFrame<'a> {
    view: &'a EntryListView,
    entries: &'a [Entry],
    kind: ListingKind,
    key: &'a str,
}

impl Drawable for EntryListFrame<'_> {
    fn draw(&self, canvas: &mut dyn Canvas) {
        let viewport = &self.view.viewport;
        let geometry = viewport.geometry();
        for index in viewport.visible_range(self.entries.len()) {
            let Some(y) = viewport.screen_row(index) else { continue };
            let entry = &self.entries[index];
            let label = match (self.kind, entry.kind) {
                (ListingKind::Objects, EntryKind::Directory | EntryKind::Object) => {
                    entry.name.strip_prefix(self.key).unwrap_or(&entry.name)
                }
                _ => entry.name.as_str(),
            };
            let text = row_text(label, entry, geometry.width);
            let label = text.as_str();
            if index == viewport.cursor() {
                print_row(canvas, geometry.x, y, geometry.width, Ink::Cursor, label);
            } else {
                let ink = if entry.kind.is_container() { Ink::Container } else { Ink::Plain };
                let width = (label.chars().count() as u16).min(geometry.width);
                print_row(canvas, geometry.x, y, width, ink, label);
            }
        }
    }
}

/// Path of the current node on the top row.
#[derive(Debug)]
pub struct NavigationView {
    geometry: Geometry,
    path: String,
}

impl NavigationView {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, path: String::new() }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    pub fn set_path(&mut self, kind: ListingKind, bucket: Option<&str>, key: &str) {
        self.path = match (kind, bucket) {
            (ListingKind::Buckets, _) | (_, None) => "list bucket".to_string(),
            (ListingKind::BucketRoot, Some(bucket)) => format!("s3://{}", bucket),
            (ListingKind::Objects, Some(bucket)) => format!("s3://{}/{}", bucket, key),
        };
    }

    #[cfg(test)]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drawable for NavigationView {
    fn draw(&self, canvas: &mut dyn Canvas) {
        if self.geometry.height > 0 {
            print_row(canvas, self.geometry.x, self.geometry.y, self.geometry.width, Ink::Bar, &self.path);
        }
    }
}

#[derive(Debug)]
pub struct StatusView {
    geometry: Geometry,
    message: String,
}

impl StatusView {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, message: String::new() }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    pub fn set(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Drawable for StatusView {
    fn draw(&self, canvas: &mut dyn Canvas) {
        if self.geometry.height > 0 {
            print_row(canvas, self.geometry.x, self.geometry.y, self.geometry.width, Ink::Bar, &self.message);
        }
    }
}

/// Object operations offered from the list.
#[derive(Debug)]
pub struct MenuView {
    items: &'static [MenuItem],
    lines: Vec<String>,
    viewport: Viewport,
}

impl MenuView {
    pub fn new(geometry: Geometry) -> Self {
        let lines = MENU_ITEMS
            .iter()
            .map(|item| format!("({}){} {}", item.shorthand, item.name, item.detail))
            .collect();
        Self { items: MENU_ITEMS, lines, viewport: Viewport::new(geometry) }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.viewport.set_geometry(geometry);
    }

    pub fn current(&self) -> Option<&MenuItem> {
        self.items.get(self.viewport.cursor())
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ActionHandler for MenuView {
    fn handle(&mut self, action: Action, terminal_height: u16) -> Option<usize> {
        apply_movement(&mut self.viewport, action, terminal_height, self.items.len())
    }
}

impl Drawable for MenuView {
    fn draw(&self, canvas: &mut dyn Canvas) {
        draw_lines(canvas, &self.viewport, &self.lines);
    }
}

/// Metadata of one object.
#[derive(Debug)]
pub struct DetailView {
    lines: Vec<String>,
    viewport: Viewport,
}

impl DetailView {
    pub fn new(geometry: Geometry) -> Self {
        Self { lines: Vec::new(), viewport: Viewport::new(geometry) }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.viewport.set_geometry(geometry);
    }

    pub fn show(&mut self, detail: &ObjectDetail) {
        self.lines = vec![
            detail.key.clone(),
            String::new(),
            format!("    LastModified: {}", format_timestamp(detail.last_modified)),
            format!("    Size: {} B", detail.size),
            format!("    ETag: {}", detail.etag),
            format!("    ACL: {}", detail.acl),
        ];
        self.viewport.reset_to(0, self.lines.len());
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ActionHandler for DetailView {
    fn handle(&mut self, action: Action, terminal_height: u16) -> Option<usize> {
        apply_movement(&mut self.viewport, action, terminal_height, self.lines.len())
    }
}

impl Drawable for DetailView {
    fn draw(&self, canvas: &mut dyn Canvas) {
        draw_lines(canvas, &self.viewport, &self.lines);
    }
}

/// Completed downloads, oldest first.
#[derive(Debug)]
pub struct HistoryView {
    lines: Vec<String>,
    viewport: Viewport,
}

impl HistoryView {
    pub fn new(geometry: Geometry) -> Self {
        Self { lines: Vec::new(), viewport: Viewport::new(geometry) }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.viewport.set_geometry(geometry);
    }

    /// Refreshes the lines and keeps the cursor where it was, clamped.
    pub fn show(&mut self, items: &[DownloadItem]) {
        self.lines = items.iter().map(DownloadItem::line).collect();
        let cursor = self.viewport.cursor();
        self.viewport.reset_to(cursor, self.lines.len());
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.viewport.cursor()
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ActionHandler for HistoryView {
    fn handle(&mut self, action: Action, terminal_height: u16) -> Option<usize> {
        apply_movement(&mut self.viewport, action, terminal_height, self.lines.len())
    }
}

impl Drawable for HistoryView {
    fn draw(&self, canvas: &mut dyn Canvas) {
        draw_lines(canvas, &self.viewport, &self.lines);
    }
}
