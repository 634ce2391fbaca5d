#![forbid(unsafe_code)]

use std::ops::Range;

/// Screen rectangle a view draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }
}

/// Cursor and scroll state of one scrollable view.
///
/// Invariants kept after every call:
/// `cursor < max(content_len, 1)` and
/// `scroll <= cursor <= scroll + height - 1`.
#[derive(Debug, Clone, Default)]
pub struct Viewport {
    geometry: Geometry,
    cursor: usize,
    scroll: usize,
}

impl Viewport {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, cursor: 0, scroll: 0 }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    // A zero-height window still shows the cursor row.
    fn rows(&self) -> usize {
        usize::from(self.geometry.height).max(1)
    }

    fn last_visible(&self) -> usize {
        self.scroll + self.rows() - 1
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        if self.cursor > self.last_visible() {
            self.scroll = self.cursor + 1 - self.rows();
        }
    }

    pub fn move_up(&mut self, n: usize) -> usize {
        self.cursor = self.cursor.saturating_sub(n);
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        }
        tracing::debug!(cursor = self.cursor, scroll = self.scroll, "viewport up");
        self.cursor
    }

    pub fn move_down(&mut self, n: usize, content_len: usize) -> usize {
        let last = content_len.saturating_sub(1);
        self.cursor = self.cursor.saturating_add(n).min(last);
        if self.cursor < self.scroll {
            // content shrank under us
            self.scroll = self.cursor;
        }
        if self.cursor > self.last_visible() {
            self.scroll = self.cursor + 1 - self.rows();
        }
        tracing::debug!(cursor = self.cursor, scroll = self.scroll, "viewport down");
        self.cursor
    }

    pub fn half_page_up(&mut self, terminal_height: u16) -> usize {
        self.move_up(usize::from(terminal_height / 2))
    }

    pub fn half_page_down(&mut self, terminal_height: u16, content_len: usize) -> usize {
        self.move_down(usize::from(terminal_height / 2), content_len)
    }

    /// Shows new content with the cursor placed on `saved_row`, clamped into
    /// range and scrolled into view.
    pub fn reset_to(&mut self, saved_row: usize, content_len: usize) -> usize {
        self.cursor = saved_row.min(content_len.saturating_sub(1));
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        }
        self.move_down(0, content_len)
    }

    /// Screen row of content index `index`, or `None` when it is scrolled out.
    pub fn screen_row(&self, index: usize) -> Option<u16> {
        if index < self.scroll || index > self.last_visible() {
            return None;
        }
        let offset = u16::try_from(index - self.scroll).ok()?;
        if offset >= self.geometry.height {
            return None;
        }
        Some(self.geometry.y + offset)
    }

    /// Content indices currently on screen.
    pub fn visible_range(&self, content_len: usize) -> Range<usize> {
        let end = (self.scroll + usize::from(self.geometry.height)).min(content_len);
        self.scroll.min(end)..end
    }
}
