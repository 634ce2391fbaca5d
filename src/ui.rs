#![forbid(unsafe_code)]

use ftui::{Frame, PackedRgba};

use crate::views::{Canvas, Ink};

#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    pub screen_bg: PackedRgba,
    pub text_fg: PackedRgba,
    pub container_fg: PackedRgba,
    pub cursor_bg: PackedRgba,
    pub cursor_fg: PackedRgba,
    pub bar_bg: PackedRgba,
    pub bar_fg: PackedRgba,
}

impl ThemeColors {
    pub fn classic() -> Self {
        Self {
            screen_bg: PackedRgba::rgb(0, 0, 0),
            text_fg: PackedRgba::rgb(170, 170, 170),   // light gray
            container_fg: PackedRgba::rgb(0, 170, 0),  // green
            cursor_bg: PackedRgba::rgb(0, 170, 0),
            cursor_fg: PackedRgba::rgb(255, 255, 255),
            bar_bg: PackedRgba::rgb(0, 0, 170),        // dark blue
            bar_fg: PackedRgba::rgb(255, 255, 255),
        }
    }

    /// Foreground and background for an ink role.
    pub fn colors(&self, ink: Ink) -> (PackedRgba, PackedRgba) {
        match ink {
            Ink::Plain => (self.text_fg, self.screen_bg),
            Ink::Container => (self.container_fg, self.screen_bg),
            Ink::Cursor => (self.cursor_fg, self.cursor_bg),
            Ink::Bar => (self.bar_fg, self.bar_bg),
        }
    }
}

/// Draws view output straight into the frame buffer.
pub struct FrameCanvas<'f, 'p> {
    frame: &'f mut Frame<'p>,
    theme: ThemeColors,
}

impl<'f, 'p> FrameCanvas<'f, 'p> {
    pub fn new(frame: &'f mut Frame<'p>, theme: ThemeColors) -> Self {
        Self { frame, theme }
    }

    /// Paints every cell with the screen background.
    pub fn clear(&mut self) {
        let (width, height) = (self.frame.width(), self.frame.height());
        for y in 0..height {
            for x in 0..width {
                self.put(x, y, ' ', Ink::Plain);
            }
        }
    }
}

impl Canvas for FrameCanvas<'_, '_> {
    fn put(&mut self, x: u16, y: u16, ch: char, ink: Ink) {
        let (fg, bg) = self.theme.colors(ink);
        if let Some(cell) = self.frame.buffer.get_mut(x, y) {
            *cell = ftui::Cell::from_char(ch);
            cell.fg = fg;
            cell.bg = bg;
        }
    }
}
