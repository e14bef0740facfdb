//! Helpers for rendering components into an in-memory terminal

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, Frame, Terminal};

/// Renders into a fixed-size [`TestBackend`]
pub struct RenderHarness {
    terminal: Terminal<TestBackend>,
}

impl RenderHarness {
    /// # Panics
    ///
    /// If the test backend cannot be created.
    pub fn new(width: u16, height: u16) -> Self {
        let terminal = Terminal::new(TestBackend::new(width, height))
            .expect("test backend is infallible");
        Self { terminal }
    }

    /// # Panics
    ///
    /// If drawing fails.
    pub fn render(&mut self, draw: impl FnOnce(&mut Frame)) -> &Buffer {
        self.terminal.draw(draw).expect("draw to test backend");
        self.terminal.backend().buffer()
    }

    /// Render and return the screen as text, one line per row, trailing
    /// spaces trimmed
    pub fn render_to_string_plain(&mut self, draw: impl FnOnce(&mut Frame)) -> String {
        buffer_to_string(self.render(draw))
    }
}

pub fn buffer_to_string(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            line.push_str(buf[(x, y)].symbol());
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

pub fn char_key(c: char) -> KeyEvent {
    key(KeyCode::Char(c))
}
