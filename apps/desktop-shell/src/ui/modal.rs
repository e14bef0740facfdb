//! Dialog overlay: dims whatever was drawn so far, then clears a box on top

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier},
    widgets::{Clear, Widget},
    Frame,
};

/// How the area behind an overlay is drawn
#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    /// 0.0 leaves colors alone, 1.0 turns them black
    pub dim: f32,
    pub fill: Color,
}

impl OverlayStyle {
    pub fn new(fill: Color) -> Self {
        Self { dim: 0.5, fill }
    }
}

/// Call after the background has been rendered
pub fn render_overlay(frame: &mut Frame, area: Rect, style: &OverlayStyle) {
    dim_buffer(frame.buffer_mut(), style.dim);
    frame.render_widget(Clear, area);
    frame.render_widget(Fill(style.fill), area);
}

struct Fill(Color);

impl Widget for Fill {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, ratatui::style::Style::default().bg(self.0));
    }
}

/// Darken every cell in the buffer
pub fn dim_buffer(buf: &mut Buffer, factor: f32) {
    let scale = 1.0 - factor.clamp(0.0, 1.0);
    let area = buf.area;
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            let cell = &mut buf[(x, y)];
            let fg = dim_color(cell.fg, scale);
            let bg = dim_color(cell.bg, scale);
            cell.set_fg(fg);
            cell.set_bg(bg);
            cell.modifier.insert(Modifier::DIM);
        }
    }
}

/// Scale a color toward black. Indexed colors are left alone.
fn dim_color(color: Color, scale: f32) -> Color {
    let rgb = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (205, 0, 0),
        Color::Green => (0, 205, 0),
        Color::Yellow => (205, 205, 0),
        Color::Blue => (0, 0, 238),
        Color::Magenta => (205, 0, 205),
        Color::Cyan => (0, 205, 205),
        Color::Gray => (229, 229, 229),
        Color::DarkGray => (127, 127, 127),
        Color::White => (255, 255, 255),
        other => return other,
    };
    let apply = |c: u8| (f32::from(c) * scale) as u8;
    Color::Rgb(apply(rgb.0), apply(rgb.1), apply(rgb.2))
}

/// A `width` x `height` box centered in `area`, kept one cell off each edge
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}
