use ratatui::style::{Color, Modifier, Style};

/// Colors for light and dark appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub chrome_bg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 225),
            bg: Color::Rgb(24, 24, 30),
            accent: Color::Rgb(120, 170, 255),
            muted: Color::Rgb(120, 120, 130),
            chrome_bg: Color::Rgb(40, 40, 50),
        }
    }

    pub fn light() -> Self {
        Self {
            fg: Color::Rgb(30, 30, 35),
            bg: Color::Rgb(245, 245, 247),
            accent: Color::Rgb(20, 90, 200),
            muted: Color::Rgb(110, 110, 120),
            chrome_bg: Color::Rgb(220, 220, 226),
        }
    }

    pub fn for_dark_colors(dark: bool) -> Self {
        if dark {
            Self::dark()
        } else {
            Self::light()
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn key(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn hint(&self) -> Style {
        Style::default().fg(self.muted)
    }
}
