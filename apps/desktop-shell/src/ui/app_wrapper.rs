//! Top-level window chrome
//!
//! Lays out the optional title bar, then either the lock screen or the main
//! content, a key hint line, and any pending dialog on top.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use super::{
    Component, ConfirmDialogProps, ConfirmDialogView, RatingButton, RatingButtonProps,
    ShellCommand, Theme,
};
use crate::platform::{ConfirmDialog, WindowMode};
use crate::render_gate::{Content, RenderDecision};
use crate::state::{AppState, UserState};

#[derive(Debug, Default)]
pub struct AppWrapper {
    rating: RatingButton,
    dialog: ConfirmDialogView,
}

pub struct AppWrapperProps<'a> {
    pub state: &'a AppState,
    pub decision: RenderDecision,
    pub window_mode: WindowMode,
    pub app_name: &'a str,
    pub rating_visible: bool,
    pub dialog: Option<&'a ConfirmDialog>,
}

impl AppWrapperProps<'_> {
    fn theme(&self) -> Theme {
        Theme::for_dark_colors(self.state.general.should_use_dark_colors)
    }
}

impl Component<ShellCommand> for AppWrapper {
    type Props<'a> = AppWrapperProps<'a>;

    fn handle_event(
        &mut self,
        key: &KeyEvent,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = ShellCommand> {
        let theme = props.theme();
        if let Some(dialog) = props.dialog {
            let props = ConfirmDialogProps { dialog, theme };
            return self
                .dialog
                .handle_event(key, props)
                .into_iter()
                .collect::<Vec<_>>();
        }

        let command = match (props.decision.content, key.code) {
            (_, KeyCode::Char('q')) => Some(ShellCommand::Quit),
            (Content::LockScreen, KeyCode::Char('u')) => Some(ShellCommand::Unlock),
            (Content::LockScreen, _) => None,
            (Content::Main, KeyCode::Char('f')) => Some(ShellCommand::ToggleFullScreen),
            (Content::Main, KeyCode::Char('d')) => Some(ShellCommand::ToggleDarkColors),
            (Content::Main, KeyCode::Char('l')) => Some(ShellCommand::Lock),
            (Content::Main, KeyCode::Char('i')) => Some(ShellCommand::SignIn),
            (Content::Main, KeyCode::Char('o')) => Some(ShellCommand::SignOut),
            (Content::Main, KeyCode::Char('r')) => {
                let rating = RatingButtonProps {
                    visible: props.rating_visible,
                    app_name: props.app_name,
                    theme,
                };
                self.rating.handle_event(key, rating).into_iter().next()
            }
            (Content::Main, _) => None,
        };
        command.into_iter().collect::<Vec<_>>()
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let theme = props.theme();
        frame.render_widget(Block::default().style(theme.base()), area);

        let title_height = u16::from(props.decision.show_title_bar);
        let [title_area, body_area, hint_area] = Layout::vertical([
            Constraint::Length(title_height),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if props.decision.show_title_bar {
            render_title_bar(frame, title_area, &props, theme);
        }

        match props.decision.content {
            Content::LockScreen => render_lock_screen(frame, body_area, theme),
            Content::Main => self.render_main(frame, body_area, &props, theme),
        }

        render_hints(frame, hint_area, &props, theme);

        if let Some(dialog) = props.dialog {
            self.dialog
                .render(frame, area, ConfirmDialogProps { dialog, theme });
        }
    }
}

impl AppWrapper {
    fn render_main(&mut self, frame: &mut Frame, area: Rect, props: &AppWrapperProps<'_>, theme: Theme) {
        let mut title = format!(" {} ", props.app_name);
        if props.decision.show_window_title && !props.decision.show_title_bar {
            title = format!(" {} ", props.window_mode.title());
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.hint())
            .title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [info_area, rating_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

        let general = &props.state.general;
        let account = match props.state.user.as_ref() {
            UserState::Unresolved => "checking...".to_string(),
            UserState::SignedOut => "signed out".to_string(),
            UserState::SignedIn(profile) => format!("signed in as {}", profile.label()),
        };
        let lines = vec![
            field("Account", account, theme),
            field("Full screen", on_off(general.is_full_screen), theme),
            field(
                "Appearance",
                if general.should_use_dark_colors { "dark" } else { "light" }.to_string(),
                theme,
            ),
        ];
        frame.render_widget(Paragraph::new(lines), info_area);

        self.rating.render(
            frame,
            rating_area,
            RatingButtonProps {
                visible: props.rating_visible,
                app_name: props.app_name,
                theme,
            },
        );
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect, props: &AppWrapperProps<'_>, theme: Theme) {
    let mut spans = vec![Span::styled(
        format!(" {}", props.app_name),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if props.decision.show_window_title {
        spans.push(Span::raw(format!(" | {}", props.window_mode.title())));
    }
    if let Some(profile) = props.state.user.profile() {
        spans.push(Span::styled(format!("  ({})", profile.label()), theme.hint()));
    }
    let bar = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(theme.fg).bg(theme.chrome_bg));
    frame.render_widget(bar, area);
}

fn render_lock_screen(frame: &mut Frame, area: Rect, theme: Theme) {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(2),
        Constraint::Fill(1),
    ])
    .areas(area);
    let text = vec![
        Line::from(Span::styled("Locked", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled("press u to unlock", theme.hint())),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), middle);
}

fn render_hints(frame: &mut Frame, area: Rect, props: &AppWrapperProps<'_>, theme: Theme) {
    let keys: &[(&str, &str)] = if props.dialog.is_some() {
        &[("enter", "confirm"), ("esc", "cancel")]
    } else if props.decision.content == Content::LockScreen {
        &[("u", "unlock"), ("q", "quit")]
    } else {
        &[
            ("f", "full screen"),
            ("d", "theme"),
            ("l", "lock"),
            ("i", "sign in"),
            ("o", "sign out"),
            ("q", "quit"),
        ]
    };
    let mut spans = Vec::new();
    for (key, label) in keys {
        spans.push(Span::styled(format!(" {key}"), theme.key()));
        spans.push(Span::styled(format!(" {label} "), theme.hint()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn field(name: &str, value: String, theme: Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{name:>12}: "), theme.hint()),
        Span::raw(value),
    ])
}

fn on_off(on: bool) -> String {
    if on { "on" } else { "off" }.to_string()
}
