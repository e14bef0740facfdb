use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use super::modal::{centered_rect, render_overlay, OverlayStyle};
use super::{Component, ShellCommand, Theme};
use crate::platform::ConfirmDialog;

/// Draws a pending [`ConfirmDialog`] over the window
///
/// Enter picks the default button, Esc the cancel button, and digits pick
/// buttons by their 1-based position.
#[derive(Debug, Default)]
pub struct ConfirmDialogView;

pub struct ConfirmDialogProps<'a> {
    pub dialog: &'a ConfirmDialog,
    pub theme: Theme,
}

impl Component<ShellCommand> for ConfirmDialogView {
    type Props<'a> = ConfirmDialogProps<'a>;

    fn handle_event(
        &mut self,
        key: &KeyEvent,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = ShellCommand> {
        let dialog = props.dialog;
        let button = match key.code {
            KeyCode::Enter => Some(dialog.default_id),
            KeyCode::Esc => Some(dialog.cancel_id),
            KeyCode::Char(c) => c
                .to_digit(10)
                .and_then(|n| (n as usize).checked_sub(1))
                .filter(|index| *index < dialog.buttons.len()),
            _ => None,
        };
        button.map(ShellCommand::DialogSelect)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        let theme = props.theme;
        let dialog = props.dialog;
        let modal = centered_rect(64, 10, area);
        render_overlay(frame, modal, &OverlayStyle::new(theme.chrome_bg));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme.accent))
            .title(Span::styled(
                format!(" {} ", dialog.message),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().fg(theme.fg).bg(theme.chrome_bg));
        let inner = block.inner(modal);
        frame.render_widget(block, modal);

        let [detail_area, buttons_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

        frame.render_widget(
            Paragraph::new(dialog.detail.as_str()).wrap(Wrap { trim: true }),
            detail_area,
        );

        let mut spans = Vec::new();
        for (index, label) in dialog.buttons.iter().enumerate() {
            if index > 0 {
                spans.push(Span::raw("  "));
            }
            let style = if index == dialog.default_id {
                theme.key().add_modifier(Modifier::REVERSED)
            } else {
                theme.key()
            };
            spans.push(Span::styled(format!("[{}] {label}", index + 1), style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), buttons_area);
    }
}
