use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::{Component, ShellCommand, Theme};

/// The "rate this app" affordance in the main window
#[derive(Debug, Default)]
pub struct RatingButton;

pub struct RatingButtonProps<'a> {
    pub visible: bool,
    pub app_name: &'a str,
    pub theme: Theme,
}

impl Component<ShellCommand> for RatingButton {
    type Props<'a> = RatingButtonProps<'a>;

    fn handle_event(
        &mut self,
        key: &crossterm::event::KeyEvent,
        props: Self::Props<'_>,
    ) -> impl IntoIterator<Item = ShellCommand> {
        let pressed = matches!(key.code, crossterm::event::KeyCode::Char('r'));
        (pressed && props.visible).then_some(ShellCommand::Rate)
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>) {
        if !props.visible {
            return;
        }
        let line = Line::from(vec![
            Span::styled("[r]", props.theme.key()),
            Span::raw(format!(" Rate {}", props.app_name)),
        ]);
        frame.render_widget(Paragraph::new(line).style(props.theme.base()), area);
    }
}
