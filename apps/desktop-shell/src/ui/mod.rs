//! Terminal UI
//!
//! Components are pure functions of their props. Key presses become
//! [`ShellCommand`]s; the shell turns those into calls on its collaborators,
//! never into direct state mutation.

pub mod app_wrapper;
pub mod dialog;
pub mod modal;
pub mod rating_button;
#[cfg(test)]
pub(crate) mod testing;
pub mod theme;

use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

pub use app_wrapper::{AppWrapper, AppWrapperProps};
pub use dialog::{ConfirmDialogView, ConfirmDialogProps};
pub use rating_button::{RatingButton, RatingButtonProps};
pub use theme::Theme;

/// What a key press asks the shell to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    Quit,
    ToggleFullScreen,
    ToggleDarkColors,
    Lock,
    Unlock,
    SignIn,
    SignOut,
    Rate,
    /// Answer the open dialog with this button
    DialogSelect(usize),
}

/// A pure UI element that renders from props and maps keys to commands
///
/// Internal UI state may live in `&mut self`; everything the component shows
/// comes in through `Props`.
pub trait Component<C> {
    type Props<'a>;

    /// Map a key press to commands. Render-only components keep the default.
    #[allow(unused_variables)]
    fn handle_event(&mut self, key: &KeyEvent, props: Self::Props<'_>) -> impl IntoIterator<Item = C> {
        None::<C>
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, props: Self::Props<'_>);
}
