//! What the root view shows, derived from the tree and the host platform

use crate::platform::{PlatformInfo, PlatformKind, WindowMode};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderInputs {
    pub locked: bool,
    pub window_mode: WindowMode,
    pub is_full_screen: bool,
    pub use_system_title_bar: bool,
    pub platform: PlatformKind,
}

impl RenderInputs {
    pub fn from_state(state: &AppState, info: &PlatformInfo) -> Self {
        Self {
            locked: state.general.locked,
            window_mode: info.window_mode,
            is_full_screen: state.general.is_full_screen,
            use_system_title_bar: info.use_system_title_bar,
            platform: info.kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    LockScreen,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDecision {
    /// Draw the shell's own title bar
    pub show_title_bar: bool,
    /// Put the window name in the chrome (auxiliary windows only)
    pub show_window_title: bool,
    pub content: Content,
}

/// The About window is never locked. The custom title bar is only drawn off
/// macOS, outside full screen, and when the system title bar is not used.
pub fn render_decision(inputs: &RenderInputs) -> RenderDecision {
    let locked = inputs.window_mode != WindowMode::About && inputs.locked;
    let show_title_bar = inputs.platform != PlatformKind::Mac
        && !inputs.is_full_screen
        && !inputs.use_system_title_bar;

    RenderDecision {
        show_title_bar,
        show_window_title: inputs.window_mode != WindowMode::Main,
        content: if locked {
            Content::LockScreen
        } else {
            Content::Main
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> RenderInputs {
        RenderInputs {
            locked: false,
            window_mode: WindowMode::Main,
            is_full_screen: false,
            use_system_title_bar: false,
            platform: PlatformKind::Linux,
        }
    }

    #[test]
    fn test_locked_main_window_shows_lock_screen() {
        let decision = render_decision(&RenderInputs {
            locked: true,
            ..inputs()
        });
        assert_eq!(decision.content, Content::LockScreen);
    }

    #[test]
    fn test_about_window_ignores_lock() {
        let decision = render_decision(&RenderInputs {
            locked: true,
            window_mode: WindowMode::About,
            ..inputs()
        });
        assert_eq!(decision.content, Content::Main);
        assert!(decision.show_window_title);
    }

    #[test]
    fn test_preferences_window_still_locks() {
        let decision = render_decision(&RenderInputs {
            locked: true,
            window_mode: WindowMode::Preferences,
            ..inputs()
        });
        assert_eq!(decision.content, Content::LockScreen);
    }

    #[test]
    fn test_title_bar_rules() {
        assert!(render_decision(&inputs()).show_title_bar);
        assert!(!render_decision(&inputs()).show_window_title);

        for hidden in [
            RenderInputs {
                platform: PlatformKind::Mac,
                ..inputs()
            },
            RenderInputs {
                is_full_screen: true,
                ..inputs()
            },
            RenderInputs {
                use_system_title_bar: true,
                ..inputs()
            },
        ] {
            assert!(!render_decision(&hidden).show_title_bar, "{hidden:?}");
        }

        assert!(
            render_decision(&RenderInputs {
                platform: PlatformKind::Windows,
                ..inputs()
            })
            .show_title_bar
        );
    }

    #[test]
    fn test_from_state() {
        let state = AppState::new(
            crate::state::GeneralState {
                is_full_screen: true,
                locked: true,
                should_use_dark_colors: false,
            },
            Default::default(),
        );
        let info = PlatformInfo {
            kind: PlatformKind::Windows,
            window_mode: WindowMode::About,
            use_system_title_bar: false,
        };
        assert_eq!(
            RenderInputs::from_state(&state, &info),
            RenderInputs {
                locked: true,
                window_mode: WindowMode::About,
                is_full_screen: true,
                use_system_title_bar: false,
                platform: PlatformKind::Windows,
            }
        );
    }
}
