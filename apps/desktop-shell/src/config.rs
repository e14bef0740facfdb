//! Command-line and environment configuration

use std::path::PathBuf;

use clap::Parser;

use crate::platform::{PlatformInfo, PlatformKind, WindowMode};
use crate::rating::RatingConfig;

/// Terminal desktop shell
#[derive(Parser, Debug, Clone)]
#[command(name = "desktop-shell")]
#[command(about = "A desktop shell with auth sync, lock screen and a rating prompt")]
pub struct ShellConfig {
    /// Platform to behave as (defaults to the build target)
    #[arg(long, value_enum, default_value_t = PlatformKind::current())]
    pub platform: PlatformKind,

    /// Which window this process renders
    #[arg(long, value_enum, default_value_t = WindowMode::Main)]
    pub window_mode: WindowMode,

    /// Let the OS draw the title bar
    #[arg(long, env = "DESKTOP_SHELL_SYSTEM_TITLE_BAR")]
    pub system_title_bar: bool,

    /// This build is distributed through the app store (enables the rating prompt)
    #[arg(long, env = "DESKTOP_SHELL_RESTRICTED_CHANNEL")]
    pub restricted_channel: bool,

    /// Product name shown in the chrome and the rating prompt
    #[arg(long, default_value = "Desktop Shell")]
    pub app_name: String,

    /// App store id used for the review link
    #[arg(long, env = "DESKTOP_SHELL_MAS_ID", default_value = "0")]
    pub mac_app_store_id: String,

    /// Preferences file (defaults to the platform config dir)
    #[arg(long, env = "DESKTOP_SHELL_PREFS")]
    pub prefs_path: Option<PathBuf>,

    /// Account backend base URL; without it profiles come from the local provider
    #[arg(long, env = "DESKTOP_SHELL_AUTH_URL")]
    pub auth_url: Option<String>,

    /// Start with dark colors
    #[arg(long)]
    pub dark: bool,

    /// Log file (defaults to the platform cache dir)
    #[arg(long, env = "DESKTOP_SHELL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ShellConfig {
    pub fn platform_info(&self) -> PlatformInfo {
        PlatformInfo {
            kind: self.platform,
            window_mode: self.window_mode,
            use_system_title_bar: self.system_title_bar,
        }
    }

    pub fn rating_config(&self) -> RatingConfig {
        RatingConfig {
            app_name: self.app_name.clone(),
            mac_app_store_id: self.mac_app_store_id.clone(),
        }
    }

    /// Explicit path, else the default location. `None` keeps preferences in
    /// memory.
    pub fn preferences_path(&self) -> Option<PathBuf> {
        self.prefs_path
            .clone()
            .or_else(crate::preferences::JsonFilePreferences::default_path)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.clone().or_else(|| {
            dirs::cache_dir().map(|dir| dir.join("desktop-shell").join("desktop-shell.log"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::parse_from(["desktop-shell"]);
        assert_eq!(config.window_mode, WindowMode::Main);
        assert_eq!(config.platform, PlatformKind::current());
        assert_eq!(config.app_name, "Desktop Shell");
        assert_eq!(config.log_level, "info");
        assert!(config.auth_url.is_none());
    }

    #[test]
    fn test_flags() {
        let config = ShellConfig::parse_from([
            "desktop-shell",
            "--platform",
            "windows",
            "--window-mode",
            "about",
            "--system-title-bar",
            "--restricted-channel",
            "--app-name",
            "Notes",
            "--mac-app-store-id",
            "42",
            "--prefs-path",
            "/tmp/prefs.json",
        ]);

        assert_eq!(
            config.platform_info(),
            PlatformInfo {
                kind: PlatformKind::Windows,
                window_mode: WindowMode::About,
                use_system_title_bar: true,
            }
        );
        assert!(config.restricted_channel);
        assert_eq!(
            config.rating_config(),
            RatingConfig {
                app_name: "Notes".into(),
                mac_app_store_id: "42".into(),
            }
        );
        assert_eq!(
            config.preferences_path(),
            Some(PathBuf::from("/tmp/prefs.json"))
        );
    }
}
