//! Terminal UI utilities for status lines and notification output.
//!
//! Handles environment detection (CI, TTY) and degrades gracefully when
//! terminal features aren't available.
//!
//! # Examples
//!
//! ```no_run
//! use expd_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Packager ready");
//! ui::error("Packager exited with code 1");
//! ```

mod messages;
mod notifications;

use std::sync::atomic::{AtomicBool, Ordering};

pub use messages::{debug, error, info, success, warning};
pub use notifications::{print_notification, render_notification, Level};

/// Check if running in a CI environment.
///
/// Detects common CI environment variables from GitHub Actions, GitLab CI,
/// CircleCI, and Travis CI.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
}

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables, falls back to
/// terminal capability detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Initialize color support based on environment.
///
/// Should be called early in `main`, after `--no-color` is known.
pub fn init_colors(no_color: bool) {
    set_colors_enabled(!no_color && should_use_color());
}

/// Force colored status lines on or off.
pub fn set_colors_enabled(enabled: bool) {
    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_is_ci_with_ci_var() {
        std::env::set_var("CI", "true");
        assert!(is_ci());
        std::env::remove_var("CI");
    }

    #[test]
    #[serial]
    fn test_should_use_color_no_color_overrides_force() {
        std::env::set_var("NO_COLOR", "1");
        std::env::set_var("FORCE_COLOR", "1");
        assert!(!should_use_color());
        std::env::remove_var("NO_COLOR");
        std::env::remove_var("FORCE_COLOR");
    }

    #[test]
    #[serial]
    fn test_should_use_color_force_color() {
        std::env::remove_var("NO_COLOR");
        std::env::set_var("FORCE_COLOR", "1");
        assert!(should_use_color());
        std::env::remove_var("FORCE_COLOR");
    }
}
