//! Display server detection
//!
//! Gale needs a graphical session for both the loading screen and the
//! main window. Detection only informs the log; Slint makes the final call.

use std::env;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Wayland,
    X11,
    /// Windows, macOS, or any platform without an X11/Wayland split
    Native,
    Headless,
}

impl DisplayServer {
    pub fn detect() -> Self {
        Self::from_env(|key| env::var(key).ok())
    }

    fn from_env(var: impl Fn(&str) -> Option<String>) -> Self {
        if !cfg!(all(unix, not(target_os = "macos"))) {
            return DisplayServer::Native;
        }
        if var("WAYLAND_DISPLAY").is_some() {
            DisplayServer::Wayland
        } else if var("DISPLAY").is_some() {
            DisplayServer::X11
        } else {
            DisplayServer::Headless
        }
    }
}

impl fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayServer::Wayland => write!(f, "Wayland"),
            DisplayServer::X11 => write!(f, "X11"),
            DisplayServer::Native => write!(f, "Native"),
            DisplayServer::Headless => write!(f, "Headless"),
        }
    }
}

pub fn log_platform_info() {
    let display_server = DisplayServer::detect();
    match display_server {
        DisplayServer::Headless => {
            tracing::warn!("No display server detected, window creation will likely fail")
        }
        _ => tracing::info!(display_server = %display_server, "Display server detected"),
    }

    if let Ok(backend) = env::var("SLINT_BACKEND") {
        tracing::info!(backend = %backend, "Slint backend override");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(all(unix, not(target_os = "macos")))]
    fn wayland_takes_precedence() {
        let detected = DisplayServer::from_env(|key| match key {
            "WAYLAND_DISPLAY" => Some("wayland-0".to_string()),
            "DISPLAY" => Some(":0".to_string()),
            _ => None,
        });
        assert_eq!(detected, DisplayServer::Wayland);
    }

    #[test]
    #[cfg(all(unix, not(target_os = "macos")))]
    fn no_session_is_headless() {
        assert_eq!(DisplayServer::from_env(|_| None), DisplayServer::Headless);
    }
}
