//! Animated loading screen
//!
//! Frames are the image files in the asset directory, played in file-name
//! order. The screen hides itself after the configured duration and then
//! fires its completion signal.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use gale_core::{CompletionSignal, Error, LoadingScreen, LoadingScreenConfig, Result};
use slint::{Color, ComponentHandle, Image, Timer, TimerMode};

use crate::SplashScreen;

const FRAME_INTERVAL: Duration = Duration::from_millis(100);
const FRAME_EXTENSIONS: [&str; 5] = ["gif", "png", "jpg", "jpeg", "svg"];

/// Image files in `dir`, sorted by name
pub fn frame_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

/// Decode the splash logo; an undecodable file means no branding
pub fn load_logo(path: &Path) -> Option<Image> {
    match Image::load_from_path(path) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = ?e, "Splash logo could not be loaded, continuing without it");
            None
        }
    }
}

pub struct SlintLoadingScreen {
    component: SplashScreen,
    signal: CompletionSignal,
    frames: Rc<Vec<Image>>,
    duration: Duration,
    animation: Rc<Timer>,
    close: Timer,
}

impl SlintLoadingScreen {
    pub fn new(config: LoadingScreenConfig) -> Result<Self> {
        let component = SplashScreen::new().map_err(|e| Error::Ui(e.to_string()))?;

        let background = config.background;
        component.set_background_color(Color::from_rgb_u8(
            background.red,
            background.green,
            background.blue,
        ));
        component.set_corner_radius(config.corner_radius);
        component.set_version_text(config.version_label.as_str().into());

        if let Some(image) = config.logo.as_deref().and_then(load_logo) {
            component.set_logo(image);
        }

        let frames: Vec<Image> = frame_paths(&config.asset_dir)?
            .iter()
            .filter_map(|path| match Image::load_from_path(path) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = ?e, "Skipping animation frame");
                    None
                }
            })
            .collect();
        if let Some(first) = frames.first() {
            component.set_frame(first.clone());
        } else {
            tracing::warn!(dir = %config.asset_dir.display(), "No animation frames found");
        }

        Ok(Self {
            component,
            signal: CompletionSignal::new(),
            frames: Rc::new(frames),
            duration: config.duration,
            animation: Rc::new(Timer::default()),
            close: Timer::default(),
        })
    }
}

impl LoadingScreen for SlintLoadingScreen {
    fn completion(&self) -> &CompletionSignal {
        &self.signal
    }

    fn show(&self) -> Result<()> {
        self.component.show().map_err(|e| Error::Ui(e.to_string()))?;

        if self.frames.len() > 1 {
            let frames = self.frames.clone();
            let index = Cell::new(0usize);
            let handle = self.component.as_weak();
            self.animation.start(TimerMode::Repeated, FRAME_INTERVAL, move || {
                let next = (index.get() + 1) % frames.len();
                index.set(next);
                if let Some(splash) = handle.upgrade() {
                    splash.set_frame(frames[next].clone());
                }
            });
        }

        let animation = self.animation.clone();
        let signal = self.signal.clone();
        let handle = self.component.as_weak();
        self.close.start(TimerMode::SingleShot, self.duration, move || {
            animation.stop();
            if let Some(splash) = handle.upgrade() {
                if let Err(e) = splash.hide() {
                    tracing::warn!("Failed to hide loading screen: {}", e);
                }
            }
            signal.fire();
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_sorted_images_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_02.png", "frame_01.PNG", "notes.txt", "frame_03.gif"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = frame_paths(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_01.PNG", "frame_02.png", "frame_03.gif"]);
    }

    #[test]
    fn undecodable_logo_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("splash_icon.png");
        std::fs::write(&logo, b"not an image").unwrap();

        assert!(load_logo(&logo).is_none());
        assert!(load_logo(&dir.path().join("absent.png")).is_none());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = frame_paths(&dir.path().join("absent")).unwrap_err();
        assert!(err.is_not_found());
    }
}
