//! Application configuration
//!
//! Loaded once from `gale.toml` and passed by value into the startup
//! sequencer. Paths are looked up by logical key; settings are looked up
//! with a caller-supplied default.
//!
//! ```toml
//! [paths]
//! log_file = "logs/gale.log"
//! gif_dir = "resources/gifs"
//!
//! [settings]
//! splash_duration = 2500
//! splash_background_color = "#1E2A38"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "GALE_CONFIG";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "gale.toml";

/// Logical path keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKey {
    LogFile,
    IconsDir,
    GifDir,
    DataDir,
    UpdateManifest,
    UsersFile,
}

impl PathKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathKey::LogFile => "log_file",
            PathKey::IconsDir => "icons_dir",
            PathKey::GifDir => "gif_dir",
            PathKey::DataDir => "data_dir",
            PathKey::UpdateManifest => "update_manifest",
            PathKey::UsersFile => "users_file",
        }
    }

    fn default_relative(&self) -> &'static str {
        match self {
            PathKey::LogFile => "logs/gale.log",
            PathKey::IconsDir => "resources/icons",
            PathKey::GifDir => "resources/gifs",
            PathKey::DataDir => "data",
            PathKey::UpdateManifest => "updates/latest.toml",
            PathKey::UsersFile => "users.toml",
        }
    }
}

/// Data files that live in the data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFile {
    TurbineInfo,
}

impl DataFile {
    pub fn file_name(&self) -> &'static str {
        match self {
            DataFile::TurbineInfo => "turbine_info.csv",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    paths: HashMap<String, PathBuf>,
    #[serde(default)]
    settings: toml::Table,
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    paths: HashMap<String, PathBuf>,
    settings: toml::Table,
}

impl Config {
    /// Configuration with every key at its default, rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: HashMap::new(),
            settings: toml::Table::new(),
        }
    }

    /// Parse a config document; relative paths resolve against `root`
    pub fn from_toml_str(contents: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(Self {
            root: root.into(),
            paths: file.paths,
            settings: file.settings,
        })
    }

    /// Load a config file; its directory becomes the root
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml_str(&contents, root)
    }

    /// Locate and load the configuration for this process
    ///
    /// Order: `GALE_CONFIG`, then `gale.toml` in the platform config
    /// directory, then defaults rooted at the platform data directory.
    pub fn discover() -> Result<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            tracing::info!(path = %explicit, "Loading configuration from {}", CONFIG_ENV);
            return Self::load(Path::new(&explicit));
        }

        let dirs = ProjectDirs::from("dev", "gale", "gale").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine configuration directory",
            ))
        })?;

        let candidate = dirs.config_dir().join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::info!(path = %candidate.display(), "Loading configuration");
            return Self::load(&candidate);
        }

        tracing::info!(
            root = %dirs.data_dir().display(),
            "No configuration file found, using defaults"
        );
        Ok(Self::with_root(dirs.data_dir()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path key
    pub fn path(&self, key: PathKey) -> PathBuf {
        let configured = self
            .paths
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(key.default_relative()));
        if configured.is_absolute() {
            configured
        } else {
            self.root.join(configured)
        }
    }

    pub fn data_file_path(&self, file: DataFile) -> PathBuf {
        self.path(PathKey::DataDir).join(file.file_name())
    }

    /// Typed setting lookup; missing or mistyped values yield `default`
    pub fn setting<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.settings.get(key) {
            None => default,
            Some(value) => match value.clone().try_into::<T>() {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(key, error = %e, "Ignoring invalid setting");
                    default
                }
            },
        }
    }

    /// Override a setting (used when composing configs in code)
    pub fn set_setting(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.settings.insert(key.to_string(), value.into());
    }

    pub fn set_path(&mut self, key: PathKey, path: impl Into<PathBuf>) {
        self.paths.insert(key.as_str().to_string(), path.into());
    }
}

/// An sRGB color parsed from `#RRGGBB` or `#RGB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        red: 0xFF,
        green: 0xFF,
        blue: 0xFF,
    };
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidData(format!("Invalid color value: {s}"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Rgb {
                red: channel(&hex[0..2])?,
                green: channel(&hex[2..4])?,
                blue: channel(&hex[4..6])?,
            }),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Rgb {
                    red: short(0)?,
                    green: short(1)?,
                    blue: short(2)?,
                })
            }
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_under_root() {
        let config = Config::with_root("/opt/gale");
        assert_eq!(
            config.path(PathKey::LogFile),
            PathBuf::from("/opt/gale/logs/gale.log")
        );
        assert_eq!(
            config.data_file_path(DataFile::TurbineInfo),
            PathBuf::from("/opt/gale/data/turbine_info.csv")
        );
    }

    #[test]
    fn configured_paths_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [paths]
            gif_dir = "assets/anim"
            log_file = "/var/log/gale.log"
            "#,
            "/opt/gale",
        )
        .unwrap();

        assert_eq!(
            config.path(PathKey::GifDir),
            PathBuf::from("/opt/gale/assets/anim")
        );
        assert_eq!(
            config.path(PathKey::LogFile),
            PathBuf::from("/var/log/gale.log")
        );
    }

    #[test]
    fn settings_fall_back_to_default() {
        let config = Config::from_toml_str(
            r#"
            [settings]
            splash_duration = 3500
            splash_border_radius = "round"
            "#,
            ".",
        )
        .unwrap();

        assert_eq!(config.setting("splash_duration", 2000u64), 3500);
        assert_eq!(config.setting("splash_border_radius", 10u32), 10);
        assert_eq!(
            config.setting("splash_background_color", "#FFFFFF".to_string()),
            "#FFFFFF"
        );
    }

    #[test]
    fn load_uses_file_directory_as_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&file, "[settings]\nrequire_branding = false\n").unwrap();

        let config = Config::load(&file).unwrap();
        assert_eq!(config.root(), dir.path());
        assert!(!config.setting("require_branding", true));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let result = Config::from_toml_str("[paths\nlog_file = 1", ".");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn parse_colors() {
        assert_eq!("#FFFFFF".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!(
            "#1e2A38".parse::<Rgb>().unwrap(),
            Rgb {
                red: 0x1E,
                green: 0x2A,
                blue: 0x38
            }
        );
        assert_eq!(
            "#0f0".parse::<Rgb>().unwrap(),
            Rgb {
                red: 0,
                green: 0xFF,
                blue: 0
            }
        );
        assert!("white".parse::<Rgb>().is_err());
        assert!("#12345".parse::<Rgb>().is_err());
    }
}
