//! Update check against a published release manifest
//!
//! ```toml
//! version = "1.3.0"
//! notes = "Faster SCADA import"
//! url = "https://example.invalid/gale/1.3.0"
//! ```

use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct ReleaseManifest {
    version: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available {
        latest: Version,
        notes: Option<String>,
        url: Option<String>,
    },
    NoManifest,
}

pub struct UpdateChecker {
    manifest: PathBuf,
    current: Version,
}

impl UpdateChecker {
    pub fn new(manifest: impl Into<PathBuf>, current_version: &str) -> Result<Self> {
        Ok(Self {
            manifest: manifest.into(),
            current: Version::parse(current_version)?,
        })
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    pub fn check(&self) -> Result<UpdateStatus> {
        let contents = match std::fs::read_to_string(&self.manifest) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.manifest.display(), "No release manifest");
                return Ok(UpdateStatus::NoManifest);
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: ReleaseManifest = toml::from_str(&contents)?;
        let latest = Version::parse(manifest.version.trim())?;
        if latest > self.current {
            Ok(UpdateStatus::Available {
                latest,
                notes: manifest.notes,
                url: manifest.url,
            })
        } else {
            Ok(UpdateStatus::UpToDate)
        }
    }
}
