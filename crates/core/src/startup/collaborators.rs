//! Collaborator seams consumed by the startup pipeline
//!
//! The binary implements these with Slint windows and native dialogs;
//! tests implement them with in-memory fakes.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthService;
use crate::config::Rgb;
use crate::data::Dataset;
use crate::error::Result;
use crate::logbook::{resolve_operator, LogBook, LogContext};

use super::signal::CompletionSignal;

/// User-facing message dialogs
pub trait Notifier {
    /// Blocking error notification before exit
    fn critical(&self, title: &str, message: &str);
    /// Degraded-functionality warning; startup continues
    fn warning(&self, title: &str, message: &str);
    fn info(&self, title: &str, message: &str);
}

/// The facility (wind park) selection control
pub trait FacilitySelector {
    fn current_facility(&self) -> Result<Option<String>>;
}

/// Any view that follows the selected facility
pub trait FacilityView {
    fn show_facility(&self, facility: &str) -> Result<()>;
}

/// Main window shell
pub trait MainWindow {
    fn show(&self) -> Result<()>;

    /// Attach the authentication service; false when unsupported
    fn bind_auth_service(&self, _auth: Arc<AuthService>) -> Result<bool> {
        Ok(false)
    }

    fn check_for_updates(&self) -> Result<()>;

    fn facility_selector(&self) -> &dyn FacilitySelector;

    fn dashboard(&self) -> &dyn FacilityView;

    fn import_view(&self) -> Option<&dyn FacilityView> {
        None
    }

    fn title_bar(&self) -> &dyn FacilityView;
}

/// Loading screen appearance and assets
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingScreenConfig {
    pub asset_dir: PathBuf,
    pub version_label: String,
    pub logo: Option<PathBuf>,
    pub duration: Duration,
    pub background: Rgb,
    pub corner_radius: f32,
}

pub trait LoadingScreen {
    /// Completion signal fired when the screen has closed itself
    fn completion(&self) -> &CompletionSignal;

    /// Make the screen visible; must neither block until it closes nor
    /// fire the completion signal before returning
    fn show(&self) -> Result<()>;
}

/// Inputs for building the main window
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub dataset: Dataset,
    pub icon: Option<PathBuf>,
}

pub trait UiFactory {
    fn main_window(&self, spec: WindowSpec) -> Result<Rc<dyn MainWindow>>;

    fn loading_screen(&self, config: LoadingScreenConfig) -> Result<Box<dyn LoadingScreen>>;
}

/// Establishes the process-wide log book
pub trait LoggingBackend {
    fn open(&self, log_file: &Path) -> Result<LogContext>;
}

/// File log book attributed to the current operator
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLogging;

impl LoggingBackend for FileLogging {
    fn open(&self, log_file: &Path) -> Result<LogContext> {
        let book = LogBook::open(log_file)?;
        Ok(LogContext::new(Arc::new(book), resolve_operator()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("gale.log");

        let ctx = FileLogging.open(&path).unwrap();
        ctx.info("Application Startup", "hello");

        assert!(!ctx.operator().is_empty());
        // Dropping the last handle flushes the writer
        drop(ctx);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Application Startup | hello"));
    }
}
