//! In-memory collaborators for pipeline tests

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::data::{DataManager, DataSource, Dataset, MemoryReport, Turbine};
use crate::error::{Error, Result};
use crate::logbook::{LogContext, MemorySink};

use super::collaborators::{
    FacilitySelector, FacilityView, LoadingScreen, LoadingScreenConfig, LoggingBackend,
    MainWindow, Notifier, UiFactory, WindowSpec,
};
use super::signal::CompletionSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    dialogs: RefCell<Vec<Dialog>>,
}

impl RecordingNotifier {
    fn push(&self, kind: DialogKind, title: &str, message: &str) {
        self.dialogs.borrow_mut().push(Dialog {
            kind,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    pub fn dialogs(&self) -> Vec<Dialog> {
        self.dialogs.borrow().clone()
    }

    pub fn of_kind(&self, kind: DialogKind) -> Vec<Dialog> {
        self.dialogs().into_iter().filter(|d| d.kind == kind).collect()
    }

    pub fn criticals(&self) -> Vec<Dialog> {
        self.of_kind(DialogKind::Critical)
    }

    pub fn warnings(&self) -> Vec<Dialog> {
        self.of_kind(DialogKind::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.dialogs.borrow().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn critical(&self, title: &str, message: &str) {
        self.push(DialogKind::Critical, title, message);
    }

    fn warning(&self, title: &str, message: &str) {
        self.push(DialogKind::Warning, title, message);
    }

    fn info(&self, title: &str, message: &str) {
        self.push(DialogKind::Info, title, message);
    }
}

pub fn sample_dataset(path: &Path) -> Dataset {
    let turbine = |park: &str, id: &str| Turbine {
        park: park.to_string(),
        turbine_id: id.to_string(),
        model: "V112".to_string(),
        rated_power_kw: 3450.0,
        hub_height_m: Some(94.0),
        latitude: None,
        longitude: None,
    };
    Dataset {
        turbines: vec![
            turbine("North Ridge", "NR-01"),
            turbine("North Ridge", "NR-02"),
            turbine("Coastal", "CO-01"),
        ],
        source: DataSource::File(path.to_path_buf()),
    }
}

/// Data manager whose loads fail with a scripted sequence of I/O errors
#[derive(Default)]
pub struct FakeData {
    pub load_errors: VecDeque<io::ErrorKind>,
    pub load_calls: Cell<u32>,
    pub memory_fails: bool,
    pub memory_calls: Rc<Cell<u32>>,
    pub dataset: Dataset,
}

impl FakeData {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(errors: Vec<io::ErrorKind>) -> Self {
        Self {
            load_errors: errors.into(),
            ..Self::default()
        }
    }
}

impl DataManager for FakeData {
    fn load(&mut self, path: &Path, _chunk_size: Option<usize>) -> Result<()> {
        self.load_calls.set(self.load_calls.get() + 1);
        if let Some(kind) = self.load_errors.pop_front() {
            return Err(Error::Io(io::Error::new(kind, "scripted failure")));
        }
        self.dataset = sample_dataset(path);
        Ok(())
    }

    fn create_default_data(&mut self) {
        self.dataset = Dataset::minimal_default();
    }

    fn persist(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn memory_usage(&self) -> Result<MemoryReport> {
        self.memory_calls.set(self.memory_calls.get() + 1);
        if self.memory_fails {
            return Err(Error::NotFound("process not visible".to_string()));
        }
        Ok(MemoryReport {
            process_bytes: 64 * 1024 * 1024,
            dataset_bytes: self.dataset.estimated_bytes(),
            system_used_bytes: 4 << 30,
            system_total_bytes: 16 << 30,
        })
    }
}

pub struct FakeLogging {
    pub sink: Arc<MemorySink>,
    pub fail: bool,
}

impl FakeLogging {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(MemorySink::new()),
            fail: false,
        }
    }
}

impl LoggingBackend for FakeLogging {
    fn open(&self, log_file: &Path) -> Result<LogContext> {
        if self.fail {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("cannot open {}", log_file.display()),
            )));
        }
        Ok(LogContext::new(self.sink.clone(), "tester"))
    }
}

/// Facility-following view that records what it was shown
#[derive(Default)]
pub struct RecordingView {
    pub shown: RefCell<Vec<String>>,
    pub fail: bool,
}

impl FacilityView for RecordingView {
    fn show_facility(&self, facility: &str) -> Result<()> {
        if self.fail {
            return Err(Error::Ui(format!("cannot display {facility}")));
        }
        self.shown.borrow_mut().push(facility.to_string());
        Ok(())
    }
}

pub struct FixedSelector {
    pub selection: Option<String>,
    pub fail: bool,
}

impl FacilitySelector for FixedSelector {
    fn current_facility(&self) -> Result<Option<String>> {
        if self.fail {
            return Err(Error::Ui("selection control unavailable".to_string()));
        }
        Ok(self.selection.clone())
    }
}

pub struct FakeWindow {
    pub shown: Cell<bool>,
    pub supports_auth: bool,
    pub auth: RefCell<Option<Arc<AuthService>>>,
    pub update_fails: bool,
    pub update_panics: bool,
    pub update_checks: Cell<u32>,
    pub selector: FixedSelector,
    pub dashboard: RecordingView,
    pub import: Option<RecordingView>,
    pub title: RecordingView,
    pub spec: RefCell<Option<WindowSpec>>,
}

impl Default for FakeWindow {
    fn default() -> Self {
        Self {
            shown: Cell::new(false),
            supports_auth: true,
            auth: RefCell::new(None),
            update_fails: false,
            update_panics: false,
            update_checks: Cell::new(0),
            selector: FixedSelector {
                selection: Some("North Ridge".to_string()),
                fail: false,
            },
            dashboard: RecordingView::default(),
            import: Some(RecordingView::default()),
            title: RecordingView::default(),
            spec: RefCell::new(None),
        }
    }
}

impl MainWindow for FakeWindow {
    fn show(&self) -> Result<()> {
        self.shown.set(true);
        Ok(())
    }

    fn bind_auth_service(&self, auth: Arc<AuthService>) -> Result<bool> {
        if !self.supports_auth {
            return Ok(false);
        }
        *self.auth.borrow_mut() = Some(auth);
        Ok(true)
    }

    fn check_for_updates(&self) -> Result<()> {
        self.update_checks.set(self.update_checks.get() + 1);
        if self.update_panics {
            panic!("update service crashed");
        }
        if self.update_fails {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "update server unreachable",
            )));
        }
        Ok(())
    }

    fn facility_selector(&self) -> &dyn FacilitySelector {
        &self.selector
    }

    fn dashboard(&self) -> &dyn FacilityView {
        &self.dashboard
    }

    fn import_view(&self) -> Option<&dyn FacilityView> {
        self.import.as_ref().map(|v| v as &dyn FacilityView)
    }

    fn title_bar(&self) -> &dyn FacilityView {
        &self.title
    }
}

#[derive(Clone, Default)]
pub struct FakeLoadingScreen {
    pub signal: CompletionSignal,
    pub shown: Rc<Cell<bool>>,
    pub config: Rc<RefCell<Option<LoadingScreenConfig>>>,
    pub show_fails: bool,
}

impl FakeLoadingScreen {
    /// Simulate the loading screen closing itself
    pub fn finish(&self) -> bool {
        self.signal.fire()
    }
}

impl LoadingScreen for FakeLoadingScreen {
    fn completion(&self) -> &CompletionSignal {
        &self.signal
    }

    fn show(&self) -> Result<()> {
        if self.show_fails {
            return Err(Error::Ui("compositor refused the splash window".to_string()));
        }
        self.shown.set(true);
        Ok(())
    }
}

pub struct FakeUi {
    pub window: Rc<FakeWindow>,
    pub loading: FakeLoadingScreen,
    pub window_fails: bool,
    pub loading_fails: bool,
}

impl FakeUi {
    pub fn new(window: FakeWindow) -> Self {
        Self {
            window: Rc::new(window),
            loading: FakeLoadingScreen::default(),
            window_fails: false,
            loading_fails: false,
        }
    }
}

impl UiFactory for FakeUi {
    fn main_window(&self, spec: WindowSpec) -> Result<Rc<dyn MainWindow>> {
        if self.window_fails {
            return Err(Error::Ui("no display available".to_string()));
        }
        *self.window.spec.borrow_mut() = Some(spec);
        let window: Rc<dyn MainWindow> = self.window.clone();
        Ok(window)
    }

    fn loading_screen(&self, config: LoadingScreenConfig) -> Result<Box<dyn LoadingScreen>> {
        if self.loading_fails {
            return Err(Error::Ui("animation assets could not be decoded".to_string()));
        }
        *self.loading.config.borrow_mut() = Some(config);
        Ok(Box::new(self.loading.clone()))
    }
}

pub fn icons_dir(root: &Path) -> PathBuf {
    root.join("resources").join("icons")
}
