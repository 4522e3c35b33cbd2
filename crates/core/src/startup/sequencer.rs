//! Startup sequencer
//!
//! Drives the stages in their fixed order. Fatal failures come back as
//! [`Error::Fatal`] for the crash boundary to report; recoverable ones are
//! absorbed here. The synchronous part ends once the loading screen is
//! visible with the activation handler subscribed to its completion.

use std::cell::{OnceCell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthService;
use crate::config::{Config, DataFile, PathKey, Rgb};
use crate::data::DataManager;
use crate::error::{Error, Result};
use crate::logbook::LogContext;
use crate::resources::{Resolution, ResourceFs, ResourceRequirement, ResourceResolver};
use crate::retry::RetryPolicy;

use super::activation::{DeferredActivation, TaskOutcome, TaskReport};
use super::bootstrap::{bootstrap_data, BootstrapOutcome};
use super::collaborators::{
    LoadingScreen, LoadingScreenConfig, LoggingBackend, MainWindow, Notifier, UiFactory,
    WindowSpec,
};
use super::stage::{StageOutcome, StageRecord, StageTracker, StartupStage};

const CATEGORY: &str = "Application Startup";

/// Everything the sequencer orchestrates
pub struct Collaborators {
    pub logging: Box<dyn LoggingBackend>,
    pub data: Box<dyn DataManager>,
    pub fs: Box<dyn ResourceFs>,
    pub notifier: Rc<dyn Notifier>,
    pub ui: Box<dyn UiFactory>,
}

pub struct Sequencer {
    config: Config,
    parts: Collaborators,
    policy: RetryPolicy,
    version_label: String,
}

/// Live state handed back once the loading screen is up
pub struct Startup {
    stages: Rc<RefCell<StageTracker>>,
    data_outcome: BootstrapOutcome,
    log: LogContext,
    window: Rc<dyn MainWindow>,
    data: Rc<dyn DataManager>,
    loading_screen: Box<dyn LoadingScreen>,
    activation: Rc<RefCell<Option<Vec<TaskReport>>>>,
}

impl Startup {
    /// Stages completed so far; deferred activation joins once the
    /// loading screen has closed
    pub fn stages(&self) -> Vec<StageRecord> {
        self.stages.borrow().records()
    }

    pub fn data_outcome(&self) -> &BootstrapOutcome {
        &self.data_outcome
    }

    pub fn log(&self) -> &LogContext {
        &self.log
    }

    pub fn window(&self) -> &Rc<dyn MainWindow> {
        &self.window
    }

    pub fn data(&self) -> &dyn DataManager {
        self.data.as_ref()
    }

    pub fn loading_screen(&self) -> &dyn LoadingScreen {
        self.loading_screen.as_ref()
    }

    /// Activation task reports, once the loading screen has closed
    pub fn activation_reports(&self) -> Option<Vec<TaskReport>> {
        self.activation.borrow().clone()
    }
}

impl Sequencer {
    pub fn new(config: Config, parts: Collaborators) -> Self {
        Self {
            config,
            parts,
            policy: RetryPolicy::file_operation(),
            version_label: "Gale".to_string(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_version_label(mut self, label: impl Into<String>) -> Self {
        self.version_label = label.into();
        self
    }

    /// Run the synchronous stages
    ///
    /// `log_slot` receives the log context as soon as logging is up so the
    /// crash boundary can attribute anything that escapes later.
    pub fn run(self, log_slot: &OnceCell<LogContext>) -> Result<Startup> {
        let Sequencer {
            config,
            parts,
            policy,
            version_label,
        } = self;
        let Collaborators {
            logging,
            mut data,
            fs,
            notifier,
            ui,
        } = parts;
        let stages = Rc::new(RefCell::new(StageTracker::default()));

        // Logging
        let log_file = config.path(PathKey::LogFile);
        let log = logging.open(&log_file).map_err(|e| {
            Error::fatal(
                StartupStage::LoggingInit,
                "Logging Error",
                format!(
                    "The application log could not be opened: {}\n\nError: {}",
                    log_file.display(),
                    e
                ),
            )
        })?;
        let _ = log_slot.set(log.clone());
        log.info(
            CATEGORY,
            &format!("Starting {} (operator {})", version_label, log.operator()),
        );
        stages.borrow_mut().complete(StartupStage::LoggingInit, StageOutcome::Passed, Some(&log));

        // Data
        let data_path = config.data_file_path(DataFile::TurbineInfo);
        let chunk_size = Some(config.setting("data_chunk_size", 0usize)).filter(|&n| n > 0);
        let data_outcome = bootstrap_data(
            data.as_mut(),
            &data_path,
            chunk_size,
            &policy,
            &log,
            notifier.as_ref(),
        );
        let data_stage = match &data_outcome {
            BootstrapOutcome::Loaded => StageOutcome::Passed,
            BootstrapOutcome::DefaultCreated => {
                StageOutcome::Recovered("data file missing, default data created".to_string())
            }
            BootstrapOutcome::Degraded { cause } => {
                StageOutcome::Recovered(format!("running on default data: {cause}"))
            }
        };
        stages.borrow_mut().complete(StartupStage::DataBootstrap, data_stage, Some(&log));

        // Resources
        let resolved = resolve_resources(&config, fs.as_ref(), &policy, &log)?;
        let resource_stage = match &resolved.degraded {
            Some(reason) => StageOutcome::Recovered(reason.clone()),
            None => StageOutcome::Passed,
        };
        stages.borrow_mut().complete(StartupStage::ResourceResolution, resource_stage, Some(&log));

        // Authentication
        let users_file = config.path(PathKey::UsersFile);
        let mut auth = AuthService::open(&users_file).map_err(|e| {
            Error::fatal(
                StartupStage::AuthInit,
                "Authentication Error",
                format!(
                    "The authentication service could not be initialized from {}\n\nError: {}",
                    users_file.display(),
                    e
                ),
            )
        })?;
        auth.bind_logbook(log.clone());
        let auth = Arc::new(auth);
        stages.borrow_mut().complete(StartupStage::AuthInit, StageOutcome::Passed, Some(&log));

        // Main window shell
        let window = ui
            .main_window(WindowSpec {
                dataset: data.dataset().clone(),
                icon: resolved.icon,
            })
            .map_err(|e| {
                Error::fatal(
                    StartupStage::WindowConstruction,
                    "Window Error",
                    format!("The main window could not be created.\n\nError: {e}"),
                )
            })?;
        stages.borrow_mut().complete(
            StartupStage::WindowConstruction,
            StageOutcome::Passed,
            Some(&log),
        );

        // Loading screen
        let splash = LoadingScreenConfig {
            asset_dir: resolved.asset_dir,
            version_label,
            logo: resolved.logo,
            duration: splash_duration(&config, &log),
            background: splash_background(&config, &log),
            corner_radius: splash_corner_radius(&config, &log),
        };
        let loading_screen = ui.loading_screen(splash).map_err(|e| {
            Error::fatal(
                StartupStage::LoadingScreenDisplay,
                "Loading Screen Error",
                format!("The loading screen could not be created.\n\nError: {e}"),
            )
        })?;

        let data: Rc<dyn DataManager> = Rc::from(data);
        let activation = Rc::new(RefCell::new(None));
        let handler = DeferredActivation::new(
            window.clone(),
            auth,
            data.clone(),
            notifier.clone(),
            log.clone(),
        );
        let reports = activation.clone();
        let tracker = stages.clone();
        let activation_log = log.clone();
        loading_screen.completion().subscribe(Box::new(move || {
            activation_log.info(CATEGORY, "Loading screen closed, activating main window");
            let task_reports = handler.run();
            tracker.borrow_mut().complete(
                StartupStage::DeferredActivation,
                activation_outcome(&task_reports),
                Some(&activation_log),
            );
            *reports.borrow_mut() = Some(task_reports);
        }));

        loading_screen.show().map_err(|e| {
            Error::fatal(
                StartupStage::LoadingScreenDisplay,
                "Loading Screen Error",
                format!("The loading screen could not be displayed.\n\nError: {e}"),
            )
        })?;
        stages.borrow_mut().complete(
            StartupStage::LoadingScreenDisplay,
            StageOutcome::Passed,
            Some(&log),
        );
        log.info(CATEGORY, "Startup sequence complete, waiting for loading screen");

        Ok(Startup {
            stages,
            data_outcome,
            log,
            window,
            data,
            loading_screen,
            activation,
        })
    }
}

fn activation_outcome(reports: &[TaskReport]) -> StageOutcome {
    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| matches!(r.outcome, TaskOutcome::Failed(_)))
        .map(|r| r.task.name())
        .collect();
    if failed.is_empty() {
        StageOutcome::Passed
    } else {
        StageOutcome::Recovered(format!("failed tasks: {}", failed.join(", ")))
    }
}

struct ResolvedResources {
    asset_dir: PathBuf,
    logo: Option<PathBuf>,
    icon: Option<PathBuf>,
    degraded: Option<String>,
}

fn resolve_resources(
    config: &Config,
    fs: &dyn ResourceFs,
    policy: &RetryPolicy,
    log: &LogContext,
) -> Result<ResolvedResources> {
    let resolver = ResourceResolver::new(fs, policy, log);
    let icons_dir = config.path(PathKey::IconsDir);

    let animation = ResourceRequirement::directory("animation directory", config.path(PathKey::GifDir))
        .create_if_missing();
    let asset_dir = match resolver.resolve(&animation) {
        Resolution::Resolved { path, .. } => path,
        Resolution::Unresolvable { reason } => {
            return Err(Error::fatal(
                StartupStage::ResourceResolution,
                "Resource Error",
                reason,
            ));
        }
    };

    let logo = ResourceRequirement::asset(
        "splash logo",
        icons_dir.join(config.setting("splash_logo", "splash_icon.svg".to_string())),
    )
    .with_substitute(icons_dir.join(config.setting("fallback_logo", "fallback_logo.svg".to_string())));
    let mut degraded = None;
    let logo = match resolver.resolve(&logo) {
        Resolution::Resolved { path, .. } => Some(path),
        Resolution::Unresolvable { reason } => {
            if config.setting("require_branding", true) {
                return Err(Error::fatal(
                    StartupStage::ResourceResolution,
                    "Resource Error",
                    reason,
                ));
            }
            log.warning("Resource Warning", "Continuing without splash branding");
            degraded = Some("splash logo unavailable".to_string());
            None
        }
    };

    let icon = ResourceRequirement::asset(
        "application icon",
        icons_dir.join(config.setting("app_icon", "logo_app.png".to_string())),
    );
    let icon = resolver.resolve(&icon).path().map(|p| p.to_path_buf());

    Ok(ResolvedResources {
        asset_dir,
        logo,
        icon,
        degraded,
    })
}

const DEFAULT_SPLASH_MS: f64 = 2000.0;
const DEFAULT_CORNER_RADIUS: f64 = 10.0;

/// Any TOML number of milliseconds, rounded to the nearest millisecond
fn splash_duration(config: &Config, log: &LogContext) -> Duration {
    let millis = config.setting("splash_duration", DEFAULT_SPLASH_MS);
    let millis = if millis.is_finite() && millis >= 0.0 {
        millis
    } else {
        log.warning(
            "Configuration Warning",
            &format!("Invalid splash_duration {millis}, using {DEFAULT_SPLASH_MS} ms"),
        );
        DEFAULT_SPLASH_MS
    };
    Duration::from_millis(millis.round() as u64)
}

fn splash_corner_radius(config: &Config, log: &LogContext) -> f32 {
    let radius = config.setting("splash_border_radius", DEFAULT_CORNER_RADIUS);
    if radius.is_finite() && radius >= 0.0 {
        radius as f32
    } else {
        log.warning(
            "Configuration Warning",
            &format!("Invalid splash_border_radius {radius}, using {DEFAULT_CORNER_RADIUS}"),
        );
        DEFAULT_CORNER_RADIUS as f32
    }
}

fn splash_background(config: &Config, log: &LogContext) -> Rgb {
    let raw = config.setting("splash_background_color", "#FFFFFF".to_string());
    match raw.parse::<Rgb>() {
        Ok(color) => color,
        Err(e) => {
            log.warning("Configuration Warning", &format!("{e}, using white"));
            Rgb::WHITE
        }
    }
}
