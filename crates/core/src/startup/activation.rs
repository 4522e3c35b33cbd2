//! Deferred activation handler
//!
//! Runs once after the loading screen closes. Each task is isolated: an
//! error or panic is logged under the task's name and the next task runs
//! regardless.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::data::DataManager;
use crate::error::Result;
use crate::logbook::{Level, LogContext};

use super::collaborators::{MainWindow, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationTask {
    BindAuth,
    ShowWindow,
    UpdateCheck,
    FacilitySync,
    MemoryTelemetry,
}

impl ActivationTask {
    pub const ORDER: [ActivationTask; 5] = [
        ActivationTask::BindAuth,
        ActivationTask::ShowWindow,
        ActivationTask::UpdateCheck,
        ActivationTask::FacilitySync,
        ActivationTask::MemoryTelemetry,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActivationTask::BindAuth => "bind authentication service",
            ActivationTask::ShowWindow => "show main window",
            ActivationTask::UpdateCheck => "update check",
            ActivationTask::FacilitySync => "dashboard initialization",
            ActivationTask::MemoryTelemetry => "memory monitoring",
        }
    }

    fn failure_category(&self) -> &'static str {
        match self {
            ActivationTask::BindAuth => "Authentication Binding Error",
            ActivationTask::ShowWindow => "Window Display Error",
            ActivationTask::UpdateCheck => "Update Check Error",
            ActivationTask::FacilitySync => "Dashboard Initialization Error",
            ActivationTask::MemoryTelemetry => "Memory Monitoring Error",
        }
    }

    fn failure_level(&self) -> Level {
        match self {
            ActivationTask::MemoryTelemetry => Level::Warning,
            _ => Level::Error,
        }
    }

    /// Non-blocking warning shown to the user on failure, if any
    fn user_warning(&self) -> Option<(&'static str, &'static str)> {
        match self {
            ActivationTask::FacilitySync => Some((
                "Dashboard Error",
                "Error initializing the dashboard. Some features may not work correctly.\n\n\
                 Please check the application log for details.",
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// Nothing to do (unsupported capability, no selection)
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: ActivationTask,
    pub outcome: TaskOutcome,
}

pub struct DeferredActivation {
    window: Rc<dyn MainWindow>,
    auth: Arc<AuthService>,
    data: Rc<dyn DataManager>,
    notifier: Rc<dyn Notifier>,
    log: LogContext,
}

impl DeferredActivation {
    pub fn new(
        window: Rc<dyn MainWindow>,
        auth: Arc<AuthService>,
        data: Rc<dyn DataManager>,
        notifier: Rc<dyn Notifier>,
        log: LogContext,
    ) -> Self {
        Self {
            window,
            auth,
            data,
            notifier,
            log,
        }
    }

    /// Run every task in order; consumes the handler
    pub fn run(self) -> Vec<TaskReport> {
        ActivationTask::ORDER
            .iter()
            .map(|&task| self.isolate(task))
            .collect()
    }

    fn isolate(&self, task: ActivationTask) -> TaskReport {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_task(task)));
        let failure = match result {
            Ok(Ok(outcome)) => {
                return TaskReport { task, outcome };
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };

        self.log.log(
            task.failure_category(),
            &format!("Error during {}: {}", task.name(), failure),
            task.failure_level(),
        );
        if let Some((title, message)) = task.user_warning() {
            self.notifier.warning(title, message);
        }
        TaskReport {
            task,
            outcome: TaskOutcome::Failed(failure),
        }
    }

    fn run_task(&self, task: ActivationTask) -> Result<TaskOutcome> {
        match task {
            ActivationTask::BindAuth => {
                if self.window.bind_auth_service(self.auth.clone())? {
                    Ok(TaskOutcome::Completed)
                } else {
                    Ok(TaskOutcome::Skipped)
                }
            }
            ActivationTask::ShowWindow => {
                self.window.show()?;
                Ok(TaskOutcome::Completed)
            }
            ActivationTask::UpdateCheck => {
                self.window.check_for_updates()?;
                Ok(TaskOutcome::Completed)
            }
            ActivationTask::FacilitySync => self.sync_facility(),
            ActivationTask::MemoryTelemetry => {
                let report = self.data.memory_usage()?;
                self.log
                    .info("Memory Usage", &format!("Memory after startup: {report}"));
                Ok(TaskOutcome::Completed)
            }
        }
    }

    fn sync_facility(&self) -> Result<TaskOutcome> {
        let selected = self.window.facility_selector().current_facility()?;
        let Some(facility) = selected.filter(|f| !f.is_empty()) else {
            return Ok(TaskOutcome::Skipped);
        };

        self.window.dashboard().show_facility(&facility)?;
        if let Some(import) = self.window.import_view() {
            import.show_facility(&facility)?;
        }
        self.window.title_bar().show_facility(&facility)?;

        self.log.info(
            "Dashboard Initialization",
            &format!("Dashboard initialized for {facility}"),
        );
        Ok(TaskOutcome::Completed)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
