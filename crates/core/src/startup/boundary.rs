//! Top-level crash boundary
//!
//! Wraps the whole startup path. Anything that escapes, whether a fatal
//! stage error, an unexpected error or a panic, is logged once under
//! [`CRITICAL_CATEGORY`], shown to the user in a single critical dialog,
//! and turned into a non-zero exit code.

use std::cell::OnceCell;
use std::error::Error as _;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::logbook::LogContext;

use super::activation::panic_message;
use super::collaborators::Notifier;

pub const EXIT_FAILURE: u8 = 1;
pub const CRITICAL_CATEGORY: &str = "Critical Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryOutcome {
    Completed,
    Failed { exit_code: u8 },
}

impl BoundaryOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            BoundaryOutcome::Completed => 0,
            BoundaryOutcome::Failed { exit_code } => *exit_code,
        }
    }
}

pub struct CrashBoundary {
    notifier: Rc<dyn Notifier>,
    log: OnceCell<LogContext>,
}

impl CrashBoundary {
    pub fn new(notifier: Rc<dyn Notifier>) -> Self {
        Self {
            notifier,
            log: OnceCell::new(),
        }
    }

    /// Log context, once the guarded code has established one
    pub fn log(&self) -> Option<&LogContext> {
        self.log.get()
    }

    /// Run `body`, which receives the slot to publish its log context in
    pub fn run<F>(&self, body: F) -> BoundaryOutcome
    where
        F: FnOnce(&OnceCell<LogContext>) -> Result<()>,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&self.log)));
        let (title, message, detail) = match result {
            Ok(Ok(())) => return BoundaryOutcome::Completed,
            Ok(Err(Error::Fatal(failure))) => {
                let detail = failure.to_string();
                (failure.title, failure.message, detail)
            }
            Ok(Err(e)) => (
                CRITICAL_CATEGORY.to_string(),
                "An unexpected error occurred during startup.".to_string(),
                error_chain(&e),
            ),
            Err(payload) => (
                CRITICAL_CATEGORY.to_string(),
                "The application stopped unexpectedly during startup.".to_string(),
                format!("panic: {}", panic_message(payload.as_ref())),
            ),
        };

        self.report(&title, &message, &detail);
        BoundaryOutcome::Failed {
            exit_code: EXIT_FAILURE,
        }
    }

    fn report(&self, title: &str, message: &str, detail: &str) {
        // The reporters themselves must not take the process down
        let logged = panic::catch_unwind(AssertUnwindSafe(|| match self.log.get() {
            Some(log) => log.error(CRITICAL_CATEGORY, &format!("{title}: {detail}")),
            None => tracing::error!(title, detail, "Startup failed before logging was available"),
        }));
        if logged.is_err() {
            eprintln!("{title}: {detail}");
        }

        let dialog = format!("{message}\n\nThe application will now exit.");
        let notified = panic::catch_unwind(AssertUnwindSafe(|| {
            self.notifier.critical(title, &dialog)
        }));
        if notified.is_err() {
            tracing::error!(title, "Critical dialog could not be shown");
        }
    }
}

fn error_chain(e: &Error) -> String {
    let mut detail = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !detail.contains(&text) {
            detail.push_str(": ");
            detail.push_str(&text);
        }
        source = cause.source();
    }
    detail
}
