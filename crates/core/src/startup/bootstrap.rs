//! Data bootstrap step
//!
//! Never leaves the application without a data model: a missing file is
//! replaced by a persisted default, any other failure by an in-memory
//! default plus a degraded-functionality warning.

use std::path::Path;

use crate::data::DataManager;
use crate::logbook::LogContext;
use crate::retry::{with_retry, RetryPolicy};

use super::collaborators::Notifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Loaded,
    /// The data file did not exist; defaults were created (and written back if possible)
    DefaultCreated,
    /// Loading failed for another reason; defaults are in memory only
    Degraded { cause: String },
}

pub fn bootstrap_data(
    data: &mut dyn DataManager,
    path: &Path,
    chunk_size: Option<usize>,
    policy: &RetryPolicy,
    log: &LogContext,
    notifier: &dyn Notifier,
) -> BootstrapOutcome {
    let loaded = {
        let mut load = with_retry(policy, log, "load turbine data", || data.load(path, chunk_size));
        load()
    };

    let outcome = match loaded {
        Ok(()) => BootstrapOutcome::Loaded,
        Err(e) if e.is_not_found() => {
            log.error("Data Loading Error", &format!("Error loading data: {e}"));
            log.info("Data Creation", "Creating default data file...");
            data.create_default_data();

            let persisted = {
                let mut persist = with_retry(policy, log, "write default data", || data.persist(path));
                persist()
            };
            if let Err(e) = persisted {
                log.warning(
                    "Data Creation",
                    &format!("Default data kept in memory only: {e}"),
                );
            }
            BootstrapOutcome::DefaultCreated
        }
        Err(e) => {
            log.error("Data Loading Error", &format!("Error loading data: {e}"));
            log.warning(
                "Data Loading Fallback",
                "Creating empty default data to allow application to start",
            );
            data.create_default_data();
            notifier.warning(
                "Data Loading Error",
                "Failed to load application data. The application will start with minimal functionality.\n\n\
                 Please check the log file for details and contact support if the problem persists.",
            );
            BootstrapOutcome::Degraded {
                cause: e.to_string(),
            }
        }
    };

    debug_assert!(
        !data.dataset().is_empty(),
        "Data bootstrap finished without a dataset"
    );
    outcome
}
