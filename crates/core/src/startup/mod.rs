//! Startup sequence
//!
//! Stages run in a fixed order with a declared fatality policy. The
//! sequencer drives them, the crash boundary reports whatever escapes, and
//! the deferred activation handler finishes the job once the loading
//! screen has closed.

mod activation;
mod bootstrap;
mod boundary;
mod collaborators;
mod sequencer;
mod signal;
mod stage;

#[cfg(test)]
mod fakes;

pub use activation::{ActivationTask, DeferredActivation, TaskOutcome, TaskReport};
pub use bootstrap::{bootstrap_data, BootstrapOutcome};
pub use boundary::{BoundaryOutcome, CrashBoundary, CRITICAL_CATEGORY, EXIT_FAILURE};
pub use collaborators::{
    FacilitySelector, FacilityView, FileLogging, LoadingScreen, LoadingScreenConfig,
    LoggingBackend, MainWindow, Notifier, UiFactory, WindowSpec,
};
pub use sequencer::{Collaborators, Sequencer, Startup};
pub use signal::CompletionSignal;
pub use stage::{Fatality, StageOutcome, StageRecord, StartupStage};
