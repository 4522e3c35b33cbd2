//! Startup stages and their fatality policy

use std::fmt;

use crate::logbook::LogContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StartupStage {
    LoggingInit,
    DataBootstrap,
    ResourceResolution,
    AuthInit,
    WindowConstruction,
    LoadingScreenDisplay,
    DeferredActivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatality {
    Fatal,
    Recoverable,
}

impl StartupStage {
    pub const ORDER: [StartupStage; 7] = [
        StartupStage::LoggingInit,
        StartupStage::DataBootstrap,
        StartupStage::ResourceResolution,
        StartupStage::AuthInit,
        StartupStage::WindowConstruction,
        StartupStage::LoadingScreenDisplay,
        StartupStage::DeferredActivation,
    ];

    /// Stage-level policy. Resource resolution is fatal for the asset
    /// directory; individual assets may still be degraded.
    pub fn fatality(&self) -> Fatality {
        match self {
            StartupStage::DataBootstrap | StartupStage::DeferredActivation => Fatality::Recoverable,
            _ => Fatality::Fatal,
        }
    }

    pub fn next(&self) -> Option<StartupStage> {
        let index = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StartupStage::LoggingInit => "Logging initialization",
            StartupStage::DataBootstrap => "Data bootstrap",
            StartupStage::ResourceResolution => "Resource resolution",
            StartupStage::AuthInit => "Authentication initialization",
            StartupStage::WindowConstruction => "Window construction",
            StartupStage::LoadingScreenDisplay => "Loading screen display",
            StartupStage::DeferredActivation => "Deferred activation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Passed,
    /// Recoverable failure absorbed by a fallback
    Recovered(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: StartupStage,
    pub outcome: StageOutcome,
}

/// Ordered record of completed stages
#[derive(Debug, Default)]
pub(crate) struct StageTracker {
    records: Vec<StageRecord>,
}

impl StageTracker {
    /// Record the outcome of the next stage in order
    pub(crate) fn complete(&mut self, stage: StartupStage, outcome: StageOutcome, log: Option<&LogContext>) {
        let expected = match self.records.last() {
            Some(last) => last.stage.next(),
            None => Some(StartupStage::ORDER[0]),
        };
        debug_assert_eq!(
            expected,
            Some(stage),
            "Stage {} completed out of order",
            stage
        );
        debug_assert!(
            matches!(outcome, StageOutcome::Passed) || stage.fatality() == Fatality::Recoverable
                || stage == StartupStage::ResourceResolution,
            "Fatal stage {} recorded as recovered",
            stage
        );

        match (&outcome, log) {
            (StageOutcome::Passed, _) => tracing::info!(stage = %stage, "Startup stage passed"),
            (StageOutcome::Recovered(reason), Some(log)) => {
                log.warning("Startup Stage", &format!("{stage} recovered: {reason}"))
            }
            (StageOutcome::Recovered(reason), None) => {
                tracing::warn!(stage = %stage, reason = %reason, "Startup stage recovered")
            }
        }
        self.records.push(StageRecord { stage, outcome });
    }

    pub(crate) fn records(&self) -> Vec<StageRecord> {
        self.records.clone()
    }
}
