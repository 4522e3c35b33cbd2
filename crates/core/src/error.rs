//! Error types for Gale Core

use std::io;

use thiserror::Error;

use crate::startup::StartupStage;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Data error: {0}")]
    Data(#[from] csv::Error),

    #[error("Log file error: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),

    #[error("Version error: {0}")]
    Version(#[from] semver::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("UI error: {0}")]
    Ui(String),

    /// Terminal outcome of a retried operation
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    OperationFailed {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Fatal(FatalFailure),
}

impl Error {
    /// True when the root cause is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == io::ErrorKind::NotFound,
            Error::Data(e) => match e.kind() {
                csv::ErrorKind::Io(io_err) => io_err.kind() == io::ErrorKind::NotFound,
                _ => false,
            },
            Error::NotFound(_) => true,
            Error::OperationFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Default retry classifier for file-system work
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Io(e) => is_transient_io(e),
            Error::Data(e) => match e.kind() {
                csv::ErrorKind::Io(io_err) => is_transient_io(io_err),
                _ => false,
            },
            _ => false,
        }
    }

    /// Innermost error beneath any retry wrapping
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::OperationFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn fatal(stage: StartupStage, title: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fatal(FatalFailure {
            stage,
            title: title.into(),
            message: message.into(),
        })
    }
}

fn is_transient_io(e: &io::Error) -> bool {
    !matches!(
        e.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidData
            | io::ErrorKind::Unsupported
    )
}

/// A Fatal stage failure, already phrased for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalFailure {
    pub stage: StartupStage,
    pub title: String,
    pub message: String,
}

impl std::fmt::Display for FatalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
