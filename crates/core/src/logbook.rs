//! Application log book
//!
//! Every startup stage receives a [`LogContext`]: the sink plus the
//! operator identity entries are attributed to. The file-backed
//! [`LogBook`] also mirrors each event to `tracing`.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use directories::UserDirs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{Error, Result};

/// Severity of a log book entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// Destination for log book events
pub trait LogSink: Send + Sync {
    fn log_event(&self, operator: &str, category: &str, message: &str, level: Level);
}

/// Sink plus operator identity, shared read-only by all stages
#[derive(Clone)]
pub struct LogContext {
    sink: Arc<dyn LogSink>,
    operator: String,
}

impl LogContext {
    pub fn new(sink: Arc<dyn LogSink>, operator: impl Into<String>) -> Self {
        Self {
            sink,
            operator: operator.into(),
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn log(&self, category: &str, message: &str, level: Level) {
        self.sink.log_event(&self.operator, category, message, level);
    }

    pub fn info(&self, category: &str, message: &str) {
        self.log(category, message, Level::Info);
    }

    pub fn warning(&self, category: &str, message: &str) {
        self.log(category, message, Level::Warning);
    }

    pub fn error(&self, category: &str, message: &str) {
        self.log(category, message, Level::Error);
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext")
            .field("operator", &self.operator)
            .finish_non_exhaustive()
    }
}

/// Resolve the operator identity for log attribution
///
/// The home directory name is preferred, then the `USER`/`USERNAME`
/// environment variables.
pub fn resolve_operator() -> String {
    UserDirs::new()
        .and_then(|dirs| {
            dirs.home_dir()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .filter(|name| !name.is_empty())
        .or_else(|| std::env::var("USER").ok())
        .or_else(|| std::env::var("USERNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// File-backed log book
///
/// Lines go through a non-blocking `tracing-appender` writer; the worker
/// guard flushes the remainder when the book is dropped.
pub struct LogBook {
    path: PathBuf,
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl LogBook {
    /// Open (or create) the log file in append mode
    pub fn open(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidData(format!("log file path has no file name: {}", path.display()))
            })?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(&directory)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for LogBook {
    fn log_event(&self, operator: &str, category: &str, message: &str, level: Level) {
        match level {
            Level::Info => tracing::info!(operator, category, "{}", message),
            Level::Warning => tracing::warn!(operator, category, "{}", message),
            Level::Error => tracing::error!(operator, category, "{}", message),
        }

        let line = format_entry(operator, category, message, level);
        let mut writer = self.writer.clone();
        if let Err(e) = writeln!(writer, "{}", line) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to queue log book entry");
        }
    }
}

fn format_entry(operator: &str, category: &str, message: &str, level: Level) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        operator,
        category,
        message.replace('\n', " "),
    )
}

/// A recorded log book entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub operator: String,
    pub category: String,
    pub message: String,
    pub level: Level,
}

/// In-memory sink
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries whose category matches exactly
    pub fn with_category(&self, category: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn count_level(&self, level: Level) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }
}

impl LogSink for MemorySink {
    fn log_event(&self, operator: &str, category: &str, message: &str, level: Level) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                operator: operator.to_string(),
                category: category.to_string(),
                message: message.to_string(),
                level,
            });
        }
    }
}
