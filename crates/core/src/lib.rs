//! Gale Core Library
//!
//! Startup orchestration, configuration, logging, data and authentication
//! for the Gale wind-park monitoring desktop application.

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod logbook;
pub mod resources;
pub mod retry;
pub mod startup;
pub mod updates;

pub use auth::{AuthService, Session};
pub use config::{Config, DataFile, PathKey, Rgb};
pub use data::{DataManager, DataSource, Dataset, MemoryReport, Turbine, TurbineDataManager};
pub use error::{Error, FatalFailure, Result};
pub use logbook::{Level, LogBook, LogContext, LogSink};
pub use resources::{OsFs, ResourceFs};
pub use retry::RetryPolicy;
pub use startup::*;
pub use updates::{UpdateChecker, UpdateStatus};
