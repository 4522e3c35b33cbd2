//! Fallback resource resolution
//!
//! A requirement is checked for existence first. When it is missing the
//! resolver tries, in order, the creation strategy and the substitute.
//! Whether an unresolvable requirement is fatal is the caller's call.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::logbook::LogContext;
use crate::retry::{self, RetryPolicy};

/// File-system operations the resolver needs
pub trait ResourceFs {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// The real file system
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl ResourceFs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Directory,
    Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creation {
    CreateDirectory,
}

/// A path the application needs, with its recovery strategies
#[derive(Debug, Clone)]
pub struct ResourceRequirement {
    /// Human-readable name used in log and dialog text
    pub name: String,
    pub path: PathBuf,
    pub kind: ResourceKind,
    pub creation: Option<Creation>,
    pub substitute: Option<PathBuf>,
}

impl ResourceRequirement {
    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: ResourceKind::Directory,
            creation: None,
            substitute: None,
        }
    }

    pub fn asset(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: ResourceKind::Asset,
            creation: None,
            substitute: None,
        }
    }

    pub fn create_if_missing(mut self) -> Self {
        self.creation = Some(Creation::CreateDirectory);
        self
    }

    pub fn with_substitute(mut self, path: impl Into<PathBuf>) -> Self {
        self.substitute = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Existing,
    Created,
    Substituted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { path: PathBuf, via: ResolvedVia },
    Unresolvable { reason: String },
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved { path, .. } => Some(path),
            Resolution::Unresolvable { .. } => None,
        }
    }
}

pub struct ResourceResolver<'a> {
    fs: &'a dyn ResourceFs,
    policy: &'a RetryPolicy,
    log: &'a LogContext,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(fs: &'a dyn ResourceFs, policy: &'a RetryPolicy, log: &'a LogContext) -> Self {
        Self { fs, policy, log }
    }

    fn is_present(&self, requirement: &ResourceRequirement, path: &Path) -> bool {
        match requirement.kind {
            ResourceKind::Directory => self.fs.is_dir(path),
            ResourceKind::Asset => self.fs.exists(path),
        }
    }

    pub fn resolve(&self, requirement: &ResourceRequirement) -> Resolution {
        let name = &requirement.name;
        let path = &requirement.path;

        if self.is_present(requirement, path) {
            return Resolution::Resolved {
                path: path.clone(),
                via: ResolvedVia::Existing,
            };
        }

        let mut creation_error: Option<Error> = None;
        match requirement.creation {
            Some(Creation::CreateDirectory) => {
                let operation = format!("create {name}");
                let created = {
                    let mut create = retry::with_retry(self.policy, self.log, &operation, || {
                        self.fs.create_dir_all(path).map_err(Error::from)
                    });
                    create()
                };
                match created {
                    Ok(()) => {
                        self.log.info(
                            "Resource Creation",
                            &format!("Created missing {name}: {}", path.display()),
                        );
                        return Resolution::Resolved {
                            path: path.clone(),
                            via: ResolvedVia::Created,
                        };
                    }
                    Err(e) => {
                        self.log.error(
                            "Resource Error",
                            &format!(
                                "{name} not found and could not be created: {}",
                                path.display()
                            ),
                        );
                        self.log
                            .error("Resource Error", &format!("Error: {}", e.root_cause()));
                        creation_error = Some(e);
                    }
                }
            }
            None => {
                self.log.warning(
                    "Resource Warning",
                    &format!("{name} not found: {}", path.display()),
                );
            }
        }

        if let Some(substitute) = &requirement.substitute {
            if self.is_present(requirement, substitute) {
                self.log.info(
                    "Resource Fallback",
                    &format!("Using fallback {name}: {}", substitute.display()),
                );
                return Resolution::Resolved {
                    path: substitute.clone(),
                    via: ResolvedVia::Substituted,
                };
            }
        }

        let reason = match (&creation_error, &requirement.substitute) {
            (Some(e), _) => format!(
                "{name} not found and could not be created: {}\n\nError: {}",
                path.display(),
                e.root_cause()
            ),
            (None, Some(_)) => format!(
                "{name} not found: {}\n\nNo fallback {name} available.",
                path.display()
            ),
            (None, None) => format!("{name} not found: {}", path.display()),
        };
        Resolution::Unresolvable { reason }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fake::FakeFs;
    use super::*;
    use crate::logbook::MemorySink;

    fn context() -> (Arc<MemorySink>, LogContext) {
        let sink = Arc::new(MemorySink::new());
        (sink.clone(), LogContext::new(sink, "tester"))
    }

    #[test]
    fn existing_directory_resolves_without_logging() {
        let fs = FakeFs::default().with_dir("/res/gifs");
        let (sink, ctx) = context();
        let policy = RetryPolicy::immediate(3);

        let requirement = ResourceRequirement::directory("animation directory", "/res/gifs")
            .create_if_missing();
        let resolution = ResourceResolver::new(&fs, &policy, &ctx).resolve(&requirement);

        assert_eq!(
            resolution,
            Resolution::Resolved {
                path: PathBuf::from("/res/gifs"),
                via: ResolvedVia::Existing
            }
        );
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn missing_directory_is_created_once() {
        let fs = FakeFs::default();
        let (sink, ctx) = context();
        let policy = RetryPolicy::immediate(3);

        let requirement = ResourceRequirement::directory("animation directory", "/res/gifs")
            .create_if_missing();
        let resolution = ResourceResolver::new(&fs, &policy, &ctx).resolve(&requirement);

        assert!(matches!(
            resolution,
            Resolution::Resolved {
                via: ResolvedVia::Created,
                ..
            }
        ));
        assert_eq!(sink.with_category("Resource Creation").len(), 1);
        assert!(fs.is_dir(Path::new("/res/gifs")));
    }

    #[test]
    fn uncreatable_directory_reports_path_and_error() {
        let fs = FakeFs::default().denying_create(io::ErrorKind::PermissionDenied);
        let (sink, ctx) = context();
        let policy = RetryPolicy::immediate(2);

        let requirement = ResourceRequirement::directory("animation directory", "/res/gifs")
            .create_if_missing();
        let resolution = ResourceResolver::new(&fs, &policy, &ctx).resolve(&requirement);

        match resolution {
            Resolution::Unresolvable { reason } => {
                assert!(reason.contains("/res/gifs"));
                assert!(reason.contains("permission denied"));
            }
            other => panic!("expected Unresolvable, got {:?}", other),
        }
        assert_eq!(*fs.create_calls.borrow(), 2);
        assert_eq!(sink.with_category("Resource Error").len(), 2);
        assert!(sink.with_category("Resource Creation").is_empty());
    }

    #[test]
    fn missing_asset_uses_substitute() {
        let fs = FakeFs::default().with_file("/res/icons/fallback_logo.svg");
        let (sink, ctx) = context();
        let policy = RetryPolicy::immediate(3);

        let requirement = ResourceRequirement::asset("splash logo", "/res/icons/splash_icon.svg")
            .with_substitute("/res/icons/fallback_logo.svg");
        let resolution = ResourceResolver::new(&fs, &policy, &ctx).resolve(&requirement);

        assert_eq!(
            resolution.path(),
            Some(Path::new("/res/icons/fallback_logo.svg"))
        );
        assert_eq!(sink.with_category("Resource Warning").len(), 1);
        assert_eq!(sink.with_category("Resource Fallback").len(), 1);
    }

    #[test]
    fn asset_and_substitute_missing_is_unresolvable() {
        let fs = FakeFs::default();
        let (_sink, ctx) = context();
        let policy = RetryPolicy::immediate(3);

        let requirement = ResourceRequirement::asset("splash logo", "/res/icons/splash_icon.svg")
            .with_substitute("/res/icons/fallback_logo.svg");
        let resolution = ResourceResolver::new(&fs, &policy, &ctx).resolve(&requirement);

        match resolution {
            Resolution::Unresolvable { reason } => {
                assert!(reason.contains("splash_icon.svg"));
                assert!(reason.contains("No fallback"));
            }
            other => panic!("expected Unresolvable, got {:?}", other),
        }
    }

    #[test]
    fn real_fs_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("resources").join("gifs");
        let (sink, ctx) = context();
        let policy = RetryPolicy::immediate(1);

        let requirement =
            ResourceRequirement::directory("animation directory", &target).create_if_missing();
        let resolution = ResourceResolver::new(&OsFs, &policy, &ctx).resolve(&requirement);

        assert_eq!(resolution.path(), Some(target.as_path()));
        assert!(target.is_dir());
        assert_eq!(sink.with_category("Resource Creation").len(), 1);
    }
}
