//! Main window backed by the Slint `GaleWindow` component

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use gale_core::{
    AuthService, Dataset, Error, FacilitySelector, FacilityView, MainWindow, Notifier, Result,
    UpdateChecker, UpdateStatus, WindowSpec,
};
use slint::{CloseRequestResponse, ComponentHandle, Image, ModelRc, SharedString, VecModel, Weak};

use crate::GaleWindow;

fn upgrade(handle: &Weak<GaleWindow>) -> Result<GaleWindow> {
    handle
        .upgrade()
        .ok_or_else(|| Error::Ui("main window is no longer available".to_string()))
}

/// Park selection combo box
pub struct ParkSelector {
    handle: Weak<GaleWindow>,
}

impl FacilitySelector for ParkSelector {
    fn current_facility(&self) -> Result<Option<String>> {
        let selected = upgrade(&self.handle)?.get_selected_facility();
        Ok(Some(selected.to_string()).filter(|s| !s.is_empty()))
    }
}

/// Installed capacity panel
pub struct DashboardPanel {
    handle: Weak<GaleWindow>,
    dataset: Rc<Dataset>,
}

impl FacilityView for DashboardPanel {
    fn show_facility(&self, facility: &str) -> Result<()> {
        let summary = self
            .dataset
            .summary(facility)
            .ok_or_else(|| Error::NotFound(format!("wind park '{facility}'")))?;
        upgrade(&self.handle)?.set_dashboard_summary(summary.into());
        Ok(())
    }
}

/// Target park for data imports
pub struct ImportPanel {
    handle: Weak<GaleWindow>,
}

impl FacilityView for ImportPanel {
    fn show_facility(&self, facility: &str) -> Result<()> {
        upgrade(&self.handle)?.set_import_target(facility.into());
        Ok(())
    }
}

pub struct TitleBar {
    handle: Weak<GaleWindow>,
}

impl FacilityView for TitleBar {
    fn show_facility(&self, facility: &str) -> Result<()> {
        upgrade(&self.handle)?.set_title_facility(facility.into());
        Ok(())
    }
}

/// Status line for a sign-in attempt
pub fn sign_in(auth: &AuthService, username: &str, password: &str) -> String {
    match auth.authenticate(username, password) {
        Ok(session) => {
            tracing::info!(session = %session.id, started = %session.started_at, "Operator session started");
            format!("Signed in as {}", session.username)
        }
        Err(e) => e.to_string(),
    }
}

/// Status line for account creation; new accounts are written to the store's file
pub fn register(auth: &AuthService, username: &str, password: &str) -> String {
    match auth.register(username, password).and_then(|()| auth.persist()) {
        Ok(()) => format!("Account {} created", username.trim()),
        Err(e) => e.to_string(),
    }
}

pub struct SlintMainWindow {
    component: GaleWindow,
    notifier: Rc<dyn Notifier>,
    update_manifest: PathBuf,
    auth: Rc<RefCell<Option<Arc<AuthService>>>>,
    selector: ParkSelector,
    dashboard: DashboardPanel,
    import: ImportPanel,
    title: TitleBar,
}

impl SlintMainWindow {
    pub fn new(spec: WindowSpec, notifier: Rc<dyn Notifier>, update_manifest: &Path) -> Result<Self> {
        let component = GaleWindow::new().map_err(|e| Error::Ui(e.to_string()))?;

        let parks: Vec<SharedString> = spec.dataset.parks().into_iter().map(Into::into).collect();
        if let Some(first) = parks.first() {
            component.set_selected_facility(first.clone());
        }
        component.set_facilities(ModelRc::from(Rc::new(VecModel::from(parks))));

        if let Some(icon) = &spec.icon {
            match Image::load_from_path(icon) {
                Ok(image) => component.set_app_icon(image),
                Err(e) => {
                    tracing::warn!(path = %icon.display(), error = ?e, "Failed to load window icon")
                }
            }
        }

        component.window().on_close_requested(|| {
            if let Err(e) = slint::quit_event_loop() {
                tracing::error!("Failed to stop event loop: {}", e);
            }
            CloseRequestResponse::HideWindow
        });

        let handle = component.as_weak();
        let dataset = Rc::new(spec.dataset);
        let window = Self {
            notifier,
            update_manifest: update_manifest.to_path_buf(),
            auth: Rc::new(RefCell::new(None)),
            selector: ParkSelector {
                handle: handle.clone(),
            },
            dashboard: DashboardPanel {
                handle: handle.clone(),
                dataset: dataset.clone(),
            },
            import: ImportPanel {
                handle: handle.clone(),
            },
            title: TitleBar { handle },
            component,
        };
        window.bind_facility_changes(dataset);
        window.bind_operator_panel();
        Ok(window)
    }

    /// Sign-in and account creation; inert until a service is attached
    fn bind_operator_panel(&self) {
        let auth = self.auth.clone();
        let handle = self.component.as_weak();
        self.component.on_sign_in(move |username, password| {
            if let (Some(auth), Some(window)) = (auth.borrow().as_ref(), handle.upgrade()) {
                window.set_auth_status(sign_in(auth, &username, &password).into());
            }
        });

        let auth = self.auth.clone();
        let handle = self.component.as_weak();
        self.component.on_register(move |username, password| {
            if let (Some(auth), Some(window)) = (auth.borrow().as_ref(), handle.upgrade()) {
                window.set_auth_status(register(auth, &username, &password).into());
            }
        });
    }

    /// Keep the panels in step with later selections
    fn bind_facility_changes(&self, dataset: Rc<Dataset>) {
        let views: [Box<dyn FacilityView>; 3] = [
            Box::new(DashboardPanel {
                handle: self.component.as_weak(),
                dataset,
            }),
            Box::new(ImportPanel {
                handle: self.component.as_weak(),
            }),
            Box::new(TitleBar {
                handle: self.component.as_weak(),
            }),
        ];
        self.component.on_facility_changed(move |facility| {
            for view in &views {
                if let Err(e) = view.show_facility(&facility) {
                    tracing::warn!(facility = %facility, "Failed to update view: {}", e);
                }
            }
        });
    }
}

impl MainWindow for SlintMainWindow {
    fn show(&self) -> Result<()> {
        self.component.show().map_err(|e| Error::Ui(e.to_string()))
    }

    fn bind_auth_service(&self, auth: Arc<AuthService>) -> Result<bool> {
        tracing::debug!(users = auth.user_count(), "Authentication service attached");
        *self.auth.borrow_mut() = Some(auth);
        self.component.set_auth_available(true);
        Ok(true)
    }

    fn check_for_updates(&self) -> Result<()> {
        let checker = UpdateChecker::new(&self.update_manifest, env!("CARGO_PKG_VERSION"))?;
        match checker.check()? {
            UpdateStatus::Available { latest, notes, url } => {
                let mut message = format!("Gale {latest} is available.");
                if let Some(notes) = notes {
                    message.push_str(&format!("\n\n{notes}"));
                }
                if let Some(url) = url {
                    message.push_str(&format!("\n\nDownload: {url}"));
                }
                self.notifier.info("Update Available", &message);
            }
            UpdateStatus::UpToDate => tracing::info!("Gale is up to date"),
            UpdateStatus::NoManifest => {
                tracing::debug!(path = %checker.manifest_path().display(), "Update check skipped")
            }
        }
        Ok(())
    }

    fn facility_selector(&self) -> &dyn FacilitySelector {
        &self.selector
    }

    fn dashboard(&self) -> &dyn FacilityView {
        &self.dashboard
    }

    fn import_view(&self) -> Option<&dyn FacilityView> {
        Some(&self.import)
    }

    fn title_bar(&self) -> &dyn FacilityView {
        &self.title
    }
}
