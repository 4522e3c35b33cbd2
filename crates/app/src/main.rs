//! Gale - wind park monitoring desktop application
//!
//! Shows an animated loading screen while the turbine inventory and
//! resources are prepared, then opens the park dashboard.

use std::process::ExitCode;
use std::rc::Rc;

use gale_core::{
    Collaborators, Config, CrashBoundary, Error, FileLogging, Notifier, OsFs, PathKey, Sequencer,
    TurbineDataManager,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod dialogs;
mod platform;
mod splash;
mod ui;
mod window;

slint::include_modules!();

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Gale {}", env!("CARGO_PKG_VERSION"));
    platform::log_platform_info();

    let notifier: Rc<dyn Notifier> = Rc::new(dialogs::RfdNotifier);
    let boundary = CrashBoundary::new(notifier.clone());

    let outcome = boundary.run(|log_slot| {
        let config = Config::discover()?;
        let parts = Collaborators {
            logging: Box::new(FileLogging),
            data: Box::new(TurbineDataManager::new()),
            fs: Box::new(OsFs),
            notifier: notifier.clone(),
            ui: Box::new(ui::SlintUi::new(
                notifier.clone(),
                config.path(PathKey::UpdateManifest),
            )),
        };

        let startup = Sequencer::new(config, parts)
            .with_version_label(format!("Gale v{}", env!("CARGO_PKG_VERSION")))
            .run(log_slot)?;

        // Keeps running while the loading screen hands over to the main window
        slint::run_event_loop_until_quit().map_err(|e| Error::Ui(e.to_string()))?;
        startup.log().info("Application Shutdown", "Main window closed");
        Ok(())
    });

    ExitCode::from(outcome.exit_code())
}
