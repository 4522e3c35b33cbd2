//! Slint implementation of the startup UI factory

use std::path::PathBuf;
use std::rc::Rc;

use gale_core::{
    LoadingScreen, LoadingScreenConfig, MainWindow, Notifier, Result, UiFactory, WindowSpec,
};

use crate::splash::SlintLoadingScreen;
use crate::window::SlintMainWindow;

pub struct SlintUi {
    notifier: Rc<dyn Notifier>,
    update_manifest: PathBuf,
}

impl SlintUi {
    pub fn new(notifier: Rc<dyn Notifier>, update_manifest: PathBuf) -> Self {
        Self {
            notifier,
            update_manifest,
        }
    }
}

impl UiFactory for SlintUi {
    fn main_window(&self, spec: WindowSpec) -> Result<Rc<dyn MainWindow>> {
        let window = SlintMainWindow::new(spec, self.notifier.clone(), &self.update_manifest)?;
        Ok(Rc::new(window))
    }

    fn loading_screen(&self, config: LoadingScreenConfig) -> Result<Box<dyn LoadingScreen>> {
        Ok(Box::new(SlintLoadingScreen::new(config)?))
    }
}
