//! Native message dialogs

use gale_core::Notifier;
use rfd::{MessageButtons, MessageDialog, MessageLevel};

/// Notifier backed by the platform's modal message box
#[derive(Debug, Default, Clone, Copy)]
pub struct RfdNotifier;

impl RfdNotifier {
    fn show(level: MessageLevel, title: &str, message: &str) {
        tracing::debug!(title, "Showing message dialog");
        let _ = MessageDialog::new()
            .set_level(level)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

impl Notifier for RfdNotifier {
    fn critical(&self, title: &str, message: &str) {
        Self::show(MessageLevel::Error, title, message);
    }

    fn warning(&self, title: &str, message: &str) {
        Self::show(MessageLevel::Warning, title, message);
    }

    fn info(&self, title: &str, message: &str) {
        Self::show(MessageLevel::Info, title, message);
    }
}
