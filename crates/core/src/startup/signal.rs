//! One-shot completion signal
//!
//! The loading screen fires it when its visible lifecycle ends. The
//! subscribed callback runs exactly once, whichever side arrives first.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback = Box<dyn FnOnce()>;

#[derive(Clone, Default)]
pub struct CompletionSignal {
    callback: Rc<RefCell<Option<Callback>>>,
    fired: Rc<Cell<bool>>,
    delivered: Rc<Cell<bool>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the completion callback; a second registration replaces
    /// an undelivered one and is ignored after delivery
    pub fn subscribe(&self, callback: Callback) {
        if self.delivered.get() {
            tracing::warn!("Completion callback registered after delivery, ignoring");
            return;
        }
        if self.fired.get() {
            self.delivered.set(true);
            callback();
            return;
        }
        *self.callback.borrow_mut() = Some(callback);
    }

    /// Signal completion; returns true if this call delivered the callback
    pub fn fire(&self) -> bool {
        if self.fired.replace(true) {
            return false;
        }
        let callback = self.callback.borrow_mut().take();
        match callback {
            Some(callback) => {
                self.delivered.set(true);
                callback();
                true
            }
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }
}
