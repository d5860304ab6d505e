use crate::activation::ui_context::UiDispatcher;
use crate::activation::window::{WindowHandle, bring_to_front};
use crate::error::instance::InstanceError;

use std::sync::{Arc, OnceLock, Weak};

use log::{debug, info, warn};

/// Routes activation requests from the listener to the main window.
///
/// The window is published once through a [`OnceLock`], so a registration made
/// on the UI thread is visible to the listener task without further locking.
/// Only a [`Weak`] reference is kept: the UI layer owns the window.
#[derive(Clone)]
pub struct ActivationDispatcher {
    window: Arc<OnceLock<Weak<dyn WindowHandle>>>,
    ui: UiDispatcher,
}

impl ActivationDispatcher {
    pub fn new(ui: UiDispatcher) -> Self {
        Self {
            window: Arc::new(OnceLock::new()),
            ui,
        }
    }

    /// Register the main window. Only the first call has an effect.
    ///
    /// Returns `true` if this call registered the window.
    pub fn register_window<W>(&self, window: &Arc<W>) -> bool
    where
        W: WindowHandle + 'static,
    {
        let weak = Arc::downgrade(window);
        let weak: Weak<dyn WindowHandle> = weak;

        if self.window.set(weak).is_ok() {
            info!("Main window registered for activation");
            true
        } else {
            warn!("Main window already registered, ignoring second registration");
            false
        }
    }

    pub fn is_window_registered(&self) -> bool {
        self.window.get().is_some()
    }

    /// Bring the registered window to the front on the UI thread.
    ///
    /// Does nothing if no window has been registered yet.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::Dispatch`] if the UI queue is gone.
    pub fn activate(&self) -> Result<(), InstanceError> {
        let Some(window) = self.window.get() else {
            debug!("Activation requested before the main window was registered, ignoring");
            return Ok(());
        };

        let window = Weak::clone(window);
        self.ui.post(move || match window.upgrade() {
            Some(window) => {
                bring_to_front(window.as_ref());
                debug!("Main window brought to front");
            }
            None => debug!("Main window already dropped, skipping activation"),
        })
    }
}
