//! Hand-off from the listener task to the UI thread.
//!
//! The listener never touches the window. [`ActivationDispatcher::activate`]
//! posts the foreground sequence to the [`UiQueue`], which the UI thread drains.

mod dispatcher;
mod ui_context;
mod window;

pub use dispatcher::ActivationDispatcher;
pub use ui_context::{UiDispatcher, UiQueue, UiTask, ui_context};
pub use window::{WindowHandle, bring_to_front};
