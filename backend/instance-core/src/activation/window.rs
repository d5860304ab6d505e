/// The application's main window, as seen by the activation code.
///
/// Implemented by the UI layer. Methods are only ever called from tasks run
/// by the [`UiQueue`](super::UiQueue), i.e. on the UI thread.
pub trait WindowHandle: Send + Sync {
    fn is_minimized(&self) -> bool;

    /// Return from minimized to normal state.
    fn restore(&self);

    /// Ask the window manager for focus.
    fn activate(&self);

    fn is_topmost(&self) -> bool;

    fn set_topmost(&self, topmost: bool);
}

/// Restore and foreground `window`.
///
/// Focus requests alone are often ignored by focus-stealing prevention, so the
/// window is also pinned on top for an instant and then returned to its
/// previous topmost state.
pub fn bring_to_front(window: &dyn WindowHandle) {
    if window.is_minimized() {
        window.restore();
    }

    window.activate();

    let was_topmost = window.is_topmost();
    window.set_topmost(true);
    window.set_topmost(was_topmost);
}
