// Unit tests for the activation hand-off: window sequence, UI queue, dispatcher

use crate::activation::{ActivationDispatcher, WindowHandle, bring_to_front, ui_context};
use crate::error::instance::InstanceError;
use crate::tests::support::{RecordingWindow, WindowEvent};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// **VALUE**: Verifies the foreground sequence on a minimized window.
///
/// **WHY THIS MATTERS**: A secondary launch exists only to surface the primary's window.
/// If the window stays minimized the user sees nothing happen.
///
/// **BUG THIS CATCHES**: Would catch if the minimized check is dropped or the topmost
/// toggle is reordered so the window ends up pinned on top.
#[test]
fn given_minimized_window_when_brought_to_front_then_restored_activated_and_toggled() {
    // GIVEN: A minimized window that is not topmost
    let window = RecordingWindow::minimized();

    // WHEN: Running the foreground sequence
    bring_to_front(&window);

    // THEN: Restore, activate, pin on top, then unpin
    assert_eq!(
        window.events(),
        vec![
            WindowEvent::Restored,
            WindowEvent::Activated,
            WindowEvent::Topmost(true),
            WindowEvent::Topmost(false),
        ]
    );
}

/// **VALUE**: Verifies that a window the user pinned on top stays pinned.
///
/// **WHY THIS MATTERS**: The topmost toggle is a focus trick, not a state change. Clearing
/// a user's always-on-top choice would be a visible regression.
///
/// **BUG THIS CATCHES**: Would catch if the toggle always ends with `set_topmost(false)`.
#[test]
fn given_topmost_window_when_brought_to_front_then_topmost_preserved_and_not_restored() {
    // GIVEN: A normal window already pinned on top
    let window = RecordingWindow::pinned();

    // WHEN: Running the foreground sequence
    bring_to_front(&window);

    // THEN: No restore, and the final topmost value is the original one
    assert_eq!(
        window.events(),
        vec![
            WindowEvent::Activated,
            WindowEvent::Topmost(true),
            WindowEvent::Topmost(true),
        ]
    );
}

/// **VALUE**: Verifies that activation before window registration is a silent no-op.
///
/// **WHY THIS MATTERS**: A secondary can launch while the primary is still building its
/// window. The signal must not error (which would fault the listener) or queue work.
///
/// **BUG THIS CATCHES**: Would catch if `activate()` posts a task or returns an error
/// when no window is registered.
#[test]
fn given_no_registered_window_when_activated_then_nothing_is_posted() {
    // GIVEN: A dispatcher without a window
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);

    // WHEN: Activating
    let result = dispatcher.activate();

    // THEN: Ok and the UI queue is empty
    assert!(result.is_ok(), "Activation without window should be Ok");
    assert_eq!(queue.run_pending(), 0, "No UI task should be queued");
    assert!(!dispatcher.is_window_registered());
}

/// **VALUE**: Verifies the window can only be registered once.
///
/// **WHY THIS MATTERS**: The listener reads the handle without a lock; publishing it a
/// second time would break the publish-once guarantee.
///
/// **BUG THIS CATCHES**: Would catch if a later registration silently replaces the first.
#[test]
fn given_registered_window_when_registering_again_then_first_window_kept() {
    // GIVEN: A dispatcher with a first window registered
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let first = Arc::new(RecordingWindow::minimized());
    let second = Arc::new(RecordingWindow::minimized());
    assert!(dispatcher.register_window(&first));

    // WHEN: Registering a second window and activating
    let registered_again = dispatcher.register_window(&second);
    dispatcher.activate().unwrap();
    queue.run_pending();

    // THEN: Second registration is refused and only the first window is touched
    assert!(!registered_again, "Second registration should be refused");
    assert!(!first.events().is_empty(), "First window should be activated");
    assert!(second.events().is_empty(), "Second window should be untouched");
}

/// **VALUE**: Verifies that activation runs on the UI queue, not inline.
///
/// **WHY THIS MATTERS**: Window APIs have thread affinity. The listener task must only
/// post work; the UI thread performs it.
///
/// **BUG THIS CATCHES**: Would catch if `activate()` calls the window directly.
#[test]
fn given_registered_window_when_activated_then_window_untouched_until_queue_runs() {
    // GIVEN: A registered, minimized window
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let window = Arc::new(RecordingWindow::minimized());
    dispatcher.register_window(&window);

    // WHEN: Activating
    dispatcher.activate().unwrap();

    // THEN: Nothing happens until the UI queue is drained
    assert!(window.events().is_empty(), "Window touched off the UI queue");
    assert_eq!(queue.run_pending(), 1);
    assert!(!window.is_minimized(), "Window should be restored");
}

/// **VALUE**: Verifies that a dropped window is not kept alive or touched.
///
/// **WHY THIS MATTERS**: The UI layer owns the window. The core holds a weak reference
/// so closing the window is never blocked by the listener.
///
/// **BUG THIS CATCHES**: Would catch if the dispatcher stores a strong `Arc`.
#[test]
fn given_dropped_window_when_activation_runs_then_task_is_noop() {
    // GIVEN: A window that is registered then dropped
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let window = Arc::new(RecordingWindow::minimized());
    dispatcher.register_window(&window);
    let weak = Arc::downgrade(&window);
    drop(window);

    // WHEN: Activating and running the queue
    dispatcher.activate().unwrap();
    let executed = queue.run_pending();

    // THEN: The task ran but the window is gone
    assert_eq!(executed, 1);
    assert!(weak.upgrade().is_none(), "Dispatcher must not keep the window alive");
}

/// **VALUE**: Verifies that posting to a closed UI queue is reported.
///
/// **WHY THIS MATTERS**: The listener treats a dispatch error as a fault. Silently
/// dropping activations after the UI has gone would hide a shutdown ordering bug.
///
/// **BUG THIS CATCHES**: Would catch if `post()` ignores the send error.
#[test]
fn given_closed_ui_queue_when_posting_then_dispatch_error() {
    // GIVEN: A dispatcher whose queue was dropped
    let (ui, queue) = ui_context();
    drop(queue);

    // WHEN: Posting a task
    let result = ui.post(|| {});

    // THEN: Dispatch error
    assert!(ui.is_closed());
    assert!(matches!(result, Err(InstanceError::Dispatch { .. })));
}

/// **VALUE**: Verifies the blocking UI loop runs queued tasks and stops on quit.
///
/// **WHY THIS MATTERS**: The application's main thread sits in `run_blocking`. If quit is
/// not honoured the process never gets to dispose the listener.
///
/// **BUG THIS CATCHES**: Would catch if tasks queued before the quit request are dropped
/// or if tasks after it are run.
#[test]
fn given_tasks_and_quit_when_run_blocking_then_runs_tasks_before_quit() {
    // GIVEN: Two tasks, a quit request, then another task
    let (ui, mut queue) = ui_context();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..2 {
        let counter = Arc::clone(&counter);
        ui.post(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    assert!(ui.request_quit());
    let late = Arc::clone(&counter);
    ui.post(move || {
        late.fetch_add(100, Ordering::SeqCst);
    })
    .unwrap();

    // WHEN: Running the loop on this thread
    let executed = queue.run_blocking();

    // THEN: Only the tasks before quit ran
    assert_eq!(executed, 2);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

/// **VALUE**: Verifies the loop also ends when every dispatcher is dropped.
///
/// **WHY THIS MATTERS**: Avoids a hung main thread if the app tears down its dispatchers
/// without sending quit.
///
/// **BUG THIS CATCHES**: Would catch if `run_blocking` waits forever on a closed channel.
#[test]
fn given_all_dispatchers_dropped_when_run_blocking_then_returns() {
    // GIVEN: A queue whose only dispatcher is dropped
    let (ui, mut queue) = ui_context();
    drop(ui);

    // WHEN/THEN: The loop returns immediately
    assert_eq!(queue.run_blocking(), 0);
}
