// Unit tests for the listener loop, driven by a scripted transport

use crate::activation::{ActivationDispatcher, ui_context};
use crate::config::ListenerFaultPolicy;
use crate::error::instance::InstanceError;
use crate::listener::{ListenerExit, ListenerHandle, ListenerState, ListenerStateCell, run_listener};
use crate::tests::support::{RecordingWindow, ScriptedListener, WindowEvent, line, protocol_fault};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

const STEP: Duration = Duration::from_secs(2);

/// **VALUE**: Guards the documented "one fault stops the listener" behavior.
///
/// **WHY THIS MATTERS**: With the default policy, a fault ends the loop permanently rather
/// than spinning on a broken transport. Changing that must be a deliberate decision
/// (see `ListenerFaultPolicy::Resilient`), not an accident.
///
/// **BUG THIS CATCHES**: Would catch if the default loop starts retrying after an error,
/// i.e. if the second `Activate` is dispatched.
#[tokio::test]
async fn given_stop_on_fault_when_fault_precedes_activate_then_later_activate_not_dispatched() {
    // GIVEN: Activate, a fault, then another Activate
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let window = Arc::new(RecordingWindow::default());
    dispatcher.register_window(&window);
    let listener = ScriptedListener::new(vec![line("Activate"), protocol_fault(), line("Activate")]);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // WHEN: Running the loop to completion
    let exit = timeout(
        STEP,
        run_listener(listener, dispatcher, ListenerFaultPolicy::StopOnFault, shutdown_rx),
    )
    .await
    .expect("Loop should end on its own after the fault");

    // THEN: The loop faulted and only the first activation was dispatched
    assert!(matches!(
        exit,
        ListenerExit::Faulted(InstanceError::Protocol { .. })
    ));
    assert_eq!(queue.run_pending(), 1, "Only one activation should be queued");
}

/// **VALUE**: Verifies the explicit hardening option keeps dispatching after a fault.
///
/// **WHY THIS MATTERS**: `Resilient` is the opt-in alternative to stop-on-fault; if it
/// silently behaves like the default the option is a lie.
///
/// **BUG THIS CATCHES**: Would catch if the policy is ignored by the loop.
#[tokio::test]
async fn given_resilient_policy_when_fault_precedes_activate_then_later_activate_dispatched() {
    // GIVEN: Activate, a fault, then another Activate
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let window = Arc::new(RecordingWindow::default());
    dispatcher.register_window(&window);
    let listener = ScriptedListener::new(vec![line("Activate"), protocol_fault(), line("Activate")]);

    // WHEN: Running the listener task
    let handle = ListenerHandle::spawn(listener, dispatcher, ListenerFaultPolicy::Resilient);
    let first = timeout(STEP, queue.run_next()).await.expect("first activation");
    let second = timeout(STEP, queue.run_next()).await.expect("second activation");

    // THEN: Both activations reached the UI, and the task is still alive
    assert!(first && second);
    assert!(!handle.is_finished(), "Resilient listener should keep running");
    assert!(matches!(
        handle.shutdown(STEP).await,
        Some(ListenerExit::Disposed)
    ));
}

/// **VALUE**: Verifies non-activation lines and empty connections are ignored, not faults.
///
/// **WHY THIS MATTERS**: Other launches probe the socket by connecting and hanging up.
/// Treating that as a fault would kill the listener on every launch race.
///
/// **BUG THIS CATCHES**: Would catch if `Ok(None)` or an unknown line ends the loop.
#[tokio::test]
async fn given_empty_connection_and_unknown_line_when_listening_then_ignored_and_activate_still_dispatched() {
    // GIVEN: An empty connection, an unknown line, a near-miss, then Activate
    let (ui, mut queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let window = Arc::new(RecordingWindow::minimized());
    dispatcher.register_window(&window);
    let listener = ScriptedListener::new(vec![
        Ok(None),
        line("Hello"),
        line("activate"),
        line("Activate"),
    ]);

    // WHEN: Running the listener task until the activation is queued
    let handle = ListenerHandle::spawn(listener, dispatcher, ListenerFaultPolicy::StopOnFault);
    let ran = timeout(STEP, queue.run_next()).await.expect("activation");

    // THEN: Exactly the Activate line was dispatched, and the loop is still running
    assert!(ran);
    assert_eq!(window.events()[0], WindowEvent::Restored);
    assert_eq!(queue.run_pending(), 0);
    assert!(!handle.is_finished());
    handle.shutdown(STEP).await;
}

/// **VALUE**: Verifies shutdown interrupts a listener parked in accept.
///
/// **WHY THIS MATTERS**: A listener blocked in accept must not outlive disposal and keep
/// the endpoint claimed.
///
/// **BUG THIS CATCHES**: Would catch if shutdown is only checked between iterations.
#[tokio::test]
async fn given_idle_listener_when_shutdown_then_returns_disposed_promptly() {
    // GIVEN: A listener with nothing to accept
    let (ui, _queue) = ui_context();
    let dispatcher = ActivationDispatcher::new(ui);
    let handle = ListenerHandle::spawn(
        ScriptedListener::new(Vec::new()),
        dispatcher,
        ListenerFaultPolicy::StopOnFault,
    );

    // WHEN: Shutting down
    let exit = handle.shutdown(STEP).await;

    // THEN: The task returned on its own (no abort needed)
    assert!(matches!(exit, Some(ListenerExit::Disposed)));
}

/// **VALUE**: Verifies a closed UI queue is a listener fault.
///
/// **WHY THIS MATTERS**: Once the UI has gone, activations can never be shown; the
/// default policy stops listening instead of accepting into the void.
///
/// **BUG THIS CATCHES**: Would catch if dispatch errors are swallowed by the loop.
#[tokio::test]
async fn given_closed_ui_queue_when_activate_received_then_listener_faults() {
    // GIVEN: A registered window but a dropped UI queue
    let (ui, queue) = ui_context();
    drop(queue);
    let dispatcher = ActivationDispatcher::new(ui);
    let window = Arc::new(RecordingWindow::default());
    dispatcher.register_window(&window);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // WHEN: An Activate arrives
    let exit = timeout(
        STEP,
        run_listener(
            ScriptedListener::new(vec![line("Activate")]),
            dispatcher,
            ListenerFaultPolicy::StopOnFault,
            shutdown_rx,
        ),
    )
    .await
    .expect("loop should fault");

    // THEN: Dispatch fault
    assert!(matches!(
        exit,
        ListenerExit::Faulted(InstanceError::Dispatch { .. })
    ));
}

/// **VALUE**: Verifies listener state only moves forward.
///
/// **WHY THIS MATTERS**: `dispose()` and `Drop` both rely on the Running→Disposed
/// transition succeeding exactly once.
///
/// **BUG THIS CATCHES**: Would catch a transition that ignores the expected current state.
#[test]
fn given_state_cell_when_transitioning_then_only_forward_moves_succeed() {
    // GIVEN: A fresh cell
    let cell = ListenerStateCell::default();
    assert_eq!(cell.get(), ListenerState::NotStarted);

    // WHEN/THEN: Disposing before running fails
    assert!(!cell.transition(ListenerState::Running, ListenerState::Disposed));

    // WHEN/THEN: NotStarted -> Running -> Disposed succeeds once
    assert!(cell.transition(ListenerState::NotStarted, ListenerState::Running));
    assert!(cell.transition(ListenerState::Running, ListenerState::Disposed));
    assert!(!cell.transition(ListenerState::Running, ListenerState::Disposed));
    assert!(!cell.transition(ListenerState::Disposed, ListenerState::Running));
    assert_eq!(cell.get(), ListenerState::Disposed);
}

/// **VALUE**: Verifies the state cell refuses to move backwards or stay in place.
///
/// **WHY THIS MATTERS**: `dispose` and `Drop` both rely on the Running -> Disposed move
/// happening once. A cell that could be put back to Running would let teardown run twice
/// and unlink a socket file that no longer belongs to this process.
///
/// **BUG THIS CATCHES**: Would catch a plain compare-exchange that accepts any pair whose
/// `from` matches the current state, including reverse moves.
#[test]
fn given_disposed_cell_when_moving_backwards_then_rejected_and_state_kept() {
    // GIVEN: A cell that has reached Disposed
    let cell = ListenerStateCell::default();
    assert!(!cell.transition(ListenerState::NotStarted, ListenerState::NotStarted));
    assert!(cell.transition(ListenerState::NotStarted, ListenerState::Running));
    assert!(!cell.transition(ListenerState::Running, ListenerState::Running));
    assert!(!cell.transition(ListenerState::Running, ListenerState::NotStarted));
    assert!(cell.transition(ListenerState::Running, ListenerState::Disposed));

    // WHEN: Attempting every reverse move
    let back_to_running = cell.transition(ListenerState::Disposed, ListenerState::Running);
    let back_to_start = cell.transition(ListenerState::Disposed, ListenerState::NotStarted);

    // THEN: Both rejected, state unchanged
    assert!(!back_to_running);
    assert!(!back_to_start);
    assert_eq!(cell.get(), ListenerState::Disposed);
}
