use crate::helpers::{
    RecordingWindow, WindowEvent, expect_no_ui_task, expect_ui_task, isolated_config,
};

use instance_core::{SingleInstance, notify_primary, try_notify_primary, ui_context};

use std::sync::Arc;

use tempfile::tempdir;

// ============================================================================
// End-to-end: secondary notify -> primary listener -> UI queue -> window
// ============================================================================

/// **VALUE**: Verifies the full activation path brings a minimized window to the front.
///
/// **WHY THIS MATTERS**: This is the user-visible purpose of the whole subsystem: launch
/// the app again, and the running window comes back.
///
/// **BUG THIS CATCHES**: Would catch a break anywhere in the chain: wrong endpoint on the
/// notifier side, framing mismatch, dispatcher not posting, wrong window sequence.
#[tokio::test]
async fn given_minimized_primary_window_when_secondary_notifies_then_window_restored_once() {
    // GIVEN: A primary with a minimized, registered window
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, mut queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui.clone()).await;
    let window = Arc::new(RecordingWindow::minimized());
    assert!(primary.register_window(&window));

    // WHEN: A secondary launch notifies the primary
    let secondary = SingleInstance::start(&config, ui).await;
    assert!(!secondary.is_primary_instance());
    notify_primary(secondary.endpoint(), config.notify_timeout()).await;

    // THEN: Exactly one activation, window restored and foregrounded
    expect_ui_task(&mut queue).await;
    expect_no_ui_task(&mut queue).await;
    assert_eq!(
        window.events(),
        vec![
            WindowEvent::Restored,
            WindowEvent::Activated,
            WindowEvent::Topmost(true),
            WindowEvent::Topmost(false),
        ]
    );

    primary.dispose().await;
}

/// **VALUE**: Verifies N notifications yield N sequential activations.
///
/// **WHY THIS MATTERS**: Activation signals are neither coalesced nor dropped; a burst
/// of launches must not wedge the listener.
///
/// **BUG THIS CATCHES**: Would catch a listener that stops after the first connection.
#[tokio::test]
async fn given_primary_when_notified_three_times_then_three_activations() {
    // GIVEN: A primary with a registered window
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, mut queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui).await;
    let window = Arc::new(RecordingWindow::default());
    primary.register_window(&window);

    // WHEN: Three secondaries notify one after another
    for _ in 0..3 {
        try_notify_primary(primary.endpoint(), config.notify_timeout())
            .await
            .expect("primary should accept the notification");
    }

    // THEN: Three activations reach the window
    for _ in 0..3 {
        expect_ui_task(&mut queue).await;
    }
    assert_eq!(window.activation_count(), 3);

    primary.dispose().await;
}

/// **VALUE**: Verifies a signal that arrives before the window exists is ignored safely.
///
/// **WHY THIS MATTERS**: The second launch can beat the primary's window construction.
/// That must neither crash nor stop the listener.
///
/// **BUG THIS CATCHES**: Would catch an unregistered window being treated as a fault,
/// which under the default policy would kill the listener for good.
#[tokio::test]
async fn given_no_window_yet_when_notified_then_ignored_and_listener_keeps_running() {
    // GIVEN: A primary without a registered window
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, mut queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui).await;

    // WHEN: Notified before registration, then registered and notified again
    notify_primary(primary.endpoint(), config.notify_timeout()).await;
    expect_no_ui_task(&mut queue).await;
    let window = Arc::new(RecordingWindow::default());
    primary.register_window(&window);
    notify_primary(primary.endpoint(), config.notify_timeout()).await;

    // THEN: Only the second notification activates the window
    expect_ui_task(&mut queue).await;
    assert_eq!(window.activation_count(), 1);
    assert!(primary.is_listening());

    primary.dispose().await;
}

#[cfg(unix)]
mod malformed_peer {
    use super::*;

    use crate::helpers::wait_until;

    use instance_core::{ListenerFaultPolicy, RendezvousEndpoint};

    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;

    async fn send_raw(endpoint: &RendezvousEndpoint, bytes: &[u8]) {
        let RendezvousEndpoint::SocketPath(path) = endpoint else {
            panic!("Expected socket endpoint, got {endpoint}");
        };
        let mut stream = UnixStream::connect(path).await.expect("connect to primary");
        stream.write_all(bytes).await.expect("write raw bytes");
        stream.shutdown().await.ok();
    }

    /// **VALUE**: Regression guard for "one malformed message stops the listener".
    ///
    /// **WHY THIS MATTERS**: With the default policy, a fault ends listening for the rest
    /// of the primary's life. This test pins that behavior so changing it is a decision.
    ///
    /// **BUG THIS CATCHES**: Would catch an accidental retry in the default loop.
    #[tokio::test]
    async fn given_default_policy_when_malformed_message_received_then_later_activate_ignored() {
        // GIVEN: A primary with a registered window and the default policy
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        assert_eq!(config.fault_policy, ListenerFaultPolicy::StopOnFault);
        let (ui, mut queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui).await;
        let window = Arc::new(RecordingWindow::default());
        primary.register_window(&window);

        // WHEN: A peer sends invalid UTF-8, then a secondary sends Activate
        send_raw(primary.endpoint(), b"\xff\xfe\n").await;
        assert!(
            wait_until(|| !primary.is_listening()).await,
            "Listener should stop after the malformed message"
        );
        notify_primary(primary.endpoint(), config.notify_timeout()).await;

        // THEN: The activation is never dispatched
        expect_no_ui_task(&mut queue).await;
        assert_eq!(window.activation_count(), 0);

        primary.dispose().await;
    }

    /// **VALUE**: Verifies the hardened policy survives a malformed message.
    ///
    /// **BUG THIS CATCHES**: Would catch the resilient option being ignored end-to-end.
    #[tokio::test]
    async fn given_resilient_policy_when_malformed_message_received_then_later_activate_dispatched()
    {
        // GIVEN: A primary configured to tolerate faults
        let dir = tempdir().unwrap();
        let config = instance_core::InstanceConfig {
            fault_policy: ListenerFaultPolicy::Resilient,
            ..isolated_config(&dir)
        };
        let (ui, mut queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui).await;
        let window = Arc::new(RecordingWindow::default());
        primary.register_window(&window);

        // WHEN: Malformed message, then Activate
        send_raw(primary.endpoint(), b"\xff\xfe\n").await;
        notify_primary(primary.endpoint(), config.notify_timeout()).await;

        // THEN: Activation still happens
        expect_ui_task(&mut queue).await;
        assert_eq!(window.activation_count(), 1);
        assert!(primary.is_listening());

        primary.dispose().await;
    }

    /// **VALUE**: Verifies unknown text is ignored without stopping the listener.
    ///
    /// **BUG THIS CATCHES**: Would catch unknown-but-valid lines being treated as faults.
    #[tokio::test]
    async fn given_unknown_message_when_received_then_ignored_and_activate_still_works() {
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let (ui, mut queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui).await;
        let window = Arc::new(RecordingWindow::default());
        primary.register_window(&window);

        send_raw(primary.endpoint(), b"Hello\n").await;
        notify_primary(primary.endpoint(), config.notify_timeout()).await;

        expect_ui_task(&mut queue).await;
        assert_eq!(window.activation_count(), 1);
        assert!(primary.is_listening());

        primary.dispose().await;
    }
}
