//! Loopback transport tests. They share a fixed port, so each one is `#[serial]`.

use crate::helpers::{
    RecordingWindow, expect_no_ui_task, expect_ui_task, loopback_config, wait_until,
};

use instance_core::{
    ListenerFaultPolicy, RendezvousEndpoint, SingleInstance, notify_primary, ui_context,
};

use std::sync::Arc;

use serial_test::serial;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

async fn send_raw(endpoint: &RendezvousEndpoint, bytes: &[u8]) {
    let RendezvousEndpoint::Loopback(port) = endpoint else {
        panic!("Expected loopback endpoint, got {endpoint}");
    };
    let mut stream = TcpStream::connect(("127.0.0.1", *port))
        .await
        .expect("connect to primary");
    stream.write_all(bytes).await.expect("write raw bytes");
    stream.shutdown().await.ok();
}

/// **VALUE**: Verifies the loopback strategy decides roles and activates like the native one.
///
/// **WHY THIS MATTERS**: Loopback is the portable fallback; it must behave the same way
/// from the shell's point of view.
///
/// **BUG THIS CATCHES**: Would catch a port bind that does not map conflicts to secondary.
#[tokio::test]
#[serial]
async fn given_loopback_primary_when_secondary_notifies_then_window_activated() {
    // GIVEN: A loopback primary with a registered window
    let config = loopback_config(ListenerFaultPolicy::StopOnFault);
    let (ui, mut queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui.clone()).await;
    assert!(primary.is_primary_instance());
    assert_eq!(primary.endpoint(), &RendezvousEndpoint::Loopback(config.loopback_port));
    let window = Arc::new(RecordingWindow::minimized());
    primary.register_window(&window);

    // WHEN: A second launch starts and notifies
    let secondary = SingleInstance::start(&config, ui).await;
    assert!(!secondary.is_primary_instance());
    notify_primary(secondary.endpoint(), config.notify_timeout()).await;

    // THEN: One activation
    expect_ui_task(&mut queue).await;
    assert_eq!(window.activation_count(), 1);

    primary.dispose().await;
}

/// **VALUE**: Regression guard: under the default policy, a malformed line ends listening.
///
/// **BUG THIS CATCHES**: Would catch a silent behavior change of the default policy.
#[tokio::test]
#[serial]
async fn given_default_policy_when_invalid_utf8_received_then_listener_stops() {
    // GIVEN: A loopback primary with the default policy
    let config = loopback_config(ListenerFaultPolicy::StopOnFault);
    let (ui, mut queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui).await;
    assert!(primary.is_primary_instance());
    let window = Arc::new(RecordingWindow::default());
    primary.register_window(&window);

    // WHEN: A peer sends bytes that are not UTF-8
    send_raw(primary.endpoint(), b"\xc3\x28\n").await;

    // THEN: The listener stops, and later activations are not dispatched
    assert!(wait_until(|| !primary.is_listening()).await);
    notify_primary(primary.endpoint(), config.notify_timeout()).await;
    expect_no_ui_task(&mut queue).await;
    assert_eq!(window.activation_count(), 0);

    primary.dispose().await;
}

/// **VALUE**: Verifies the resilient policy keeps serving after a malformed line.
///
/// **BUG THIS CATCHES**: Would catch the policy not being wired through `start`.
#[tokio::test]
#[serial]
async fn given_resilient_policy_when_invalid_utf8_received_then_activation_still_dispatched() {
    let config = loopback_config(ListenerFaultPolicy::Resilient);
    let (ui, mut queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui).await;
    assert!(primary.is_primary_instance());
    let window = Arc::new(RecordingWindow::default());
    primary.register_window(&window);

    send_raw(primary.endpoint(), b"\xc3\x28\n").await;
    notify_primary(primary.endpoint(), config.notify_timeout()).await;

    expect_ui_task(&mut queue).await;
    assert_eq!(window.activation_count(), 1);
    assert!(primary.is_listening());

    primary.dispose().await;
}

/// **VALUE**: Verifies dispose releases the port for the next launch.
///
/// **BUG THIS CATCHES**: Would catch an aborted task that still holds the listener.
#[tokio::test]
#[serial]
async fn given_disposed_loopback_primary_when_restarting_then_port_reclaimed() {
    let config = loopback_config(ListenerFaultPolicy::StopOnFault);
    let (ui, _queue) = ui_context();
    let mut first = SingleInstance::start(&config, ui.clone()).await;
    assert!(first.is_primary_instance());
    first.dispose().await;

    let mut second = SingleInstance::start(&config, ui).await;

    assert!(second.is_primary_instance());
    second.dispose().await;
}
