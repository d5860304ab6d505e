use crate::helpers::{isolated_config, wait_until};

use instance_core::{InstanceRole, ListenerState, SingleInstance, ui_context};

use tempfile::tempdir;

// ============================================================================
// Public API tests for SingleInstance role decision and teardown
// ============================================================================

/// **VALUE**: Verifies the race-safety property: N concurrent launches, one primary.
///
/// **WHY THIS MATTERS**: Double-clicking the app icon several times launches processes
/// that all race for the endpoint. Two primaries means two windows and two listeners.
///
/// **BUG THIS CATCHES**: Would catch if the binder deletes a socket another launch has
/// just claimed, or if bind failures are not mapped to secondary.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_concurrent_launches_when_starting_then_exactly_one_primary() {
    // GIVEN: Eight launches against the same endpoint
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, _queue) = ui_context();

    // WHEN: Starting them all at once
    let mut launches = Vec::new();
    for _ in 0..8 {
        let config = config.clone();
        let ui = ui.clone();
        launches.push(tokio::spawn(async move {
            SingleInstance::start(&config, ui).await
        }));
    }
    let mut instances = Vec::new();
    for launch in launches {
        instances.push(launch.await.expect("launch task panicked"));
    }

    // THEN: Exactly one primary, seven secondaries
    let primaries = instances
        .iter()
        .filter(|instance| instance.role() == InstanceRole::Primary)
        .count();
    assert_eq!(primaries, 1, "Exactly one launch should become primary");

    for instance in &mut instances {
        instance.dispose().await;
    }
}

/// **VALUE**: Verifies a second launch observes the first as primary.
///
/// **BUG THIS CATCHES**: Would catch if the listener releases the endpoint after start.
#[tokio::test]
async fn given_running_primary_when_second_launch_starts_then_secondary() {
    // GIVEN: A running primary
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, _queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui.clone()).await;

    // WHEN: A second launch starts
    let secondary = SingleInstance::start(&config, ui).await;

    // THEN: Roles and listener states reflect the decision
    assert!(primary.is_primary_instance());
    assert_eq!(primary.listener_state(), ListenerState::Running);
    assert!(primary.is_listening());
    assert_eq!(secondary.role(), InstanceRole::Secondary);
    assert_eq!(secondary.listener_state(), ListenerState::NotStarted);
    assert!(!secondary.is_listening());

    primary.dispose().await;
}

/// **VALUE**: Verifies disposal releases the endpoint for the next launch.
///
/// **WHY THIS MATTERS**: After the primary exits, the next launch must become primary
/// instead of notifying nobody and exiting.
///
/// **BUG THIS CATCHES**: Would catch a listener task that keeps the OS primitive alive
/// after dispose.
#[tokio::test]
async fn given_disposed_primary_when_next_launch_starts_then_it_becomes_primary() {
    // GIVEN: A primary that has been disposed
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, _queue) = ui_context();
    let mut first = SingleInstance::start(&config, ui.clone()).await;
    first.dispose().await;
    assert_eq!(first.listener_state(), ListenerState::Disposed);

    // WHEN: The next launch starts
    let mut next = SingleInstance::start(&config, ui).await;

    // THEN: It is primary
    assert!(next.is_primary_instance());
    next.dispose().await;
}

/// **VALUE**: Verifies dispose is idempotent.
///
/// **WHY THIS MATTERS**: Shutdown paths (window close, Ctrl-C) may both call dispose.
///
/// **BUG THIS CATCHES**: Would catch a panic or hang on the second call.
#[tokio::test]
async fn given_disposed_primary_when_disposed_again_then_noop() {
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let (ui, _queue) = ui_context();
    let mut primary = SingleInstance::start(&config, ui).await;

    primary.dispose().await;
    primary.dispose().await;

    assert_eq!(primary.listener_state(), ListenerState::Disposed);
    assert!(!primary.is_listening());
}

#[cfg(unix)]
mod unix_socket {
    use super::*;

    use instance_core::RendezvousEndpoint;

    use std::os::unix::net::UnixListener as StdUnixListener;
    use std::path::PathBuf;
    use std::time::Duration;

    fn socket_path(instance: &SingleInstance) -> PathBuf {
        match instance.endpoint() {
            RendezvousEndpoint::SocketPath(path) => path.clone(),
            other => panic!("Expected socket endpoint, got {other}"),
        }
    }

    /// **VALUE**: Verifies a stale socket left by a crashed primary is recovered.
    ///
    /// **WHY THIS MATTERS**: Without recovery, a crash would lock the user out of the app
    /// until they found and deleted the socket file by hand.
    ///
    /// **BUG THIS CATCHES**: Would catch if existence of the file alone means secondary.
    #[tokio::test]
    async fn given_stale_socket_when_starting_then_primary() {
        // GIVEN: The endpoint path holds a socket nobody listens on
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let path = dir.path().join(&config.app_identifier);
        drop(StdUnixListener::bind(&path).unwrap());
        assert!(path.exists());

        // WHEN: Starting
        let (ui, _queue) = ui_context();
        let mut instance = SingleInstance::start(&config, ui).await;

        // THEN: Primary on that path
        assert!(instance.is_primary_instance());
        assert_eq!(socket_path(&instance), path);
        instance.dispose().await;
    }

    /// **VALUE**: Verifies the race-safety property when a crashed primary left its socket.
    ///
    /// **WHY THIS MATTERS**: After a crash the user tends to click the icon repeatedly.
    /// Every one of those launches finds the same stale file and tries to recover it.
    ///
    /// **BUG THIS CATCHES**: Would catch two launches both deleting and re-binding the
    /// path, which leaves two primaries with one of them unreachable.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn given_stale_socket_and_concurrent_launches_when_starting_then_exactly_one_primary() {
        let (ui, _queue) = ui_context();

        for round in 0..15 {
            // GIVEN: A stale socket at the endpoint path
            let dir = tempdir().unwrap();
            let config = isolated_config(&dir);
            let path = dir.path().join(&config.app_identifier);
            drop(StdUnixListener::bind(&path).unwrap());

            // WHEN: Sixteen launches start at once
            let mut launches = Vec::new();
            for _ in 0..16 {
                let config = config.clone();
                let ui = ui.clone();
                launches.push(tokio::spawn(async move {
                    SingleInstance::start(&config, ui).await
                }));
            }
            let mut instances = Vec::new();
            for launch in launches {
                instances.push(launch.await.expect("launch task panicked"));
            }

            // THEN: Exactly one primary, still reachable on the path
            let primaries = instances
                .iter()
                .filter(|instance| instance.is_primary_instance())
                .count();
            assert_eq!(primaries, 1, "round {round}: expected exactly one primary");
            let endpoint = instances[0].endpoint().clone();
            assert!(
                instance_core::try_notify_primary(&endpoint, Duration::from_secs(1))
                    .await
                    .is_ok(),
                "round {round}: primary should be reachable"
            );

            for instance in &mut instances {
                instance.dispose().await;
            }
        }
    }

    /// **VALUE**: Verifies dispose leaves a socket file that a later primary put in place.
    ///
    /// **WHY THIS MATTERS**: If the file was deleted under a running primary and another
    /// launch claimed the path, the old primary's shutdown must not cut the new one off.
    ///
    /// **BUG THIS CATCHES**: Would catch dispose unlinking by path without checking that
    /// the file is still the one it bound.
    #[tokio::test]
    async fn given_socket_replaced_by_successor_when_disposing_then_successor_file_kept() {
        // GIVEN: A primary whose socket file was replaced by a successor's socket
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let (ui, _queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui).await;
        let path = socket_path(&primary);
        std::fs::remove_file(&path).unwrap();
        let successor = StdUnixListener::bind(&path).unwrap();

        // WHEN: The old primary disposes
        primary.dispose().await;

        // THEN: The successor's socket is still there and connectable
        assert!(path.exists());
        assert!(std::os::unix::net::UnixStream::connect(&path).is_ok());
        drop(successor);
    }

    /// **VALUE**: Verifies dispose removes the socket file.
    ///
    /// **WHY THIS MATTERS**: A leftover file costs the next launch a stale-probe delay and
    /// relies on recovery that should not be needed after a clean exit.
    ///
    /// **BUG THIS CATCHES**: Would catch if teardown forgets the artifact.
    #[tokio::test]
    async fn given_primary_when_disposed_then_socket_file_removed() {
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let (ui, _queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui).await;
        let path = socket_path(&primary);
        assert!(path.exists(), "Primary should own the socket file");

        primary.dispose().await;

        assert!(!path.exists(), "Socket file should be removed on dispose");
    }

    /// **VALUE**: Verifies dispose tolerates the artifact already being gone.
    ///
    /// **WHY THIS MATTERS**: Temp cleaners may delete the socket while the app runs.
    ///
    /// **BUG THIS CATCHES**: Would catch a panic/unwrap on the deletion error.
    #[tokio::test]
    async fn given_socket_file_already_removed_when_disposing_then_no_error() {
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let (ui, _queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui).await;
        std::fs::remove_file(socket_path(&primary)).unwrap();

        primary.dispose().await;

        assert_eq!(primary.listener_state(), ListenerState::Disposed);
    }

    /// **VALUE**: Verifies a secondary never touches the primary's socket.
    ///
    /// **WHY THIS MATTERS**: A secondary exits right after notifying. If its teardown
    /// deleted the socket, the primary would become unreachable and the next launch
    /// would become a second primary.
    ///
    /// **BUG THIS CATCHES**: Would catch artifact removal that ignores the role.
    #[tokio::test]
    async fn given_secondary_when_disposed_or_dropped_then_primary_socket_kept() {
        // GIVEN: A primary and a secondary
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let (ui, _queue) = ui_context();
        let mut primary = SingleInstance::start(&config, ui.clone()).await;
        let mut secondary = SingleInstance::start(&config, ui).await;
        let path = socket_path(&primary);

        // WHEN: The secondary is disposed and dropped
        secondary.dispose().await;
        drop(secondary);

        // THEN: The primary's socket is still there and still listening
        assert!(path.exists());
        assert!(primary.is_listening());
        primary.dispose().await;
    }

    /// **VALUE**: Verifies dropping a primary without dispose still cleans up.
    ///
    /// **WHY THIS MATTERS**: Early returns and panics in the app shell skip `dispose()`.
    ///
    /// **BUG THIS CATCHES**: Would catch a missing `Drop` cleanup.
    #[tokio::test]
    async fn given_primary_when_dropped_without_dispose_then_socket_removed() {
        let dir = tempdir().unwrap();
        let config = isolated_config(&dir);
        let (ui, _queue) = ui_context();
        let primary = SingleInstance::start(&config, ui).await;
        let path = socket_path(&primary);

        drop(primary);

        assert!(wait_until(|| !path.exists()).await);
    }
}
