use crate::helpers::isolated_config;

use instance_core::{TransportResolver, notify_primary, try_notify_primary};

use std::time::{Duration, Instant};

use tempfile::tempdir;

/// Slack on top of the notify timeout for scheduler jitter on loaded CI hosts.
const TIMING_SLACK: Duration = Duration::from_millis(500);

/// **VALUE**: Verifies a secondary does not hang when no primary is listening.
///
/// **WHY THIS MATTERS**: The primary may exit between the secondary's bind attempt and
/// its notify. The secondary must still exit promptly instead of leaving a zombie launch.
///
/// **BUG THIS CATCHES**: Would catch an unbounded connect or a retry loop without a deadline.
#[tokio::test]
async fn given_no_primary_when_try_notify_then_error_within_timeout() {
    // GIVEN: An endpoint nobody owns
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let endpoint = TransportResolver::resolve(&config);

    // WHEN: Trying to notify
    let started = Instant::now();
    let result = try_notify_primary(&endpoint, config.notify_timeout()).await;

    // THEN: It fails, and quickly
    assert!(result.is_err(), "Notify without a primary should fail");
    assert!(
        started.elapsed() < config.notify_timeout() + TIMING_SLACK,
        "Notify took {:?}",
        started.elapsed()
    );
}

/// **VALUE**: Verifies the fire-and-forget form swallows the failure.
///
/// **BUG THIS CATCHES**: Would catch a panic on the notifier failure path.
#[tokio::test]
async fn given_no_primary_when_notify_then_returns_quietly() {
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let endpoint = TransportResolver::resolve(&config);

    let started = Instant::now();
    notify_primary(&endpoint, config.notify_timeout()).await;

    assert!(started.elapsed() < config.notify_timeout() + TIMING_SLACK);
}

/// **VALUE**: Verifies a stale socket file does not make the notifier hang or succeed.
///
/// **WHY THIS MATTERS**: A crashed primary leaves its socket behind; a secondary that
/// reported success in that case would exit and the user would see nothing.
///
/// **BUG THIS CATCHES**: Would catch treating "file exists" as "primary reachable".
#[cfg(unix)]
#[tokio::test]
async fn given_stale_socket_file_when_try_notify_then_error() {
    // GIVEN: A socket file with no listener behind it
    let dir = tempdir().unwrap();
    let config = isolated_config(&dir);
    let endpoint = TransportResolver::resolve(&config);
    let path = endpoint.artifact_path().unwrap().to_path_buf();
    drop(std::os::unix::net::UnixListener::bind(&path).unwrap());

    // WHEN: Trying to notify
    let result = try_notify_primary(&endpoint, config.notify_timeout()).await;

    // THEN: Delivery fails
    assert!(result.is_err());
}
