use overseer::app::{Launch, build_runtime, launch};

use instance_core::InstanceConfig;

use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

// ============================================================================
// Integration tests for the shell flow on top of instance-core
// ============================================================================

const WAIT_LIMIT: Duration = Duration::from_secs(2);

fn isolated_config(socket_dir: &TempDir) -> InstanceConfig {
    InstanceConfig {
        app_identifier: format!("ovr-app-{}", &Uuid::new_v4().simple().to_string()[..12]),
        socket_dir: Some(socket_dir.path().to_path_buf()),
        ..InstanceConfig::default()
    }
}

/// **VALUE**: Tests the whole launch sequence: primary runs, a second launch hands
/// over and exits, the primary's window comes to the front, then shuts down cleanly.
///
/// **WHY THIS MATTERS**: This is the closest we get to double-clicking the app icon
/// twice without a real GUI toolkit.
///
/// **BUG THIS CATCHES**: Would catch a shell that registers the window too late, a
/// secondary that keeps running, or a UI loop that never returns after shutdown.
#[test]
fn given_running_primary_when_second_launch_happens_then_window_activated_and_clean_exit() {
    // GIVEN: A primary launch
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_config(&dir);
    let runtime = build_runtime().unwrap();
    let Launch::Primary(app) = launch(&runtime, &config) else {
        panic!("First launch should be primary");
    };
    assert!(app.instance().is_listening());
    let window = app.window();

    // WHEN: A second launch happens on its own runtime and thread
    let second_config = config.clone();
    let second = std::thread::spawn(move || {
        let runtime = build_runtime().unwrap();
        matches!(launch(&runtime, &second_config), Launch::Secondary)
    });
    assert!(second.join().unwrap(), "Second launch should be secondary");

    // THEN: The UI loop runs the activation, then stops on shutdown
    let observed = app.window();
    let executed = app.run(&runtime, async move {
        let _ = tokio::time::timeout(WAIT_LIMIT, async {
            while observed.activation_count() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
    });

    assert_eq!(executed, 1, "Exactly one activation task should have run");
    assert_eq!(window.activation_count(), 1);

    // AND: The endpoint is free for the next launch
    let Launch::Primary(next) = launch(&runtime, &config) else {
        panic!("Launch after shutdown should be primary");
    };
    next.run(&runtime, async {});
}
