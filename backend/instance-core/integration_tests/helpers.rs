//! Test helpers for single-instance integration tests.
//!
//! - Unique endpoints per test (temp socket dir + random identifier)
//! - A recording window implementation
//! - Polling and UI-queue helpers

use instance_core::{InstanceConfig, ListenerFaultPolicy, TransportStrategy, WindowHandle};

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

/// Upper bound for any single step that should complete "immediately".
pub const STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait when asserting that something does NOT happen.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Loopback port reserved for this test binary. Tests using it are `#[serial]`.
pub const TEST_LOOPBACK_PORT: u16 = 38461;

/// Config with a socket dir and identifier nobody else uses.
pub fn isolated_config(socket_dir: &TempDir) -> InstanceConfig {
    InstanceConfig {
        app_identifier: format!("ovr-{}", &Uuid::new_v4().simple().to_string()[..12]),
        socket_dir: Some(socket_dir.path().to_path_buf()),
        ..InstanceConfig::default()
    }
}

pub fn loopback_config(policy: ListenerFaultPolicy) -> InstanceConfig {
    InstanceConfig {
        transport: TransportStrategy::Loopback,
        loopback_port: TEST_LOOPBACK_PORT,
        fault_policy: policy,
        ..InstanceConfig::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Restored,
    Activated,
    Topmost(bool),
}

/// Window stand-in that records calls made on it.
#[derive(Default)]
pub struct RecordingWindow {
    minimized: AtomicBool,
    topmost: AtomicBool,
    events: Mutex<Vec<WindowEvent>>,
}

impl RecordingWindow {
    pub fn minimized() -> Self {
        let window = Self::default();
        window.minimized.store(true, Ordering::SeqCst);
        window
    }

    pub fn events(&self) -> Vec<WindowEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn activation_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == WindowEvent::Activated)
            .count()
    }

    fn record(&self, event: WindowEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl WindowHandle for RecordingWindow {
    fn is_minimized(&self) -> bool {
        self.minimized.load(Ordering::SeqCst)
    }

    fn restore(&self) {
        self.minimized.store(false, Ordering::SeqCst);
        self.record(WindowEvent::Restored);
    }

    fn activate(&self) {
        self.record(WindowEvent::Activated);
    }

    fn is_topmost(&self) -> bool {
        self.topmost.load(Ordering::SeqCst)
    }

    fn set_topmost(&self, topmost: bool) {
        self.topmost.store(topmost, Ordering::SeqCst);
        self.record(WindowEvent::Topmost(topmost));
    }
}

/// Test helper: Run the next UI task, failing the test if none arrives in time.
pub async fn expect_ui_task(queue: &mut instance_core::UiQueue) {
    let ran = tokio::time::timeout(STEP_TIMEOUT, queue.run_next())
        .await
        .expect("Expected an activation task on the UI queue");
    assert!(ran, "UI queue closed instead of delivering a task");
}

/// Test helper: Assert that no UI task arrives within the quiet period.
pub async fn expect_no_ui_task(queue: &mut instance_core::UiQueue) {
    let result = tokio::time::timeout(QUIET_PERIOD, queue.run_next()).await;
    assert!(result.is_err(), "Unexpected task on the UI queue");
}

/// Test helper: Poll `condition` until it holds or the step timeout passes.
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
