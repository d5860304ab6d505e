//! Application shell: role decision, window registration, UI loop, teardown.

use crate::error::OverseerError;
use crate::window::MainWindow;

use common::ErrorLocation;

use instance_core::{
    InstanceConfig, SingleInstance, UiDispatcher, UiQueue, notify_primary, ui_context,
};

use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

use log::{info, warn};
use tokio::runtime::{Builder, Runtime};

pub const WINDOW_TITLE: &str = "Remnant Overseer";

/// Multi-threaded runtime hosting the listener task. The UI loop stays on the
/// calling thread.
#[track_caller]
pub fn build_runtime() -> Result<Runtime, OverseerError> {
    Builder::new_multi_thread()
        .enable_all()
        .thread_name("overseer-worker")
        .build()
        .map_err(|e| OverseerError::Runtime {
            message: format!("Failed to build tokio runtime: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// What this launch turned out to be.
pub enum Launch {
    /// Another copy is running and has been asked to come to the front.
    Secondary,
    Primary(PrimaryApp),
}

/// Decide the role for this process.
///
/// A secondary notifies the primary before returning, so the caller only has
/// to exit.
pub fn launch(runtime: &Runtime, config: &InstanceConfig) -> Launch {
    let (ui, queue) = ui_context();
    let instance = runtime.block_on(SingleInstance::start(config, ui.clone()));

    if !instance.is_primary_instance() {
        info!("Another instance is running; handing over");
        runtime.block_on(notify_primary(instance.endpoint(), config.notify_timeout()));
        return Launch::Secondary;
    }

    let window = Arc::new(MainWindow::new(WINDOW_TITLE));
    if !instance.register_window(&window) {
        warn!("Main window was already registered");
    }
    info!("Primary instance listening on {}", instance.endpoint());

    Launch::Primary(PrimaryApp {
        instance,
        window,
        ui,
        queue,
    })
}

/// A primary launch that owns the main window and the UI queue.
pub struct PrimaryApp {
    instance: SingleInstance,
    window: Arc<MainWindow>,
    ui: UiDispatcher,
    queue: UiQueue,
}

impl PrimaryApp {
    pub fn window(&self) -> Arc<MainWindow> {
        Arc::clone(&self.window)
    }

    pub fn instance(&self) -> &SingleInstance {
        &self.instance
    }

    /// Drive the UI loop on the current thread until `shutdown` completes,
    /// then dispose the instance. Returns the number of UI tasks run.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async execution context.
    pub fn run<S>(self, runtime: &Runtime, shutdown: S) -> usize
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let PrimaryApp {
            mut instance,
            window,
            ui,
            mut queue,
        } = self;

        runtime.spawn(async move {
            shutdown.await;
            info!("Shutdown requested");
            ui.request_quit();
        });

        let executed = queue.run_blocking();
        info!(
            "UI loop finished after {executed} task(s), {} activation(s)",
            window.activation_count()
        );

        runtime.block_on(instance.dispose());
        executed
    }
}
