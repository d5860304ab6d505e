use crate::error::instance::InstanceError;

use common::ErrorLocation;

use std::panic::Location;

use log::debug;
use tokio::sync::mpsc;

/// Work posted to the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

enum UiEvent {
    Run(UiTask),
    Quit,
}

/// Create the UI task queue.
///
/// The [`UiQueue`] belongs to the UI thread; [`UiDispatcher`] clones can be
/// handed to any task or thread that needs to run something there.
pub fn ui_context() -> (UiDispatcher, UiQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (UiDispatcher { sender }, UiQueue { receiver })
}

/// Sending half of the UI queue.
#[derive(Clone)]
pub struct UiDispatcher {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl UiDispatcher {
    /// Queue `task` to run on the UI thread.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::Dispatch`] if the [`UiQueue`] has been dropped.
    pub fn post<F>(&self, task: F) -> Result<(), InstanceError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .send(UiEvent::Run(Box::new(task)))
            .map_err(|_| InstanceError::Dispatch {
                message: String::from("UI queue is closed"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Ask the UI loop to return. Tasks queued before the request still run.
    pub fn request_quit(&self) -> bool {
        self.sender.send(UiEvent::Quit).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Receiving half of the UI queue. Tasks run on the thread that drives it.
pub struct UiQueue {
    receiver: mpsc::UnboundedReceiver<UiEvent>,
}

impl UiQueue {
    /// Run tasks on the current thread until a quit request arrives or every
    /// [`UiDispatcher`] is gone. Returns the number of tasks run.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async execution context.
    pub fn run_blocking(&mut self) -> usize {
        let mut executed = 0;

        while let Some(event) = self.receiver.blocking_recv() {
            match event {
                UiEvent::Run(task) => {
                    task();
                    executed += 1;
                }
                UiEvent::Quit => {
                    debug!("UI loop received quit request");
                    break;
                }
            }
        }

        executed
    }

    /// Wait for the next event and run it.
    ///
    /// Returns `false` on a quit request or when every dispatcher is gone.
    pub async fn run_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(UiEvent::Run(task)) => {
                task();
                true
            }
            Some(UiEvent::Quit) | None => false,
        }
    }

    /// Run everything already queued without waiting. Stops at a quit request.
    pub fn run_pending(&mut self) -> usize {
        let mut executed = 0;

        while let Ok(event) = self.receiver.try_recv() {
            match event {
                UiEvent::Run(task) => {
                    task();
                    executed += 1;
                }
                UiEvent::Quit => break,
            }
        }

        executed
    }
}
