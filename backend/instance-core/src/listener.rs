//! Primary-side listener task.
//!
//! Accepts one connection at a time, reads one line, dispatches `Activate`,
//! and loops. Connections are handled strictly in arrival order.
//!
//! # Faults
//!
//! With [`ListenerFaultPolicy::StopOnFault`] (the default) the first error in
//! accept/read/dispatch ends the task for good and later activation signals
//! are no longer handled. [`ListenerFaultPolicy::Resilient`] logs the error and
//! keeps going.

use crate::activation::ActivationDispatcher;
use crate::config::ListenerFaultPolicy;
use crate::error::instance::InstanceError;
use crate::protocol::ActivationMessage;
use crate::transport::RendezvousListener;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::spawn as TokioSpawn;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};

/// Pause before the next accept after a tolerated fault, so a broken
/// listener cannot spin.
const RESILIENT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Lifecycle of the listener. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    NotStarted = 0,
    Running = 1,
    Disposed = 2,
}

/// [`ListenerState`] shared between the owner and any observer.
#[derive(Debug, Clone, Default)]
pub(crate) struct ListenerStateCell {
    state: Arc<AtomicU8>,
}

impl ListenerStateCell {
    pub(crate) fn get(&self) -> ListenerState {
        match self.state.load(Ordering::Acquire) {
            0 => ListenerState::NotStarted,
            1 => ListenerState::Running,
            _ => ListenerState::Disposed,
        }
    }

    /// Move from `from` to `to`. Returns `false` if the current state is not
    /// `from` or if `to` does not come after `from`.
    pub(crate) fn transition(&self, from: ListenerState, to: ListenerState) -> bool {
        if (to as u8) <= (from as u8) {
            return false;
        }

        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Why the listener task returned.
#[derive(Debug)]
pub enum ListenerExit {
    Disposed,
    Faulted(InstanceError),
}

/// Run the accept loop until shutdown is signalled or a fault ends it.
pub(crate) async fn run_listener<L>(
    mut listener: L,
    dispatcher: ActivationDispatcher,
    policy: ListenerFaultPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> ListenerExit
where
    L: RendezvousListener,
{
    info!("Activation listener started ({policy:?})");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let received = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            received = listener.accept_line() => received,
        };

        let outcome = match received {
            Ok(Some(line)) => handle_line(&line, &dispatcher),
            Ok(None) => {
                debug!("Peer disconnected without sending a message");
                Ok(())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            match policy {
                ListenerFaultPolicy::StopOnFault => {
                    error!("Activation listener stopped after fault: {e}");
                    return ListenerExit::Faulted(e);
                }
                ListenerFaultPolicy::Resilient => {
                    warn!("Activation listener fault, continuing: {e}");
                    TokioSleep(RESILIENT_RETRY_DELAY).await;
                }
            }
        }
    }

    info!("Activation listener shut down");
    ListenerExit::Disposed
}

fn handle_line(line: &str, dispatcher: &ActivationDispatcher) -> Result<(), InstanceError> {
    if ActivationMessage::matches(line) {
        info!("Activation request received");
        dispatcher.activate()
    } else {
        debug!("Ignoring unrecognized message ({} bytes)", line.len());
        Ok(())
    }
}

/// Owned handle to the spawned listener task.
pub(crate) struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<ListenerExit>,
}

impl ListenerHandle {
    pub(crate) fn spawn<L>(
        listener: L,
        dispatcher: ActivationDispatcher,
        policy: ListenerFaultPolicy,
    ) -> Self
    where
        L: RendezvousListener,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = TokioSpawn(run_listener(listener, dispatcher, policy, shutdown_rx));
        Self { shutdown, task }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal shutdown and wait up to `grace` for the task to return.
    ///
    /// If it does not, the task is aborted, which drops the transport and
    /// unblocks whatever it was waiting on.
    pub(crate) async fn shutdown(mut self, grace: Duration) -> Option<ListenerExit> {
        let _ = self.shutdown.send(true);

        match TokioTimeout(grace, &mut self.task).await {
            Ok(Ok(exit)) => {
                debug!("Listener task joined: {exit:?}");
                Some(exit)
            }
            Ok(Err(e)) => {
                let e = InstanceError::from(e);
                warn!("Listener task ended abnormally: {e}");
                Some(ListenerExit::Faulted(e))
            }
            Err(_) => {
                warn!("Listener task did not stop within {grace:?}, aborting");
                self.task.abort();
                None
            }
        }
    }

    /// Synchronous variant for `Drop`: signal and abort without waiting.
    pub(crate) fn abort(self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}
