//! Process-level single-instance contract.
//!
//! ```no_run
//! use instance_core::{InstanceConfig, SingleInstance, notify_primary, ui_context};
//!
//! # async fn launch() {
//! let config = InstanceConfig::default();
//! let (ui, _ui_queue) = ui_context();
//! let mut instance = SingleInstance::start(&config, ui).await;
//!
//! if !instance.is_primary_instance() {
//!     notify_primary(instance.endpoint(), config.notify_timeout()).await;
//!     return;
//! }
//!
//! // build the window, `instance.register_window(&window)`, run the UI loop
//! instance.dispose().await;
//! # }
//! ```

use crate::activation::{ActivationDispatcher, UiDispatcher, WindowHandle};
use crate::binder::try_become_primary;
use crate::config::InstanceConfig;
use crate::endpoint::{RendezvousEndpoint, TransportResolver};
use crate::listener::{ListenerHandle, ListenerState, ListenerStateCell};
#[cfg(unix)]
use crate::transport::{BoundListener, unix_socket::SocketArtifact};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceRole {
    Primary,
    Secondary,
}

/// Owns the rendezvous endpoint (when primary) and the listener task.
///
/// Created once by application startup and kept until shutdown. Call
/// [`SingleInstance::dispose`] before exiting; dropping without disposing does
/// a best-effort synchronous cleanup.
pub struct SingleInstance {
    role: InstanceRole,
    endpoint: RendezvousEndpoint,
    dispatcher: ActivationDispatcher,
    state: ListenerStateCell,
    listener: Option<ListenerHandle>,
    shutdown_timeout: Duration,
    #[cfg(unix)]
    artifact: Option<SocketArtifact>,
}

impl SingleInstance {
    /// Resolve the endpoint, try to claim it and, if that works, start listening.
    ///
    /// Never fails: any problem claiming the endpoint yields the secondary role.
    pub async fn start(config: &InstanceConfig, ui: UiDispatcher) -> Self {
        let endpoint = TransportResolver::resolve(config);
        Self::start_at(endpoint, config, ui).await
    }

    /// Same as [`SingleInstance::start`] with an already resolved endpoint.
    pub async fn start_at(
        endpoint: RendezvousEndpoint,
        config: &InstanceConfig,
        ui: UiDispatcher,
    ) -> Self {
        let dispatcher = ActivationDispatcher::new(ui);
        let state = ListenerStateCell::default();

        let bound = try_become_primary(&endpoint).await;

        #[cfg(unix)]
        let artifact = bound.as_ref().and_then(BoundListener::socket_artifact);

        let (role, listener) = match bound {
            Some(bound) => {
                let handle = ListenerHandle::spawn(bound, dispatcher.clone(), config.fault_policy);
                state.transition(ListenerState::NotStarted, ListenerState::Running);
                (InstanceRole::Primary, Some(handle))
            }
            None => (InstanceRole::Secondary, None),
        };

        info!("Instance role for {endpoint}: {role:?}");

        Self {
            role,
            endpoint,
            dispatcher,
            state,
            listener,
            shutdown_timeout: config.shutdown_timeout(),
            #[cfg(unix)]
            artifact,
        }
    }

    pub fn role(&self) -> InstanceRole {
        self.role
    }

    pub fn is_primary_instance(&self) -> bool {
        self.role == InstanceRole::Primary
    }

    pub fn endpoint(&self) -> &RendezvousEndpoint {
        &self.endpoint
    }

    pub fn listener_state(&self) -> ListenerState {
        self.state.get()
    }

    /// Whether the listener task is still accepting connections.
    ///
    /// `false` on a secondary, after disposal, and after a fault stopped the loop.
    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Register the main window once it exists. Later calls are ignored.
    pub fn register_window<W>(&self, window: &Arc<W>) -> bool
    where
        W: WindowHandle + 'static,
    {
        self.dispatcher.register_window(window)
    }

    /// Stop listening, release the endpoint and remove the socket file.
    ///
    /// Idempotent. Does nothing on a secondary.
    pub async fn dispose(&mut self) {
        if !self
            .state
            .transition(ListenerState::Running, ListenerState::Disposed)
        {
            return;
        }

        if let Some(handle) = self.listener.take() {
            handle.shutdown(self.shutdown_timeout).await;
        }

        self.remove_owned_artifact();

        info!("Single-instance listener disposed ({})", self.endpoint);
    }

    /// Unlink the socket file this instance bound, unless another launch has
    /// replaced it since.
    #[cfg(unix)]
    fn remove_owned_artifact(&self) {
        if let Some(artifact) = &self.artifact {
            artifact.remove();
        }
    }

    #[cfg(not(unix))]
    fn remove_owned_artifact(&self) {}
}

impl Drop for SingleInstance {
    fn drop(&mut self) {
        if !self
            .state
            .transition(ListenerState::Running, ListenerState::Disposed)
        {
            return;
        }

        debug!("SingleInstance dropped without dispose, cleaning up");

        if let Some(handle) = self.listener.take() {
            handle.abort();
        }

        self.remove_owned_artifact();
    }
}
