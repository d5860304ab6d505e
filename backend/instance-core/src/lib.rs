//! Single-instance coordination for the Overseer desktop application.
//!
//! The first process to claim the rendezvous endpoint becomes the **primary**
//! and listens for activation signals. Later launches become **secondary**,
//! send one `Activate` line to the primary and exit.
//!
//! # Flow
//!
//! ```text
//! secondary: TransportResolver -> notifier (connect, "Activate\n", close)
//! primary:   binder -> listener (accept, read line) -> ActivationDispatcher -> UiQueue
//! ```
//!
//! Window mutation never happens on the listener task. The dispatcher posts a
//! closure to the [`activation::UiQueue`] owned by the UI thread.

pub mod activation;
pub mod binder;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod instance;
pub mod listener;
pub mod notifier;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod tests;

pub use activation::{ActivationDispatcher, UiDispatcher, UiQueue, WindowHandle, ui_context};
pub use config::{InstanceConfig, ListenerFaultPolicy, TransportStrategy};
pub use endpoint::{HostPlatform, RendezvousEndpoint, TransportResolver};
pub use instance::{InstanceRole, SingleInstance};
pub use listener::{ListenerExit, ListenerState};
pub use notifier::{notify_primary, try_notify_primary};

/// Fixed application identifier every launch derives its endpoint from.
pub const APP_IDENTIFIER: &str = "remnant_overseer_ipc";

/// Loopback port used by the TCP rendezvous strategy.
pub const DEFAULT_INSTANCE_PORT: u16 = 23456;

pub const LOOPBACK_HOSTNAME: &str = "127.0.0.1";

/// Windows named-pipe namespace prefix.
pub const PIPE_NAMESPACE: &str = r"\\.\pipe\";

pub const DEFAULT_PIPE_NAME: &str = const_format::concatcp!(PIPE_NAMESPACE, APP_IDENTIFIER);
