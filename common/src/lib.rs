//! Shared building blocks for the Overseer workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): types every other crate needs, currently error locations
//! - **instance-core**: single-instance coordination (rendezvous, listener, notifier)
//! - **overseer**: the application shell wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
