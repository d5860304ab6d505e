//! Startup configuration for the single-instance subsystem.

use instance_core::InstanceConfig;

use std::path::Path;

use log::warn;

/// Load `instance.json` from `config_dir`, falling back to defaults.
///
/// A broken config file never keeps the app from starting: the error is
/// logged and [`InstanceConfig::default`] is used instead.
pub fn load_instance_config(config_dir: &Path) -> InstanceConfig {
    InstanceConfig::load(config_dir).unwrap_or_else(|e| {
        warn!("Using default instance config: {e}");
        InstanceConfig::default()
    })
}
