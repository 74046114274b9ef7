//! Environment-driven configuration.
//!
//! The plugin needs exactly two settings: where to put its socket and what
//! host identity to report. Both come from the environment with working
//! defaults, so running with no configuration at all does the right thing.

use std::path::PathBuf;

use tracing::warn;

pub const DEFAULT_SOCKET_PATH: &str = "/var/run/scope/plugins/iowait/iowait.sock";

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub socket_path: PathBuf,
    pub host_id: String,
}

impl PluginConfig {
    /// Reads configuration from the environment, falling back to defaults.
    /// Never fails: a missing hostname degrades to `localhost` with a
    /// warning.
    pub fn load() -> Self {
        let socket_path = std::env::var("IOWAIT_SOCKET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SOCKET_PATH));
        let host_id = std::env::var("IOWAIT_HOST_ID").unwrap_or_else(|_| default_host_id());

        Self {
            socket_path,
            host_id,
        }
    }
}

fn default_host_id() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, "could not read hostname, reporting as localhost");
            "localhost".to_string()
        }
    }
}
