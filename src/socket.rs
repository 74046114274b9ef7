//! Unix socket lifecycle for the plugin endpoint.
//!
//! The socket sits in its own directory so access is controlled at the
//! directory level: the directory is wiped and recreated with mode 0700 on
//! every start, and removed again on shutdown.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tokio::net::UnixListener;
use tracing::{info, warn};

const SOCKET_DIR_MODE: u32 = 0o700;

/// Binds the plugin listener, clearing any stale socket first.
pub fn bind(path: &Path) -> io::Result<UnixListener> {
    if let Some(dir) = path.parent() {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(SOCKET_DIR_MODE))?;
    }

    let listener = UnixListener::bind(path)?;
    info!(socket = %path.display(), "listening");
    Ok(listener)
}

/// Removes the socket directory on shutdown. Failures are logged, not fatal.
pub fn cleanup(path: &Path) {
    let Some(dir) = path.parent() else { return };
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(error = %e, "failed to remove socket directory");
        }
    }
}
