//! OS signal handling.
//!
//! # Responsibilities
//! - Translate Ctrl-C into cancellation of in-flight operations
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second Ctrl-C exits immediately

use tracing::{error, warn};

use crate::lifecycle::shutdown::Shutdown;

/// Exit status used when interrupted twice.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Spawn a task that triggers `shutdown` on Ctrl-C.
pub fn spawn_ctrl_c_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        warn!("Interrupt received, cancelling in-flight operations");
        shutdown.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt received, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
}
