//! Cancellation plumbing shared by the transport, the reconciler and the CLI.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{HlbError, HlbResult};

/// Owner of the root cancellation token for one CLI invocation.
///
/// Operations receive child tokens, so cancelling the root aborts every
/// in-flight request and reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for one operation.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn cancellable_sleep(cancel: &CancellationToken, duration: Duration) -> HlbResult<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(HlbError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Drive `future` to completion unless `cancel` fires first.
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, future: F) -> HlbResult<T>
where
    F: Future<Output = HlbResult<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(HlbError::Cancelled),
        result = future => result,
    }
}
