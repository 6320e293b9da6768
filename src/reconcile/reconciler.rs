//! Poll-until-settled loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReconcileConfig;
use crate::error::{HlbError, HlbResult};
use crate::lifecycle::{cancellable_sleep, run_cancellable};
use crate::observability::metrics;
use crate::reconcile::state::{ResourceState, StateClass};
use crate::resilience::backoff::calculate_backoff;

/// A resource whose lifecycle state can be observed.
pub trait Observed {
    fn state(&self) -> ResourceState;

    /// Backend explanation attached to a `failed` resource.
    fn failure_detail(&self) -> Option<String> {
        None
    }
}

/// Fresh read of a resource by id.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    type Resource: Observed + Send;

    /// Label used in errors, e.g. `"load balancer"`.
    fn kind(&self) -> &'static str;

    async fn read(&self, cancel: &CancellationToken, id: &str) -> HlbResult<Self::Resource>;
}

/// Waits for resources to reach a target state.
#[derive(Debug, Clone)]
pub struct Reconciler {
    poll_min: Duration,
    poll_max: Duration,
}

impl Reconciler {
    pub fn new(poll_min: Duration, poll_max: Duration) -> Self {
        Self { poll_min, poll_max }
    }

    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self::new(config.poll_min(), config.poll_max())
    }

    /// Poll `reader` until resource `id` is in one of `targets`.
    ///
    /// Stops with an error on `failed`, on a state outside the known
    /// progression, on a settled state that is not a target, on any read
    /// error, on cancellation, or when `timeout` elapses.
    pub async fn await_state<R>(
        &self,
        cancel: &CancellationToken,
        reader: &R,
        id: &str,
        targets: &[ResourceState],
        timeout: Duration,
    ) -> HlbResult<R::Resource>
    where
        R: ResourceReader + ?Sized,
    {
        let kind = reader.kind();
        let mut last_state: Option<ResourceState> = None;

        let outcome = tokio::time::timeout(
            timeout,
            self.poll(cancel, reader, id, targets, &mut last_state),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(HlbError::Timeout {
                kind,
                id: id.to_string(),
                target: format_targets(targets),
                last_state: last_state
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                timeout,
            }),
        };

        match &result {
            Ok(_) => {
                metrics::record_reconcile("success");
                info!(kind, id = %id, target = %format_targets(targets), "Resource reached target state");
            }
            Err(e) => {
                metrics::record_reconcile(outcome_label(e));
                warn!(kind, id = %id, error = %e, "Reconciliation stopped");
            }
        }
        result
    }

    async fn poll<R>(
        &self,
        cancel: &CancellationToken,
        reader: &R,
        id: &str,
        targets: &[ResourceState],
        last_state: &mut Option<ResourceState>,
    ) -> HlbResult<R::Resource>
    where
        R: ResourceReader + ?Sized,
    {
        let kind = reader.kind();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(HlbError::Cancelled);
            }

            let resource = run_cancellable(cancel, reader.read(cancel, id)).await?;
            let state = resource.state();
            *last_state = Some(state.clone());

            match state.classify() {
                StateClass::Failed => {
                    return Err(HlbError::ResourceFailed {
                        kind,
                        id: id.to_string(),
                        message: resource
                            .failure_detail()
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(|| "None".to_string()),
                    });
                }
                _ if targets.contains(&state) => return Ok(resource),
                StateClass::Transitional => {
                    let delay = calculate_backoff(attempt, self.poll_min, self.poll_max);
                    debug!(
                        kind,
                        id = %id,
                        state = %state,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Resource still transitioning"
                    );
                    attempt = attempt.saturating_add(1);
                    cancellable_sleep(cancel, delay).await?;
                }
                StateClass::Settled | StateClass::Unexpected => {
                    return Err(HlbError::UnexpectedState {
                        kind,
                        id: id.to_string(),
                        state: state.to_string(),
                    });
                }
            }
        }
    }
}

fn format_targets(targets: &[ResourceState]) -> String {
    let names: Vec<&str> = targets.iter().map(|s| s.as_str()).collect();
    format!("[{}]", names.join(", "))
}

fn outcome_label(error: &HlbError) -> &'static str {
    match error {
        HlbError::ResourceFailed { .. } => "failed",
        HlbError::UnexpectedState { .. } => "unexpected_state",
        HlbError::Timeout { .. } => "timeout",
        HlbError::Cancelled => "cancelled",
        _ => "read_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Snapshot {
        state: ResourceState,
        detail: Option<String>,
    }

    impl Observed for Snapshot {
        fn state(&self) -> ResourceState {
            self.state.clone()
        }

        fn failure_detail(&self) -> Option<String> {
            self.detail.clone()
        }
    }

    /// Replays a script of states; the last one repeats forever.
    struct ScriptedReader {
        script: Mutex<Vec<Snapshot>>,
        reads: AtomicUsize,
        fail_read: bool,
    }

    impl ScriptedReader {
        fn new(states: &[&str]) -> Self {
            Self {
                script: Mutex::new(
                    states
                        .iter()
                        .map(|s| Snapshot {
                            state: ResourceState::from(*s),
                            detail: None,
                        })
                        .collect(),
                ),
                reads: AtomicUsize::new(0),
                fail_read: false,
            }
        }

        fn with_detail(self, detail: &str) -> Self {
            for snapshot in self.script.lock().unwrap().iter_mut() {
                snapshot.detail = Some(detail.to_string());
            }
            self
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResourceReader for ScriptedReader {
        type Resource = Snapshot;

        fn kind(&self) -> &'static str {
            "load balancer"
        }

        async fn read(&self, _cancel: &CancellationToken, _id: &str) -> HlbResult<Snapshot> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_read {
                return Err(HlbError::Http { status: 503 });
            }
            let script = self.script.lock().unwrap();
            Ok(script[n.min(script.len() - 1)].clone())
        }
    }

    fn fast() -> Reconciler {
        Reconciler::new(Duration::from_millis(1), Duration::from_millis(5))
    }

    fn active() -> Vec<ResourceState> {
        vec![ResourceState::Active]
    }

    #[tokio::test]
    async fn test_create_converges_after_three_reads() {
        let reader = ScriptedReader::new(&["pending_creation", "creating", "active"]);
        let lb = fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(lb.state, ResourceState::Active);
        assert_eq!(reader.reads(), 3);
    }

    #[tokio::test]
    async fn test_update_progression_converges() {
        let reader = ScriptedReader::new(&["pending_update", "updating", "updating", "active"]);
        fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(reader.reads(), 4);
    }

    #[tokio::test]
    async fn test_failed_state_stops_immediately_with_detail() {
        let reader = ScriptedReader::new(&["failed", "active"]).with_detail("quota exceeded");
        let err = fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(reader.reads(), 1);
        assert_eq!(err.kind(), ErrorKind::ResourceState);
        assert_eq!(
            err.to_string(),
            "load balancer (lb-1) entered failed state, with message 'quota exceeded'"
        );
    }

    #[tokio::test]
    async fn test_failed_state_without_detail() {
        let reader = ScriptedReader::new(&["failed"]);
        let err = fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("with message 'None'"));
    }

    #[tokio::test]
    async fn test_stuck_transition_times_out() {
        let reader = ScriptedReader::new(&["updating"]);
        let err = fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        match err {
            HlbError::Timeout { last_state, target, .. } => {
                assert_eq!(last_state, "updating");
                assert_eq!(target, "[active]");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(reader.reads() > 1);
    }

    #[tokio::test]
    async fn test_delete_converges_after_two_reads() {
        let reader = ScriptedReader::new(&["deleting", "deleted"]);
        fast()
            .await_state(
                &CancellationToken::new(),
                &reader,
                "lb-1",
                &[ResourceState::Deleted],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(reader.reads(), 2);
    }

    #[tokio::test]
    async fn test_unknown_state_is_fatal() {
        let reader = ScriptedReader::new(&["unknown", "active"]);
        let err = fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(reader.reads(), 1);
        assert!(matches!(err, HlbError::UnexpectedState { ref state, .. } if state == "unknown"));
    }

    #[tokio::test]
    async fn test_settled_state_outside_targets_is_unexpected() {
        let reader = ScriptedReader::new(&["active"]);
        let err = fast()
            .await_state(
                &CancellationToken::new(),
                &reader,
                "lb-1",
                &[ResourceState::Deleted],
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HlbError::UnexpectedState { .. }));
        assert_eq!(reader.reads(), 1);
    }

    #[tokio::test]
    async fn test_read_error_is_fatal() {
        let mut reader = ScriptedReader::new(&["creating"]);
        reader.fail_read = true;
        let err = fast()
            .await_state(&CancellationToken::new(), &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, HlbError::Http { status: 503 }));
        assert_eq!(reader.reads(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_during_wait() {
        let reader = ScriptedReader::new(&["creating"]);
        let reconciler = Reconciler::new(Duration::from_secs(60), Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = reconciler
            .await_state(&cancel, &reader, "lb-1", &active(), Duration::from_secs(600))
            .await
            .unwrap_err();

        assert!(matches!(err, HlbError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(reader.reads(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_reads() {
        let reader = ScriptedReader::new(&["active"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fast()
            .await_state(&cancel, &reader, "lb-1", &active(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, HlbError::Cancelled));
        assert_eq!(reader.reads(), 0);
    }
}
