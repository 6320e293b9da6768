//! Client metrics.
//!
//! # Metrics
//! - `hlb_requests_total` (counter): API responses by method, status
//! - `hlb_request_retries_total` (counter): rate-limited attempts that were retried
//! - `hlb_credential_refresh_total` (counter): signed-header generations by outcome
//! - `hlb_reconcile_total` (counter): finished reconciliations by outcome
//!
//! # Design Decisions
//! - Only the `metrics` facade is used; the embedding application installs
//!   a recorder if it wants the values exported
//! - Labels are low-cardinality (no resource ids)

use ::metrics::counter;

pub fn record_request(method: &str, status: u16) {
    counter!(
        "hlb_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_retry() {
    counter!("hlb_request_retries_total").increment(1);
}

pub fn record_credential_refresh(outcome: &'static str) {
    counter!("hlb_credential_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_reconcile(outcome: &'static str) {
    counter!("hlb_reconcile_total", "outcome" => outcome).increment(1);
}
