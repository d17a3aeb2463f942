//! Entitlement gate metrics.
//!
//! | Metric | Kind | Labels |
//! |---|---|---|
//! | `patron_client_status_checks_total` | counter | `outcome` |
//! | `patron_client_request_duration_seconds` | histogram | `outcome` |
//! | `patron_client_retries_total` | counter | `operation`, `retry` |
//! | `patron_client_cache_lookups_total` | counter | `result` |
//! | `patron_client_status_fetches_total` | counter | `kind` |
//! | `patron_client_guard_redirects_total` | counter | `kind` |
//!
//! Everything goes through the `metrics` facade, so nothing is recorded until
//! the host installs a recorder.

use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use patron_types::StatusKind;

/// Counter of status checks, by outcome.
pub const STATUS_CHECKS_TOTAL: &str = "patron_client_status_checks_total";
/// Histogram of status check latency, by outcome.
pub const REQUEST_DURATION_SECONDS: &str = "patron_client_request_duration_seconds";
/// Counter of retries, by operation and retry number.
pub const RETRIES_TOTAL: &str = "patron_client_retries_total";
/// Counter of cache lookups, by hit or miss.
pub const CACHE_LOOKUPS_TOTAL: &str = "patron_client_cache_lookups_total";
/// Counter of classified fetches, by kind.
pub const STATUS_FETCHES_TOTAL: &str = "patron_client_status_fetches_total";
/// Counter of guard redirects, by the kind that caused them.
pub const GUARD_REDIRECTS_TOTAL: &str = "patron_client_guard_redirects_total";

/// How a single HTTP status check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// 2xx with a decodable payload.
    Answered,
    /// The backend said `SUBSCRIPTION_REQUIRED`.
    Required,
    /// Any other non-2xx, a transport failure, or an undecodable body.
    Failed,
    /// No answer within the client's request timeout.
    TimedOut,
    /// The caller stopped waiting before the check finished.
    Abandoned,
}

impl CheckOutcome {
    /// Label value used in metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Required => "required",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Abandoned => "abandoned",
        }
    }
}

fn record_check(outcome: CheckOutcome, elapsed: Duration) {
    counter!(STATUS_CHECKS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "outcome" => outcome.as_str()).record(elapsed.as_secs_f64());
}

/// Count a retry; `retry` starts at 1.
pub fn record_retry(operation: &'static str, retry: u32) {
    counter!(RETRIES_TOTAL, "operation" => operation, "retry" => retry.to_string()).increment(1);
}

/// Count a cache lookup as a hit or a miss.
pub fn record_cache_lookup(hit: bool) {
    counter!(CACHE_LOOKUPS_TOTAL, "result" => if hit { "hit" } else { "miss" }).increment(1);
}

/// Count a fetch that reached classification.
pub fn record_status_fetch(kind: StatusKind) {
    counter!(STATUS_FETCHES_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Count a redirect to the pricing page, labelled by the kind that caused it.
pub fn record_guard_redirect(kind: StatusKind) {
    counter!(GUARD_REDIRECTS_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Times one status check.
///
/// A timer dropped before [`finish`](Self::finish) counts as
/// [`CheckOutcome::Abandoned`], which is how a cancelled fetch shows up.
#[must_use]
#[derive(Debug)]
pub struct CheckTimer {
    start: Instant,
    done: bool,
}

impl CheckTimer {
    /// Start timing a check.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            done: false,
        }
    }

    /// Record the check under `outcome` and return how long it took.
    pub fn finish(mut self, outcome: CheckOutcome) -> Duration {
        self.done = true;
        let elapsed = self.start.elapsed();
        record_check(outcome, elapsed);
        elapsed
    }
}

impl Drop for CheckTimer {
    fn drop(&mut self) {
        if !self.done {
            record_check(CheckOutcome::Abandoned, self.start.elapsed());
        }
    }
}

/// Register descriptions with the installed recorder. Call once at startup.
pub fn describe_metrics() {
    describe_counter!(STATUS_CHECKS_TOTAL, Unit::Count, "Subscription status checks sent to the backend");
    describe_histogram!(REQUEST_DURATION_SECONDS, Unit::Seconds, "Latency of a single status check");
    describe_counter!(RETRIES_TOTAL, Unit::Count, "Status checks retried after a transient failure");
    describe_counter!(CACHE_LOOKUPS_TOTAL, Unit::Count, "Entitlement cache lookups by hit or miss");
    describe_counter!(STATUS_FETCHES_TOTAL, Unit::Count, "Classified status fetches by kind");
    describe_counter!(GUARD_REDIRECTS_TOTAL, Unit::Count, "Route guard redirects to the pricing page");
}
