//! Metrics collection.
//!
//! # Metrics
//! - `cms_route_total` (counter): finished routes by outcome
//! - `cms_fetch_attempts_total` (counter): content fetches by status
//! - `cms_redirect_matches_total` (counter): matched redirects by code
//! - `cms_live_render_passes_total` (counter): reconciliation passes
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the embedding application
//!   chooses the recorder (none installed means no-op)

/// Record a finished route operation.
pub fn record_route(outcome: &str) {
    ::metrics::counter!("cms_route_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record one content fetch attempt.
pub fn record_fetch_attempt(status: &str) {
    ::metrics::counter!("cms_fetch_attempts_total", "status" => status.to_string()).increment(1);
}

/// Record a matched redirect rule.
pub fn record_redirect(code: &str) {
    ::metrics::counter!("cms_redirect_matches_total", "code" => code.to_string()).increment(1);
}

/// Record a reconciliation pass over `triggers` live triggers.
pub fn record_live_render_pass(triggers: usize) {
    ::metrics::counter!("cms_live_render_passes_total").increment(1);
    ::metrics::histogram!("cms_live_render_triggers").record(triggers as f64);
}
