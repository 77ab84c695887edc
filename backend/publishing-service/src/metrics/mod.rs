//! Prometheus metrics for publishing-service.
//!
//! Engagement outcomes, read accounting and like reconciliation, plus the
//! handler behind `/metrics`.

use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, TextEncoder};

lazy_static::lazy_static! {
    /// Like/unlike calls by outcome (ok, conflict, not_found, forbidden, error)
    pub static ref LIKE_OPERATIONS_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        "publishing_like_operations_total",
        "Like and unlike operations by outcome",
        &["operation", "outcome"]
    ).expect("failed to register publishing_like_operations_total");

    /// Background read increments (success/error)
    pub static ref READ_ACCOUNTING_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        "publishing_read_accounting_total",
        "Read accounting increments by outcome",
        &["outcome"]
    ).expect("failed to register publishing_read_accounting_total");

    /// Reconciliation cycles (success/error)
    pub static ref LIKE_RECONCILE_RUNS_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        "publishing_like_reconcile_runs_total",
        "Like reconciliation cycles by status",
        &["status"]
    ).expect("failed to register publishing_like_reconcile_runs_total");

    /// Posts whose cached like counter disagreed with the ledger
    pub static ref LIKE_RECONCILE_CORRECTIONS_TOTAL: IntCounter = prometheus::register_int_counter!(
        "publishing_like_reconcile_corrections_total",
        "Cached like counters corrected from the ledger"
    ).expect("failed to register publishing_like_reconcile_corrections_total");
}

pub fn record_like_operation(operation: &str, outcome: &str) {
    LIKE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_read(outcome: &str) {
    READ_ACCOUNTING_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_reconcile_run(status: &str) {
    LIKE_RECONCILE_RUNS_TOTAL.with_label_values(&[status]).inc();
}

pub fn record_reconcile_correction() {
    LIKE_RECONCILE_CORRECTIONS_TOTAL.inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
