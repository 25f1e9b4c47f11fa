//! Prometheus metrics for the invoice service.

use once_cell::sync::Lazy;
use prometheus::{opts, register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

/// Extraction requests by outcome (ok, timeout, upstream_error).
pub static EXTRACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "invoice_extractions_total",
            "Invoice text extractions by outcome"
        ),
        &["outcome"]
    )
    .expect("Failed to register EXTRACTIONS_TOTAL")
});

/// Email dispatches by outcome (sent, failed, timeout, too_large, rate_limited).
pub static EMAILS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("invoice_emails_total", "Invoice email sends by outcome"),
        &["outcome"]
    )
    .expect("Failed to register EMAILS_TOTAL")
});

/// PDF renders by outcome (ok, timeout, failed).
pub static PDF_RENDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("invoice_pdf_renders_total", "Invoice PDF renders by outcome"),
        &["outcome"]
    )
    .expect("Failed to register PDF_RENDERS_TOTAL")
});

/// Best-effort notifications by channel and outcome.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "invoice_notifications_total",
            "Best-effort notifications by channel and outcome"
        ),
        &["channel", "outcome"]
    )
    .expect("Failed to register NOTIFICATIONS_TOTAL")
});

/// Render all registered metrics in the Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
