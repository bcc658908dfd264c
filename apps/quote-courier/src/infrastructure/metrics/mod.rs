//! Prometheus Metrics Module
//!
//! Exposes courier metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Generations**: Quote generation calls by style and outcome, plus latency
//! - **Frames**: Inbound frames applied and dropped as malformed
//! - **Deliveries**: Letters handed to the mail transport
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::quote::QuoteStyle;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Later calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "quote_courier_generations_total",
        "Quote generation calls by style and outcome"
    );
    describe_histogram!(
        "quote_courier_generation_seconds",
        "Wall time of one generation call, fallback included"
    );

    describe_counter!(
        "quote_courier_frames_received_total",
        "Inbound frames decoded and applied"
    );
    describe_counter!(
        "quote_courier_frames_dropped_total",
        "Inbound messages dropped as malformed"
    );

    describe_counter!(
        "quote_courier_deliveries_total",
        "Letters handed to the mail transport by outcome"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The transport accepted the letter.
    Delivered,
    /// Rendering or delivery failed.
    Failed,
}

impl DeliveryOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// Record one finished generation call.
pub fn record_generation(style: QuoteStyle, outcome: &'static str, elapsed: Duration) {
    counter!(
        "quote_courier_generations_total",
        "style" => style.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "quote_courier_generation_seconds",
        "style" => style.as_str()
    )
    .record(elapsed.as_secs_f64());
}

/// Record the frame counts of one finished session.
pub fn record_frames(received: u64, dropped: u64) {
    counter!("quote_courier_frames_received_total").increment(received);
    if dropped > 0 {
        counter!("quote_courier_frames_dropped_total").increment(dropped);
    }
}

/// Record one delivery attempt.
pub fn record_delivery(outcome: DeliveryOutcome) {
    counter!(
        "quote_courier_deliveries_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
