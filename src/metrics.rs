use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and pre-register the alert metrics.
/// The returned handle renders the scrape payload for `GET /metrics`.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register so they appear before the first event.
    counter!("alerts_total").absolute(0);
    counter!("payout_updates_total").absolute(0);
    counter!("feed_frames_malformed_total").absolute(0);
    counter!("feed_reconnects_total").absolute(0);

    gauge!("payout_pairs").set(0.0);

    Ok(handle)
}
