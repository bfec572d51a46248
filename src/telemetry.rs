use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on the exporter before first use).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_runs_total", "Pipeline runs started.");
        describe_counter!(
            "relay_run_failures_total",
            "Pipeline runs aborted by a fatal error."
        );
        describe_counter!(
            "relay_items_total",
            "Per-item outcomes, labelled by `outcome`."
        );
        describe_counter!(
            "relay_translate_chunks_total",
            "Translation calls issued (one per chunk)."
        );
        describe_counter!(
            "relay_delivery_segments_total",
            "Message segments accepted by the delivery service."
        );
        describe_counter!("relay_fetch_retries_total", "Feed fetch retries.");
        describe_histogram!("relay_run_ms", "Pipeline run duration in milliseconds.");
        describe_histogram!("relay_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("relay_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside a tokio runtime.
pub fn install_prometheus(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics_addr {addr}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
