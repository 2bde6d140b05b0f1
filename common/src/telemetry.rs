// Telemetry module for structured logging and metrics

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting.
///
/// The log level comes from `RUST_LOG` when set, otherwise from
/// configuration.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level = log_level, "Structured logging initialized");

    Ok(())
}

/// Initialize the Prometheus metrics exporter and register all metrics
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!(
        "notify_published_total",
        "Total number of client notifications acknowledged by the broker"
    );
    describe_counter!(
        "notify_failed_total",
        "Total number of client notifications that failed to publish"
    );
    describe_gauge!(
        "run_clients_listed",
        "Number of clients returned by the lister in the latest run"
    );

    tracing::info!(
        metrics_port = metrics_port,
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

/// Record a successfully published client notification
#[inline]
pub fn record_notify_success(client_id: &str) {
    counter!("notify_published_total", "client_id" => client_id.to_string()).increment(1);
}

/// Record a failed client notification
#[inline]
pub fn record_notify_failure(client_id: &str, reason: &str) {
    counter!(
        "notify_failed_total",
        "client_id" => client_id.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record how many clients the latest run listed
#[inline]
pub fn record_clients_listed(count: usize) {
    gauge!("run_clients_listed").set(count as f64);
}
