// Notifier binary entry point
//
// Hourly timer loop: list the clients due for a check from the table-store
// connector, then publish one message per client to the notification queue.
// `--once` performs a single run and exits (the manual-invoke path).

use anyhow::Context;
use common::config::Settings;
use common::queue::{NatsClient, NatsClientNotifier, NatsConfig};
use common::table::HttpTableClient;
use common::telemetry;
use common::trigger::{Trigger, TriggerConfig, TriggerEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first so the log level is honored
    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(&settings.observability.log_level)?;

    info!(
        table_access_point = %settings.table.access_point,
        queue_url = %settings.queue.connection_url,
        queue_name = %settings.queue.queue_name,
        "Configuration loaded"
    );

    if let Some(port) = settings.observability.metrics_port {
        telemetry::init_metrics(port)?;
    }

    // Client lister
    let directory = HttpTableClient::new(settings.table.clone())
        .map_err(|e| anyhow::anyhow!("Failed to build table client: {}", e))?;
    info!("Table client initialized");

    // Queue notifier
    let nats_config = NatsConfig {
        url: settings.queue.connection_url.clone(),
        stream_name: settings.queue.stream_name.clone(),
        queue_name: settings.queue.queue_name.clone(),
        ..NatsConfig::default()
    };
    let nats_client = NatsClient::new(nats_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to queue broker: {}", e))?;
    nats_client
        .initialize_stream()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize queue stream: {}", e))?;
    let notifier = NatsClientNotifier::new(nats_client)
        .with_timeout(Duration::from_secs(settings.queue.publish_timeout_seconds));
    info!("Queue notifier initialized");

    let trigger_config = TriggerConfig {
        cron_expression: settings.schedule.cron_expression.clone(),
        run_on_startup: settings.schedule.run_on_startup,
        delay_multiplier_minutes: settings.queue.delay_multiplier_minutes,
    };

    let engine = Arc::new(TriggerEngine::new(
        trigger_config,
        Arc::new(directory),
        Arc::new(notifier),
    ));

    if std::env::args().any(|arg| arg == "--once") {
        // Manual invocation: one run, then exit
        let report = engine
            .run_once()
            .await
            .map_err(|e| anyhow::anyhow!("Run failed: {}", e))?;
        info!(
            run_id = %report.run_id,
            listed = report.listed,
            published = report.published,
            failed = report.failed.len(),
            "Manual run completed"
        );
        if !report.is_clean() {
            anyhow::bail!(
                "{} of {} client notifications failed to publish",
                report.failed.len(),
                report.listed
            );
        }
        return Ok(());
    }

    // Graceful shutdown on Ctrl+C / SIGTERM
    let engine_for_shutdown = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal, stopping trigger loop");
        engine_for_shutdown.stop().await;
    });

    engine
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Trigger loop failed: {}", e))?;

    info!("Notifier stopped");
    Ok(())
}
