// Trigger engine implementation

use crate::errors::RunError;
use crate::queue::{ClientNotifier, NotifyMessage};
use crate::schedule::next_fire_time;
use crate::table::ClientDirectory;
use crate::telemetry;
use crate::trigger::{FailedNotification, RunReport};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Configuration for the trigger engine
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Cron expression for the timer (Quartz syntax, second precision)
    pub cron_expression: String,
    /// Fire once immediately when the loop starts
    pub run_on_startup: bool,
    /// Multiplier for the per-iteration scheduled delay, in minutes
    pub delay_multiplier_minutes: i64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 0 * * * *".to_string(),
            run_on_startup: true,
            delay_multiplier_minutes: 2,
        }
    }
}

/// Trigger trait for the timer-driven entry point
#[async_trait]
pub trait Trigger: Send + Sync {
    /// Start the timer loop; returns when a shutdown signal is received
    async fn start(&self) -> Result<(), RunError>;

    /// Stop the timer loop gracefully
    async fn stop(&self);

    /// Execute one run out of band (the manual-invoke path)
    async fn run_once(&self) -> Result<RunReport, RunError>;
}

/// Timer-driven engine tying the client lister to the queue notifier
pub struct TriggerEngine {
    config: TriggerConfig,
    directory: Arc<dyn ClientDirectory>,
    notifier: Arc<dyn ClientNotifier>,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl TriggerEngine {
    pub fn new(
        config: TriggerConfig,
        directory: Arc<dyn ClientDirectory>,
        notifier: Arc<dyn ClientNotifier>,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel(1);

        Self {
            config,
            directory,
            notifier,
            shutdown_tx,
        }
    }

    /// Run the fan-out loop for one listed client set.
    ///
    /// Each publish failure is captured and the loop continues, so one bad
    /// message cannot abort the rest of the batch.
    async fn notify_all(&self, run_id: Uuid) -> Result<RunReport, RunError> {
        let started_at = Utc::now();

        let clients = self.directory.list_clients().await.map_err(|e| {
            error!(error = %e, "Client listing failed, aborting run");
            RunError::from(e)
        })?;

        telemetry::record_clients_listed(clients.len());

        if clients.is_empty() {
            info!("No clients due for a check, nothing to publish");
            return Ok(RunReport {
                run_id,
                started_at,
                listed: 0,
                published: 0,
                failed: Vec::new(),
            });
        }

        let delay_multiplier = ChronoDuration::minutes(self.config.delay_multiplier_minutes);
        let listed = clients.len();
        let mut published = 0usize;
        let mut failed = Vec::new();

        for client in &clients {
            let message = NotifyMessage::for_run(client, run_id, delay_multiplier);

            match self.notifier.notify(&message).await {
                Ok(()) => {
                    published += 1;
                    telemetry::record_notify_success(&client.client_id);
                }
                Err(e) => {
                    warn!(
                        client_id = %client.client_id,
                        error = %e,
                        "Failed to publish client notification, continuing with remaining clients"
                    );
                    telemetry::record_notify_failure(&client.client_id, &e.to_string());
                    failed.push(FailedNotification {
                        client_id: client.client_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(RunReport {
            run_id,
            started_at,
            listed,
            published,
            failed,
        })
    }

    /// Execute one run and log its report
    async fn fire(&self) {
        match self.run_once().await {
            Ok(report) if report.is_clean() => {
                info!(
                    run_id = %report.run_id,
                    listed = report.listed,
                    published = report.published,
                    "Run completed"
                );
            }
            Ok(report) => {
                warn!(
                    run_id = %report.run_id,
                    listed = report.listed,
                    published = report.published,
                    failed = report.failed.len(),
                    failed_clients = ?report
                        .failed
                        .iter()
                        .map(|f| f.client_id.as_str())
                        .collect::<Vec<_>>(),
                    "Run completed with publish failures"
                );
            }
            Err(e) => {
                // The host retries on the next schedule fire
                error!(error = %e, "Run failed");
            }
        }
    }
}

#[async_trait]
impl Trigger for TriggerEngine {
    async fn start(&self) -> Result<(), RunError> {
        info!(
            cron = %self.config.cron_expression,
            run_on_startup = self.config.run_on_startup,
            "Starting trigger loop"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        if self.config.run_on_startup {
            self.fire().await;
        }

        loop {
            let now = Utc::now();
            let next = next_fire_time(&self.config.cron_expression, now)?;
            let wait = (next - now)
                .to_std()
                .unwrap_or_else(|_| Duration::from_secs(0));

            debug!(next_fire = %next, wait_seconds = wait.as_secs(), "Waiting for next fire");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.fire().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping trigger loop");
                    return Ok(());
                }
            }
        }
    }

    async fn stop(&self) {
        // Returns an error only when no receiver is alive, i.e. the loop
        // already stopped
        let _ = self.shutdown_tx.send(());
    }

    #[instrument(skip(self), fields(run_id))]
    async fn run_once(&self) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        info!("Run started");
        self.notify_all(run_id).await
    }
}
