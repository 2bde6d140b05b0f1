// Per-client notification publisher for NATS JetStream

use crate::errors::QueueError;
use crate::queue::nats::NatsClient;
use crate::table::ClientRecord;
use async_nats::jetstream::context::PublishAckFuture;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Message published to the queue, one per client per run.
///
/// Downstream consumers re-enqueue this message with an incremented
/// `iteration` when a check needs to be retried; the scheduled enqueue time
/// grows with the iteration, so the first fan-out always carries zero delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyMessage {
    /// Client identifier this notification is for
    #[serde(rename = "NIP")]
    pub client_id: String,
    /// Last and penultimate successful check timestamps, as stored
    pub last_successful_downloads: [String; 2],
    /// Re-enqueue counter, zero for the hourly fan-out
    pub iteration: i64,
    pub query_elem_ref_no: Option<String>,
    pub part_elem_ref_no: Option<String>,
    /// Run that produced this message
    pub run_id: Uuid,
    pub published_at: DateTime<Utc>,
    pub scheduled_enqueue_time_utc: DateTime<Utc>,
}

impl NotifyMessage {
    /// Build the fan-out message for one client within a run.
    ///
    /// The scheduled delay is `iteration * delay_multiplier`; iteration
    /// starts at zero so the hourly fan-out is delivered immediately.
    pub fn for_run(record: &ClientRecord, run_id: Uuid, delay_multiplier: ChronoDuration) -> Self {
        let iteration = 0i64;
        let published_at = Utc::now();
        Self {
            client_id: record.client_id.clone(),
            last_successful_downloads: [
                record.last_success.clone(),
                record.penultimate_success.clone(),
            ],
            iteration,
            query_elem_ref_no: None,
            part_elem_ref_no: None,
            run_id,
            published_at,
            scheduled_enqueue_time_utc: published_at + delay_multiplier * iteration as i32,
        }
    }
}

/// ClientNotifier trait for publishing one notification per client
#[async_trait::async_trait]
pub trait ClientNotifier: Send + Sync {
    /// Publish a single client notification to the queue
    async fn notify(&self, message: &NotifyMessage) -> Result<(), QueueError>;
}

/// NATS-based notifier implementation
pub struct NatsClientNotifier {
    client: NatsClient,
    subject: String,
    publish_timeout: Duration,
}

impl NatsClientNotifier {
    /// Create a new NATS notifier publishing onto the configured queue subject
    pub fn new(client: NatsClient) -> Self {
        let subject = format!("notify.{}", client.config().queue_name);
        Self {
            client,
            subject,
            publish_timeout: Duration::from_secs(120),
        }
    }

    /// Override the publish acknowledgment timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait::async_trait]
impl ClientNotifier for NatsClientNotifier {
    #[instrument(skip(self, message), fields(
        client_id = %message.client_id,
        run_id = %message.run_id
    ))]
    async fn notify(&self, message: &NotifyMessage) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(message).map_err(|e| {
            QueueError::SerializationFailed(format!("Failed to serialize notification: {}", e))
        })?;

        // Dedup header: at most one message per client per run
        let msg_id = format!("{}:{}", message.run_id, message.client_id);
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", msg_id.as_str());
        headers.insert("Client-Id", message.client_id.as_str());
        headers.insert("Run-Id", message.run_id.to_string().as_str());

        let jetstream = self.client.jetstream();
        let publish_future: PublishAckFuture = jetstream
            .publish_with_headers(self.subject.clone(), headers, payload.into())
            .await
            .map_err(|e| QueueError::PublishFailed(format!("Failed to publish message: {}", e)))?;

        let ack_result = tokio::time::timeout(self.publish_timeout, publish_future).await;

        match ack_result {
            Ok(Ok(_ack)) => {
                info!(subject = %self.subject, "Client notification published");
                Ok(())
            }
            Ok(Err(e)) => Err(QueueError::PublishFailed(format!(
                "Failed to get publish acknowledgment: {}",
                e
            ))),
            Err(_) => Err(QueueError::Timeout(format!(
                "Publish acknowledgment timeout after {:?}",
                self.publish_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(client_id: &str) -> ClientRecord {
        ClientRecord {
            client_id: client_id.to_string(),
            last_success: "1900-01-01T00:00:00+00:00".to_string(),
            penultimate_success: "1970-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_message_carries_its_client_identifier() {
        let run_id = Uuid::new_v4();
        let message = NotifyMessage::for_run(&record("5272097306"), run_id, ChronoDuration::minutes(2));

        assert_eq!(message.client_id, "5272097306");
        assert_eq!(message.run_id, run_id);
        assert_eq!(message.iteration, 0);
        assert!(message.query_elem_ref_no.is_none());
        assert!(message.part_elem_ref_no.is_none());
    }

    #[test]
    fn test_first_fanout_has_no_delay() {
        let message = NotifyMessage::for_run(
            &record("1111111111"),
            Uuid::new_v4(),
            ChronoDuration::minutes(10),
        );
        assert_eq!(message.scheduled_enqueue_time_utc, message.published_at);
    }

    #[test]
    fn test_message_serializes_with_table_field_names() {
        let message = NotifyMessage::for_run(
            &record("9999999999"),
            Uuid::new_v4(),
            ChronoDuration::minutes(2),
        );

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["NIP"], "9999999999");
        assert_eq!(json["iteration"], 0);
        assert!(json["query_elem_ref_no"].is_null());
        assert_eq!(
            json["last_successful_downloads"][0],
            "1900-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_message_round_trips_through_serde() {
        let message = NotifyMessage::for_run(
            &record("1234567890"),
            Uuid::new_v4(),
            ChronoDuration::minutes(2),
        );

        let serialized = serde_json::to_vec(&message).unwrap();
        let deserialized: NotifyMessage = serde_json::from_slice(&serialized).unwrap();

        assert_eq!(deserialized.client_id, message.client_id);
        assert_eq!(deserialized.run_id, message.run_id);
        assert_eq!(
            deserialized.last_successful_downloads,
            message.last_successful_downloads
        );
    }
}
