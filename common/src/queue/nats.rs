// NATS JetStream client for the notification queue

use crate::errors::QueueError;
use async_nats::jetstream::{
    stream::{Config as StreamConfig, RetentionPolicy, Stream},
    Context as JetStreamContext,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

/// NATS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL (e.g., "nats://localhost:4222")
    pub url: String,
    /// Stream name backing the notification queue
    pub stream_name: String,
    /// Target queue name, used as the message subject suffix
    pub queue_name: String,
    /// Subject pattern bound to the stream
    pub subject: String,
    /// Maximum age for messages in the stream (in seconds)
    pub max_age_seconds: u64,
    /// Maximum number of messages to retain
    pub max_messages: i64,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            stream_name: "NOTIFY".to_string(),
            queue_name: "sbq-nips-to-check".to_string(),
            subject: "notify.>".to_string(),
            max_age_seconds: 86400, // 24 hours
            max_messages: 1_000_000,
        }
    }
}

/// NATS JetStream client
pub struct NatsClient {
    jetstream: JetStreamContext,
    config: NatsConfig,
}

impl NatsClient {
    /// Create a new NATS client and connect to the server
    #[instrument(skip(config), fields(url = %config.url))]
    pub async fn new(config: NatsConfig) -> Result<Self, QueueError> {
        info!("Connecting to NATS server");

        let client = async_nats::connect(&config.url)
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to connect to NATS: {}", e)))?;

        info!("Connected to NATS server successfully");

        let jetstream = async_nats::jetstream::new(client);

        Ok(Self { jetstream, config })
    }

    /// Initialize the notification stream with retention policy
    #[instrument(skip(self))]
    pub async fn initialize_stream(&self) -> Result<Stream, QueueError> {
        info!(
            stream_name = %self.config.stream_name,
            "Initializing JetStream stream"
        );

        let stream_config = StreamConfig {
            name: self.config.stream_name.clone(),
            subjects: vec![self.config.subject.clone()],
            retention: RetentionPolicy::WorkQueue, // Messages deleted after acknowledgment
            max_age: Duration::from_secs(self.config.max_age_seconds),
            max_messages: self.config.max_messages,
            ..Default::default()
        };

        let stream = self
            .jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| QueueError::StreamCreation(format!("Failed to create stream: {}", e)))?;

        info!(
            stream_name = %self.config.stream_name,
            "Stream initialized successfully"
        );

        Ok(stream)
    }

    /// Get the JetStream context for publishing
    pub fn jetstream(&self) -> &JetStreamContext {
        &self.jetstream
    }

    /// Get the configuration
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Health check - verify the stream is reachable
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), QueueError> {
        self.jetstream
            .get_stream(&self.config.stream_name)
            .await
            .map_err(|e| QueueError::HealthCheck(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}
