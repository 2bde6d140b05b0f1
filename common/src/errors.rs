// Error handling framework

use thiserror::Error;

/// Errors from the table-store connector (Client Lister)
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to reach table connector: {0}")]
    ConnectionFailed(String),

    #[error("Table connector returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to decode table connector response: {0}")]
    DecodeFailed(String),

    #[error("Key {0} missing in table connector response")]
    MissingKey(String),

    #[error("Table connector reported an error: {0}")]
    ConnectorError(String),
}

/// Queue-related errors (Queue Notifier)
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to connect to queue: {0}")]
    Connection(String),

    #[error("Failed to create stream: {0}")]
    StreamCreation(String),

    #[error("Failed to publish message: {0}")]
    PublishFailed(String),

    #[error("Message serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Queue operation timeout: {0}")]
    Timeout(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),
}

/// Schedule-related errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("No next fire time available for expression '{0}'")]
    NoNextFireTime(String),
}

/// A whole-run failure.
///
/// A table retrieval failure aborts the run before any publish; per-client
/// publish failures are captured in the run report instead and do not
/// surface here.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Client listing failed: {0}")]
    Listing(#[from] TableError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_error_display() {
        let err = TableError::HttpStatus {
            status: 503,
            body: "service unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_run_error_from_table_error() {
        let err: RunError = TableError::ConnectionFailed("refused".to_string()).into();
        assert!(err.to_string().contains("Client listing failed"));
    }
}
