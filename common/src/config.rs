// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options.
///
/// Built once at process start and passed by reference into the components;
/// nothing reads configuration ambiently after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub table: TableConfig,
    pub queue: QueueConfig,
    pub schedule: ScheduleConfig,
    pub observability: ObservabilityConfig,
}

/// Table-store connector settings (the Client Lister side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// URL of the storage-table connector function
    pub access_point: String,
    /// API key passed as the `code` query parameter
    pub api_key: String,
    pub table_name: String,
    pub row_key: String,
    pub timeout_seconds: u64,
    /// Clients checked successfully within this window are skipped
    pub recheck_interval_minutes: i64,
}

/// Queue broker settings (the Queue Notifier side)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub connection_url: String,
    pub queue_name: String,
    pub stream_name: String,
    pub publish_timeout_seconds: u64,
    /// Per-message scheduled delay is iteration * this many minutes
    pub delay_multiplier_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Quartz-style cron expression with second precision
    pub cron_expression: String,
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: Option<u16>,
}

/// Flat environment keys kept for compatibility with earlier deployments.
/// They override the nested `APP__*` form when both are set.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("STORAGE_TABLE_CONNECTOR_ACCESS_POINT", "table.access_point"),
    ("STORAGE_TABLE_CONNECTOR_API_KEY", "table.api_key"),
    ("SERVICEBUS_CONNECTION_STRING", "queue.connection_url"),
    ("QUEUE_INTERNAL", "queue.queue_name"),
];

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (env_key, config_key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*config_key, std::env::var(env_key).ok())?;
        }

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.table.access_point.is_empty() {
            return Err("Table connector access point cannot be empty".to_string());
        }
        if self.table.api_key.is_empty() {
            return Err("Table connector API key cannot be empty".to_string());
        }
        if self.table.table_name.is_empty() {
            return Err("Table name cannot be empty".to_string());
        }
        if self.table.timeout_seconds == 0 {
            return Err("Table timeout_seconds must be greater than 0".to_string());
        }

        if self.queue.connection_url.is_empty() {
            return Err("Queue connection URL cannot be empty".to_string());
        }
        if self.queue.queue_name.is_empty() {
            return Err("Queue name cannot be empty".to_string());
        }
        if self.queue.stream_name.is_empty() {
            return Err("Queue stream_name cannot be empty".to_string());
        }
        if self.queue.publish_timeout_seconds == 0 {
            return Err("Queue publish_timeout_seconds must be greater than 0".to_string());
        }
        if self.queue.delay_multiplier_minutes < 0 {
            return Err("Queue delay_multiplier_minutes cannot be negative".to_string());
        }

        crate::schedule::parse_cron_expression(&self.schedule.cron_expression)
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table: TableConfig {
                access_point: "http://localhost:7071/api/storage_table_connector".to_string(),
                api_key: "change-me-in-production".to_string(),
                table_name: "ClientConfig".to_string(),
                row_key: "_zakup".to_string(),
                timeout_seconds: 90,
                recheck_interval_minutes: 120,
            },
            queue: QueueConfig {
                connection_url: "nats://localhost:4222".to_string(),
                queue_name: "sbq-nips-to-check".to_string(),
                stream_name: "NOTIFY".to_string(),
                publish_timeout_seconds: 120,
                delay_multiplier_minutes: 2,
            },
            schedule: ScheduleConfig {
                // Top of every hour
                cron_expression: "0 0 * * * *".to_string(),
                run_on_startup: true,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: Some(9090),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_catches_empty_access_point() {
        let mut settings = Settings::default();
        settings.table.access_point = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_empty_queue_name() {
        let mut settings = Settings::default();
        settings.queue.queue_name = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_timeout() {
        let mut settings = Settings::default();
        settings.table.timeout_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_catches_bad_cron_expression() {
        let mut settings = Settings::default();
        settings.schedule.cron_expression = "not a cron".to_string();
        assert!(settings.validate().is_err());
    }

    const DEFAULT_TOML: &str = r#"
        [table]
        access_point = "http://localhost:7071/api/storage_table_connector"
        api_key = "file-api-key"
        table_name = "ClientConfig"
        row_key = "_zakup"
        timeout_seconds = 90
        recheck_interval_minutes = 120

        [queue]
        connection_url = "nats://localhost:4222"
        queue_name = "sbq-from-file"
        stream_name = "NOTIFY"
        publish_timeout_seconds = 120
        delay_multiplier_minutes = 2

        [schedule]
        cron_expression = "0 0 * * * *"
        run_on_startup = true

        [observability]
        log_level = "info"
        metrics_port = 9090
    "#;

    fn config_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), DEFAULT_TOML).unwrap();
        dir
    }

    // Process environment is shared across the parallel test harness, so
    // every test that sets or observes env vars holds this lock.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_legacy_queue_key_overrides_file_and_prefixed_env() {
        let _guard = env_guard();
        let dir = config_dir();

        std::env::set_var("APP__QUEUE__QUEUE_NAME", "sbq-from-app-env");
        std::env::set_var("QUEUE_INTERNAL", "sbq-from-legacy");

        let settings = Settings::load_from_path(dir.path());

        std::env::remove_var("APP__QUEUE__QUEUE_NAME");
        std::env::remove_var("QUEUE_INTERNAL");

        let settings = settings.unwrap();
        assert_eq!(settings.queue.queue_name, "sbq-from-legacy");
    }

    #[test]
    fn test_legacy_table_keys_are_read_from_environment() {
        let _guard = env_guard();
        let dir = config_dir();

        std::env::set_var(
            "STORAGE_TABLE_CONNECTOR_ACCESS_POINT",
            "https://connector.example/api",
        );
        std::env::set_var("STORAGE_TABLE_CONNECTOR_API_KEY", "legacy-api-key");

        let settings = Settings::load_from_path(dir.path());

        std::env::remove_var("STORAGE_TABLE_CONNECTOR_ACCESS_POINT");
        std::env::remove_var("STORAGE_TABLE_CONNECTOR_API_KEY");

        let settings = settings.unwrap();
        assert_eq!(settings.table.access_point, "https://connector.example/api");
        assert_eq!(settings.table.api_key, "legacy-api-key");
    }

    #[test]
    fn test_legacy_connection_string_key_is_read_from_environment() {
        let _guard = env_guard();
        let dir = config_dir();

        std::env::set_var("SERVICEBUS_CONNECTION_STRING", "nats://broker.example:4222");

        let settings = Settings::load_from_path(dir.path());

        std::env::remove_var("SERVICEBUS_CONNECTION_STRING");

        let settings = settings.unwrap();
        assert_eq!(settings.queue.connection_url, "nats://broker.example:4222");
    }

    #[test]
    fn test_unset_legacy_keys_fall_back_to_file_values() {
        let _guard = env_guard();
        let dir = config_dir();

        let settings = Settings::load_from_path(dir.path()).unwrap();
        assert_eq!(settings.queue.queue_name, "sbq-from-file");
        assert_eq!(settings.table.api_key, "file-api-key");
    }
}
