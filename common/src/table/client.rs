// HTTP client for the storage-table connector function

use crate::config::TableConfig;
use crate::errors::TableError;
use crate::table::{filter_recently_checked, ClientDirectory, ClientRecord};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

const MANDATORY_KEYS: &[&str] = &["error", "query_result"];

/// Client Lister backed by the storage-table connector HTTP endpoint
pub struct HttpTableClient {
    client: Client,
    config: TableConfig,
}

impl HttpTableClient {
    pub fn new(config: TableConfig) -> Result<Self, TableError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                TableError::ConnectionFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Request body understood by the connector function
    fn build_request_body(&self) -> Value {
        json!({
            "operation": "get_all",
            "table_name": self.config.table_name,
            "entity": { "RowKey": self.config.row_key },
        })
    }

    /// POST the query to the connector and decode the JSON response
    async fn query_connector(&self) -> Result<Value, TableError> {
        let response = self
            .client
            .post(&self.config.access_point)
            // TODO: drop the api_key query parameter once the connector
            // accepts managed-identity tokens
            .query(&[("code", self.config.api_key.as_str())])
            .json(&self.build_request_body())
            .send()
            .await
            .map_err(|e| TableError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TableError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TableError::DecodeFailed(e.to_string()))
    }

    /// Validate the connector's response envelope and extract the rows
    fn extract_rows(response: &Value) -> Result<Vec<ClientRecord>, TableError> {
        for key in MANDATORY_KEYS {
            if response.get(key).is_none() {
                return Err(TableError::MissingKey((*key).to_string()));
            }
        }

        let error = &response["error"];
        if !error.is_null() {
            let code = error["error"].as_str().unwrap_or("unknown");
            let message = error["message"].as_str().unwrap_or_default();
            return Err(TableError::ConnectorError(format!("{}: {}", code, message)));
        }

        serde_json::from_value(response["query_result"].clone())
            .map_err(|e| TableError::DecodeFailed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ClientDirectory for HttpTableClient {
    #[instrument(skip(self), fields(table_name = %self.config.table_name))]
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, TableError> {
        debug!("Querying client configuration table");

        let response = self.query_connector().await?;
        let rows = Self::extract_rows(&response)?;

        debug!(rows = rows.len(), "Received client rows");

        let window = Duration::minutes(self.config.recheck_interval_minutes);
        Ok(filter_recently_checked(rows, window, Utc::now()))
    }
}
