// Table-store access: listing the clients to notify

mod client;
mod filter;

pub use client::HttpTableClient;
pub use filter::{checked_recently, filter_recently_checked};

use crate::errors::TableError;
use serde::{Deserialize, Serialize};

/// One row of the client configuration table.
///
/// Serde renames match the table's column spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Opaque client identifier (a tax number in the source table)
    #[serde(rename = "PartitionKey")]
    pub client_id: String,
    /// ISO-8601 timestamp of the last successful check, or a placeholder
    /// string ("null", "None") for clients never checked
    #[serde(rename = "last_successfull_download_run")]
    pub last_success: String,
    #[serde(rename = "penultimate_successfull_download_run")]
    pub penultimate_success: String,
}

/// Source of client identifiers for one run
#[async_trait::async_trait]
pub trait ClientDirectory: Send + Sync {
    /// List the clients due for a check at call time.
    ///
    /// An empty list is a valid result and not an error.
    async fn list_clients(&self) -> Result<Vec<ClientRecord>, TableError>;
}
