//! Supabase PostgREST client
//!
//! Talks to `{url}/rest/v1/{table}` with the project's anon key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::{CLASSES_TABLE, HazmatLookup, UN_LIST_TABLE};
use crate::config::SupabaseConfig;
use crate::error::{Error, LookupError, LookupResult};
use crate::models::{DgrClass, HazmatRecord};

/// Columns requested from `dgr_classes`
const CLASS_COLUMNS: &str = "icao_class,description,iata_code";

/// PostgREST client for the dangerous-goods tables
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    /// Create a new client; `timeout` bounds every HTTP request
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config.url.trim().trim_end_matches('/').to_string();

        info!("Data store client initialized for: {}", base_url);

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// GET rows from `table` filtered by `params` and decode them
    async fn select<T: DeserializeOwned>(
        &self,
        table: &'static str,
        params: &[(&str, &str)],
    ) -> LookupResult<Vec<T>> {
        let url = self.table_url(table);

        debug!("Querying {} with {:?}", table, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(&self.anon_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Query on {} failed: {} - {}", table, status, error_text);
            return Err(LookupError::Store {
                table,
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        let rows: Vec<T> =
            serde_json::from_str(&body).map_err(|source| LookupError::Decode { table, source })?;

        debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }
}

#[async_trait]
impl HazmatLookup for SupabaseClient {
    async fn find_by_un_number(&self, key: &str) -> LookupResult<Vec<HazmatRecord>> {
        let filter = format!("eq.{}", key);
        self.select(UN_LIST_TABLE, &[("select", "*"), ("un_number", filter.as_str())])
            .await
    }

    async fn list_classes(&self) -> LookupResult<Vec<DgrClass>> {
        self.select(CLASSES_TABLE, &[("select", CLASS_COLUMNS)]).await
    }
}
