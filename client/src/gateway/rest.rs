//! REST gateway for PostgREST-style backends
//!
//! Tables live under `{url}/rest/v1/{relation}`, procedures under
//! `{url}/rest/v1/rpc/{name}`. Rows are matched with `?id=eq.{id}` filters and
//! writes ask for the changed rows back with `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Map, Value};
use shared::{Procedure, RowId, Table};

use super::Gateway;
use crate::config::GatewayConfig;
use crate::error::{AppError, AppResult};

/// PostgREST gateway client
#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: String,
    table_prefix: String,
    schema: String,
}

impl RestGateway {
    /// Create a new RestGateway from configuration
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table_prefix: config.table_prefix.clone(),
            schema: config.schema.clone(),
        })
    }

    /// Create a new RestGateway with custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table_prefix: GatewayConfig::default().table_prefix,
            schema: GatewayConfig::default().schema,
        }
    }

    pub fn relation_url(&self, relation: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, relation)
    }

    pub fn procedure_url(&self, procedure: &Procedure) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, procedure.name())
    }

    fn read_url(&self, table: Table) -> AppResult<String> {
        let relation = table
            .read_relation(&self.table_prefix)
            .ok_or_else(|| AppError::Internal(format!("Table {} is write-only", table)))?;
        let mut url = format!("{}?select=*", self.relation_url(&relation));
        if !table.is_derived_view() {
            url.push_str("&order=id.asc");
        }
        Ok(url)
    }

    fn write_url(&self, table: Table) -> AppResult<String> {
        table
            .write_relation(&self.table_prefix)
            .map(|relation| self.relation_url(&relation))
            .ok_or(AppError::ReadOnlyTable(table))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept-Profile", &self.schema)
            .header("Content-Profile", &self.schema)
    }

    /// Turns non-2xx responses into `AppError::Gateway`
    async fn check(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Gateway {
            status,
            message: error_message(&body),
        })
    }

    /// Writes answer with an array of the affected rows
    async fn single_row(table: Table, response: Response) -> AppResult<Option<Value>> {
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AppError::decode(table, e))?;
        Ok(rows.into_iter().next())
    }
}

/// PostgREST error bodies are JSON objects with a `message`
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Gateway for RestGateway {
    async fn read(&self, table: Table) -> AppResult<Vec<Value>> {
        let url = self.read_url(table)?;
        let response = self.request(Method::GET, &url).send().await?;
        let response = Self::check(response).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AppError::decode(table, e))?;
        tracing::debug!(%table, rows = rows.len(), "Read table");
        Ok(rows)
    }

    async fn insert(&self, table: Table, fields: Map<String, Value>) -> AppResult<Value> {
        let url = self.write_url(table)?;
        let response = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Self::single_row(table, response)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Insert into {} returned no row", table)))
    }

    async fn update(&self, table: Table, id: RowId, fields: Map<String, Value>) -> AppResult<Value> {
        let url = format!("{}?id=eq.{}", self.write_url(table)?, id);
        let response = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Self::single_row(table, response)
            .await?
            .ok_or(AppError::NotFound { table, id })
    }

    async fn delete(&self, table: Table, id: RowId) -> AppResult<()> {
        let url = format!("{}?id=eq.{}", self.write_url(table)?, id);
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn invoke(&self, procedure: Procedure) -> AppResult<Value> {
        let url = self.procedure_url(&procedure);
        let response = self
            .request(Method::POST, &url)
            .json(&procedure.args())
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Procedure {
                name: procedure.name().to_string(),
                message: error_message(&body),
            });
        }

        // void procedures answer with an empty body
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| AppError::Procedure {
            name: procedure.name().to_string(),
            message: format!("Unreadable result: {}", e),
        })
    }
}
