//! HTTP client for the engine: heartbeat probe, catalog listing, streamed SQL generation.

use std::time::Instant;

use reqwest::Client;

use crate::catalog::{CatalogFetch, DatabaseCatalog, DatabaseConnection};
use crate::config::EngineOptions;
use crate::error::ClientError;
use crate::messages::{
    api_url, build_prompt, GenerationRequest, DATABASE_CONNECTIONS_PATH, HEARTBEAT_PATH,
    STREAM_SQL_GENERATION_PATH,
};
use crate::stream::AnswerStream;

/// Result of a heartbeat probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Engine client. Every call takes the engine base URL, so the endpoint can
/// change between calls without rebuilding the client.
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: Client,
    options: EngineOptions,
}

impl EngineClient {
    pub fn new(options: EngineOptions) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// `GET {base}/api/v1/heartbeat`. Never fails; problems land in `error`.
    pub async fn check_health(&self, base_url: &str) -> HealthStatus {
        let url = api_url(base_url, HEARTBEAT_PATH);
        let start = Instant::now();
        let result = self
            .http
            .get(&url)
            .timeout(self.options.request_timeout)
            .send()
            .await;
        let latency_ms = Some(start.elapsed().as_millis() as u64);

        match result {
            Ok(response) if response.status().is_success() => HealthStatus {
                healthy: true,
                latency_ms,
                error: None,
            },
            Ok(response) => {
                tracing::warn!(%url, status = %response.status(), "heartbeat rejected");
                HealthStatus {
                    healthy: false,
                    latency_ms,
                    error: Some(format!("HTTP {}", response.status())),
                }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "heartbeat failed");
                HealthStatus {
                    healthy: false,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Whether the engine at `base_url` answers its heartbeat with a success status.
    pub async fn probe(&self, base_url: &str) -> bool {
        self.check_health(base_url).await.healthy
    }

    /// `GET {base}/api/v1/database-connections`. Non-200 or unreadable
    /// payloads come back as [`CatalogFetch::Unavailable`].
    pub async fn fetch_catalog(&self, base_url: &str) -> CatalogFetch {
        let url = api_url(base_url, DATABASE_CONNECTIONS_PATH);
        match self.try_fetch_catalog(&url).await {
            Ok(catalog) => {
                tracing::debug!(%url, count = catalog.len(), "catalog loaded");
                CatalogFetch::Loaded(catalog)
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "catalog unavailable");
                CatalogFetch::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_fetch_catalog(&self, url: &str) -> Result<DatabaseCatalog, ClientError> {
        let response = self
            .http
            .get(url)
            .timeout(self.options.request_timeout)
            .send()
            .await?;
        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        let bytes = response.bytes().await?;
        let connections: Vec<DatabaseConnection> = serde_json::from_slice(&bytes)?;
        Ok(connections.into_iter().collect())
    }

    /// Convenience wrapper returning an empty catalog on any failure.
    pub async fn fetch_catalog_or_empty(&self, base_url: &str) -> DatabaseCatalog {
        self.fetch_catalog(base_url).await.into_catalog()
    }

    /// `POST {base}/api/v1/stream-sql-generation` and hand back the body as an
    /// [`AnswerStream`]. A non-success status fails before any text is produced.
    pub async fn stream_answer(
        &self,
        base_url: &str,
        db_connection_id: Option<&str>,
        question: &str,
        context: &str,
    ) -> Result<AnswerStream, ClientError> {
        let url = api_url(base_url, STREAM_SQL_GENERATION_PATH);
        let request = GenerationRequest::new(
            &self.options.llm_name,
            build_prompt(question, context),
            db_connection_id,
        );
        tracing::debug!(%url, db_connection_id, has_context = !context.is_empty(), "streaming answer");

        let response = self
            .http
            .post(&url)
            .timeout(self.options.stream_timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(AnswerStream::from_response(response, self.options.chunk_size))
    }
}
