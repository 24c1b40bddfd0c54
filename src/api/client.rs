use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use super::rate_limit::{backoff_sleep, is_rate_limited};
use super::types::{
    AttendanceTrend, DepartmentDistribution, EventQuery, EventsPage, GrowthMetrics,
    MonthlySummary, TopEvent,
};
use super::ReportSource;
use crate::config::{ClientConfig, DEFAULT_RATE_LIMIT_RETRIES};
use crate::error::{Error, Result};
use crate::range::DateRange;

/// HTTP client for the fellowship reporting API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    rate_limit_retries: u32,
}

impl ApiClient {
    /// Create a client rooted at `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_http(base_url, reqwest::Client::new())
    }

    /// Build a client from layered configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let mut client = Self::with_http(config.base_url()?, http)?
            .with_rate_limit_retries(config.rate_limit_retries);
        client.token = config.api_token.clone();
        Ok(client)
    }

    fn with_http(base_url: &str, http: reqwest::Client) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            token: None,
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = retries;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// GET `path` with `query` and decode the JSON body, retrying on 429.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let mut attempt: u32 = 0;
        loop {
            let mut request = self.http.get(url.clone()).query(query);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            log::debug!("GET {url} {query:?}");

            let response = request.send().await?;
            let status = response.status();
            if is_rate_limited(status) && attempt < self.rate_limit_retries {
                backoff_sleep(attempt, self.rate_limit_retries).await;
                attempt += 1;
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Api {
                    status: status.as_u16(),
                    message: api_error_message(status, &body),
                });
            }
            return Ok(response.json::<T>().await?);
        }
    }
}

/// Pull a readable message out of an error body: `{"message": ..}` or
/// `{"error": ..}` if JSON, the raw text otherwise.
fn api_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl ReportSource for ApiClient {
    async fn attendance_trend(&self, range: &DateRange) -> Result<AttendanceTrend> {
        self.get_json("reports/attendance-trend", &range.query_params())
            .await
    }

    async fn department_distribution(&self) -> Result<DepartmentDistribution> {
        self.get_json("reports/department-distribution", &[]).await
    }

    async fn monthly_summary(&self, range: &DateRange) -> Result<MonthlySummary> {
        self.get_json("reports/monthly-summary", &range.query_params())
            .await
    }

    async fn top_events(&self, range: &DateRange) -> Result<Vec<TopEvent>> {
        self.get_json("reports/top-events", &range.query_params())
            .await
    }

    async fn growth_metrics(&self, range: &DateRange) -> Result<GrowthMetrics> {
        self.get_json("reports/growth-metrics", &range.query_params())
            .await
    }

    async fn list_events(&self, query: &EventQuery) -> Result<EventsPage> {
        self.get_json("events", &query.query_params()).await
    }
}
