use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{
    ChatMessage, ChatReply, DashboardSnapshot, Health, PredictionDetail, WhaleFeed,
};

/// Failure modes at the backend boundary. Pollers only need to know that a
/// fetch failed; one-shot callers get enough detail to print something useful.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the Oracle Sentinel REST/SSE API.
#[derive(Clone)]
pub struct SentinelClient {
    http: Client,
    base_url: String,
}

impl SentinelClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(SentinelClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full dashboard snapshot: signals, markets, predictions, accuracy, logs.
    pub async fn fetch_dashboard(&self) -> Result<DashboardSnapshot, ApiError> {
        self.get_json("/api/dashboard").await
    }

    /// Recent whale trades plus server-side 24h aggregates.
    pub async fn fetch_whales(&self) -> Result<WhaleFeed, ApiError> {
        self.get_json("/api/whales").await
    }

    /// Detail record for one prediction/opportunity.
    pub async fn fetch_prediction(&self, id: i64) -> Result<PredictionDetail, ApiError> {
        self.get_json(&format!("/api/prediction/{}", id)).await
    }

    pub async fn health(&self) -> Result<Health, ApiError> {
        self.get_json("/api/health").await
    }

    /// Pass-through agent chat. No local state beyond the caller's transcript.
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = serde_json::json!({ "message": message, "history": history });
        let resp = self.http.post(&url).json(&body).send().await?;
        let resp = check_status(resp).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Open the SSE log stream. The caller owns the response and reads its
    /// byte stream; dropping the response closes the connection.
    ///
    /// `last_id` is the replay cursor: the server resumes after that row id
    /// instead of replaying its recent-history window, so a reconnect never
    /// delivers duplicate lines.
    pub async fn open_log_stream(&self, last_id: Option<i64>) -> Result<Response, ApiError> {
        let mut url = format!("{}/api/logs/stream", self.base_url);
        if let Some(id) = last_id {
            url.push_str(&format!("?last_id={}", id));
        }
        debug!("Opening log stream: {}", url);
        // The stream is long-lived; override the client's request timeout so
        // it is not killed mid-flight.
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(365 * 24 * 3600))
            .send()
            .await?;
        check_status(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let resp = self.http.get(&url).send().await?;
        let resp = check_status(resp).await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    // The backend wraps errors as {"error": "..."}; surface just the message
    let body = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(v) => v
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .unwrap_or(body),
        Err(_) => body,
    };
    Err(ApiError::Status { status, body })
}
