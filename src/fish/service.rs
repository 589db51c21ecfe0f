//! Remote fishing service boundary

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::api::{AutofishResponse, CastResponse, CatchResponse};
use crate::config::ReelConfig;
use crate::error::FishingError;

/// Operations the session controller and autofish loop consume
#[async_trait]
pub trait FishingService: Send + Sync {
    async fn cast(&self) -> Result<CastResponse, FishingError>;

    async fn catch(
        &self,
        session_id: &str,
        reaction_time: Duration,
    ) -> Result<CatchResponse, FishingError>;

    /// Report that the catch window expired without a player action
    async fn report_miss(&self, session_id: &str) -> Result<CatchResponse, FishingError>;

    async fn autofish(&self) -> Result<AutofishResponse, FishingError>;

    async fn fetch_info(&self) -> Result<serde_json::Value, FishingError>;

    async fn fetch_rank(&self) -> Result<serde_json::Value, FishingError>;

    async fn fetch_challenges(&self) -> Result<serde_json::Value, FishingError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatchRequest<'a> {
    session_id: &'a str,
    reaction_time: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MissRequest<'a> {
    session_id: &'a str,
}

/// `reqwest`-backed client for the fishing HTTP API
pub struct HttpFishingService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpFishingService {
    /// Create a client for the API rooted at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FishingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FishingError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a client from the settings file
    pub fn from_config(config: &ReelConfig) -> Result<Self, FishingError> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FishingError> {
        let request = self.authorize(self.client.get(self.url(path)));
        Self::read(request.send().await?).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FishingError> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        Self::read(request.send().await?).await
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FishingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

/// Map a non-2xx response onto the error taxonomy.
///
/// The server's `error` or `message` JSON field is used as the message
/// when present, otherwise the raw body.
pub fn classify_status(status: StatusCode, body: &str) -> FishingError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.to_string()
            }
        });

    match status {
        StatusCode::TOO_MANY_REQUESTS => FishingError::QuotaExceeded { message },
        StatusCode::FORBIDDEN => FishingError::PermissionDenied { message },
        _ => FishingError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl FishingService for HttpFishingService {
    async fn cast(&self) -> Result<CastResponse, FishingError> {
        self.post("fishing/cast", &serde_json::json!({})).await
    }

    async fn catch(
        &self,
        session_id: &str,
        reaction_time: Duration,
    ) -> Result<CatchResponse, FishingError> {
        let body = CatchRequest {
            session_id,
            reaction_time: reaction_time.as_millis() as u64,
        };
        self.post("fishing/catch", &body).await
    }

    async fn report_miss(&self, session_id: &str) -> Result<CatchResponse, FishingError> {
        self.post("fishing/miss", &MissRequest { session_id }).await
    }

    async fn autofish(&self) -> Result<AutofishResponse, FishingError> {
        self.post("fishing/autofish", &serde_json::json!({})).await
    }

    async fn fetch_info(&self) -> Result<serde_json::Value, FishingError> {
        self.get("fishing/info").await
    }

    async fn fetch_rank(&self) -> Result<serde_json::Value, FishingError> {
        self.get("fishing/rank").await
    }

    async fn fetch_challenges(&self) -> Result<serde_json::Value, FishingError> {
        self.get("fishing/challenges").await
    }
}
