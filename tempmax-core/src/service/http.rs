use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    ClientSettings,
    error::{ErrorDetail, RequestError, collapse_whitespace},
    model::{HealthStatus, PredictionInput, PredictionResult},
};

use super::PredictionService;

/// Shown when the transport fails without producing any message.
pub const CONNECTIVITY_MESSAGE: &str = "Could not connect to the prediction server";

#[derive(Debug, Clone)]
pub struct HttpPredictionService {
    settings: ClientSettings,
    http: Client,
}

impl HttpPredictionService {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { settings: settings.clone(), http })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// `GET /health`: whether the service has a model loaded.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.settings.endpoint("health");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to send health request to {url}"))?;

        let status = res.status();
        let body = res.text().await.context("Failed to read health response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Health request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse health JSON")
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<ErrorDetail>,
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, RequestError> {
        let url = self.settings.endpoint("predict");
        debug!(%url, date = %input.fecha_observacion, "sending prediction request");

        let res = self.http.post(&url).json(input).send().await.map_err(network_error)?;

        let status = res.status();
        let body = res.text().await.map_err(network_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "prediction response received");

        if !status.is_success() {
            return Err(RequestError::Http { status: status.as_u16(), detail: error_detail(status, &body) });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "malformed prediction response");
            RequestError::Http {
                status: status.as_u16(),
                detail: ErrorDetail::Text(format!("Invalid response body: {e}")),
            }
        })
    }
}

fn network_error(err: reqwest::Error) -> RequestError {
    let message = if err.is_timeout() {
        "The prediction server did not answer in time".to_string()
    } else if err.is_connect() {
        CONNECTIVITY_MESSAGE.to_string()
    } else {
        err.to_string()
    };

    warn!(error = %err, "prediction request failed without a response");
    RequestError::Network { message }
}

/// Extract `detail` from an error body, keeping whatever shape it has. Bodies
/// that are not JSON, or lack `detail`, fall back to the raw text or the
/// status reason phrase.
fn error_detail(status: StatusCode, body: &str) -> ErrorDetail {
    if let Ok(ErrorBody { detail: Some(detail) }) = serde_json::from_str::<ErrorBody>(body) {
        return detail;
    }

    let text = collapse_whitespace(body);
    if text.is_empty() {
        ErrorDetail::Text(status.canonical_reason().unwrap_or("Unknown error").to_string())
    } else {
        ErrorDetail::Text(truncate_body(&text))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
