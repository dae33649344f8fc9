use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{
    AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, DoctorSearchParams,
    DoctorSearchResponse,
};
use crate::error::TransportError;

pub use reqwest::StatusCode;

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub analyzer_base_url: String,
    pub chat_base_url: String,
    pub doctors_base_url: String,
    /// Only bound on a call; there is no retry or backoff on top of it.
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        let analyzer_base_url = std::env::var("ANALYZER_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let chat_base_url =
            std::env::var("CHAT_BASE_URL").unwrap_or_else(|_| "http://localhost:8001".to_string());
        let doctors_base_url = std::env::var("DOCTOR_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8002".to_string());

        let timeout = std::env::var("BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_error_body_bytes = std::env::var("BACKEND_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            analyzer_base_url: analyzer_base_url.trim_end_matches('/').to_string(),
            chat_base_url: chat_base_url.trim_end_matches('/').to_string(),
            doctors_base_url: doctors_base_url.trim_end_matches('/').to_string(),
            timeout,
            max_error_body_bytes,
        }
    }
}

/// The three backend services the front end talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Analyzer,
    Chat,
    Doctors,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Analyzer, Service::Chat, Service::Doctors];

    pub fn name(&self) -> &'static str {
        match self {
            Service::Analyzer => "symptom analyzer",
            Service::Chat => "health assistant chat",
            Service::Doctors => "doctor directory",
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    config: BackendConfig,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent("health-assistant")
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    fn base_url(&self, service: Service) -> &str {
        match service {
            Service::Analyzer => &self.config.analyzer_base_url,
            Service::Chat => &self.config.chat_base_url,
            Service::Doctors => &self.config.doctors_base_url,
        }
    }

    pub async fn analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalyzeResponse, TransportError> {
        let url = format!("{}/analyze", self.config.analyzer_base_url);
        debug!(url = %url, "dispatching symptom analysis");
        let resp = self.http.post(&url).json(request).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/chat", self.config.chat_base_url);
        debug!(url = %url, session_id = ?request.session_id, "dispatching chat turn");
        let resp = self.http.post(&url).json(request).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    /// Resets the server-side conversation. Only the status matters; the body is ignored.
    pub async fn reset_chat(&self, request: &ChatRequest) -> Result<(), TransportError> {
        let url = format!("{}/reset", self.config.chat_base_url);
        debug!(url = %url, session_id = ?request.session_id, "dispatching chat reset");
        let resp = self.http.post(&url).json(request).send().await?;
        Self::check_status(resp, self.config.max_error_body_bytes).await
    }

    pub async fn specialties(&self) -> Result<Vec<String>, TransportError> {
        let url = format!("{}/api/specialties", self.config.doctors_base_url);
        let resp = self.http.get(&url).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    /// Filters are forwarded verbatim; ordering and inclusion are the service's call.
    pub async fn search_doctors(
        &self,
        params: &DoctorSearchParams,
    ) -> Result<DoctorSearchResponse, TransportError> {
        let url = format!("{}/api/doctors/search", self.config.doctors_base_url);
        debug!(
            url = %url,
            location = %params.location,
            radius = params.radius,
            specialty = ?params.specialty,
            "dispatching doctor search"
        );
        let resp = self.http.get(&url).query(params).send().await?;
        Self::parse_json_response(resp, self.config.max_error_body_bytes).await
    }

    pub async fn health(&self, service: Service) -> Result<(), TransportError> {
        let url = format!("{}/health", service_root(self.base_url(service)));
        let resp = self.http.get(&url).send().await?;
        Self::check_status(resp, self.config.max_error_body_bytes).await
    }

    async fn parse_json_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, TransportError> {
        if resp.status().is_success() {
            let json = resp.json::<T>().await?;
            return Ok(json);
        }
        Err(Self::to_upstream_error(resp, max_error_body_bytes).await)
    }

    async fn check_status(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<(), TransportError> {
        if resp.status().is_success() {
            return Ok(());
        }
        Err(Self::to_upstream_error(resp, max_error_body_bytes).await)
    }

    async fn to_upstream_error(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> TransportError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        warn!(status = %status, body = %body, "backend returned non-success status");
        TransportError::Upstream { status, body }
    }
}

/// Strips a trailing `/api` so health checks hit the service root.
fn service_root(base_url: &str) -> &str {
    base_url.strip_suffix("/api").unwrap_or(base_url)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(b) => {
            let end = b.len().min(max_bytes);
            String::from_utf8_lossy(&b[..end]).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}
