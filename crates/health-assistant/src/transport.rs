//! Seams to the external services the front end depends on.
//!
//! Controllers only see these traits, so tests drive them with in-memory fakes
//! and the binary plugs in [`HttpBackend`].

use async_trait::async_trait;
use futures::future::join_all;

use health_common::api::{
    AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, Coordinates, DoctorSearchParams,
    DoctorSearchResponse,
};
use health_common::backend::{BackendClient, Service};
use health_common::error::TransportError;

use crate::error::AppError;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, TransportError>;

    async fn reset(&self, session_id: &str) -> Result<(), TransportError>;
}

#[async_trait]
pub trait SymptomAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalyzeResponse, TransportError>;
}

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn specialties(&self) -> Result<Vec<String>, TransportError>;

    async fn search(
        &self,
        params: &DoctorSearchParams,
    ) -> Result<DoctorSearchResponse, TransportError>;
}

/// Address lookup. Treated as a black box that turns text into coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, query: &str) -> Result<Coordinates, AppError>;

    /// Display label for a device position.
    async fn describe(&self, coordinates: Coordinates) -> Option<String>;
}

/// Stand-in geocoder: every address resolves to the same fixed point.
#[derive(Debug, Clone)]
pub struct FixedGeocoder {
    coordinates: Coordinates,
}

impl Default for FixedGeocoder {
    fn default() -> Self {
        Self {
            coordinates: Coordinates {
                lat: 37.7749,
                lng: -122.4194,
            },
        }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn locate(&self, _query: &str) -> Result<Coordinates, AppError> {
        Ok(self.coordinates)
    }

    async fn describe(&self, _coordinates: Coordinates) -> Option<String> {
        Some("Your Current Location".to_string())
    }
}

/// HTTP implementation of every service seam, carrying the shared credential.
#[derive(Clone)]
pub struct HttpBackend {
    client: BackendClient,
    api_key: String,
}

impl HttpBackend {
    pub fn new(client: BackendClient, api_key: String) -> Self {
        Self { client, api_key }
    }

    /// Check every service's health endpoint concurrently.
    pub async fn check_all(&self) -> Vec<(Service, Result<(), TransportError>)> {
        let checks = Service::ALL.iter().map(|&service| async move {
            let result = self.client.health(service).await;
            (service, result)
        });
        join_all(checks).await
    }
}

#[async_trait]
impl ChatTransport for HttpBackend {
    async fn send(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatResponse, TransportError> {
        let request = ChatRequest {
            message: message.to_string(),
            api_key: self.api_key.clone(),
            session_id: session_id.map(str::to_string),
        };
        self.client.chat(&request).await
    }

    async fn reset(&self, session_id: &str) -> Result<(), TransportError> {
        let request = ChatRequest {
            message: String::new(),
            api_key: self.api_key.clone(),
            session_id: Some(session_id.to_string()),
        };
        self.client.reset_chat(&request).await
    }
}

#[async_trait]
impl SymptomAnalyzer for HttpBackend {
    async fn analyze(&self, text: &str) -> Result<AnalyzeResponse, TransportError> {
        let request = AnalyzeRequest {
            text: text.to_string(),
            api_key: self.api_key.clone(),
        };
        self.client.analyze(&request).await
    }
}

#[async_trait]
impl DoctorDirectory for HttpBackend {
    async fn specialties(&self) -> Result<Vec<String>, TransportError> {
        self.client.specialties().await
    }

    async fn search(
        &self,
        params: &DoctorSearchParams,
    ) -> Result<DoctorSearchResponse, TransportError> {
        self.client.search_doctors(params).await
    }
}
