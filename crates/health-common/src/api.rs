use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    /// Free-text symptom description, already joined with the selected symptoms.
    pub text: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    /// Comma-separated symptom list, may carry `**bold**` markup.
    pub extracted_symptoms: String,
    /// Sentence-structured diagnosis text; absent when the analyzer had nothing to say.
    #[serde(default)]
    pub diagnosis: Option<String>,
}

/// Body shared by the chat and reset endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub api_key: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// `lat,lng` form expected by the search endpoint.
    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSearchParams {
    pub location: String,
    pub radius: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    /// 0 to 5
    pub rating: f64,
    /// Kilometres from the searched location, filled in by the service.
    #[serde(default)]
    pub distance: Option<f64>,
    pub location: Coordinates,
    #[serde(default)]
    pub place_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSearchResponse {
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub total: Option<usize>,
}
