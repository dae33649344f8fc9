use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use health_common::api::{Coordinates, DoctorSearchParams};

static MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// One transcript entry. The text is kept raw and only parsed when rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Process-wide increasing counter, so later messages always sort after earlier ones.
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}

/// Where the chat widget currently is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Closed,
    Expanded,
    Minimized,
}

impl Visibility {
    pub fn is_open(&self) -> bool {
        !matches!(self, Visibility::Closed)
    }
}

/// A resolved search location: coordinates plus an optional display label.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    pub label: Option<String>,
}

pub const MIN_RADIUS_KM: u32 = 1;
pub const MAX_RADIUS_KM: u32 = 50;
pub const DEFAULT_RADIUS_KM: u32 = 10;

/// Current doctor-search filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub location: Option<Location>,
    /// `None` means all specialties.
    pub specialty: Option<String>,
    pub radius_km: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            location: None,
            specialty: None,
            radius_km: DEFAULT_RADIUS_KM,
        }
    }
}

impl SearchQuery {
    /// Radius is clamped into `[MIN_RADIUS_KM, MAX_RADIUS_KM]`.
    pub fn set_radius(&mut self, radius_km: u32) {
        self.radius_km = radius_km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM);
    }

    /// Blank input selects all specialties.
    pub fn set_specialty(&mut self, specialty: &str) {
        let specialty = specialty.trim();
        self.specialty = (!specialty.is_empty()).then(|| specialty.to_string());
    }

    pub fn clear_filters(&mut self) {
        self.specialty = None;
        self.radius_km = DEFAULT_RADIUS_KM;
    }

    /// Request parameters, or `None` while no location is resolved.
    pub fn to_params(&self) -> Option<DoctorSearchParams> {
        let location = self.location.as_ref()?;
        Some(DoctorSearchParams {
            location: location.coordinates.to_query_value(),
            radius: self.radius_km,
            specialty: self.specialty.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symptom {
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
}

pub const COMMON_SYMPTOMS: [Symptom; 4] = [
    Symptom {
        id: "1",
        name: "Headache",
        severity: Severity::Medium,
    },
    Symptom {
        id: "2",
        name: "Fever",
        severity: Severity::High,
    },
    Symptom {
        id: "3",
        name: "Cough",
        severity: Severity::Low,
    },
    Symptom {
        id: "4",
        name: "Fatigue",
        severity: Severity::Medium,
    },
];

/// Case-insensitive lookup in [`COMMON_SYMPTOMS`] by name.
pub fn common_symptom(name: &str) -> Option<Symptom> {
    let name = name.trim();
    COMMON_SYMPTOMS
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .copied()
}
