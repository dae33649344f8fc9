use std::sync::Arc;

use tracing::{debug, info, warn};

use health_common::api::{Coordinates, Doctor, DoctorSearchParams};

use crate::error::AppError;
use crate::model::{Location, SearchQuery};
use crate::orchestrator::{Orchestrator, Outcome, RequestTracker, Tracked};
use crate::transport::{DoctorDirectory, Geocoder};

pub const SPECIALTIES_FAILED: &str = "Failed to load medical specialties";
pub const SEARCH_FAILED: &str = "Failed to search for doctors";
pub const MISSING_LOCATION: &str = "Please enter a location";
pub const LOCATION_NOT_FOUND: &str = "Unable to find location. Please try a different address.";

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchResults {
    /// No search has completed yet.
    #[default]
    Idle,
    Found(Vec<Doctor>),
    NoMatches,
}

#[derive(Debug)]
struct SearchState {
    query: SearchQuery,
    results: SearchResults,
    specialties: Vec<String>,
    requests: RequestTracker,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: SearchQuery::default(),
            results: SearchResults::Idle,
            specialties: Vec::new(),
            requests: RequestTracker::with_context(SEARCH_FAILED),
        }
    }
}

impl Tracked for SearchState {
    fn tracker(&self) -> &RequestTracker {
        &self.requests
    }

    fn tracker_mut(&mut self) -> &mut RequestTracker {
        &mut self.requests
    }
}

type SelectHook = Box<dyn Fn(&Doctor) + Send + Sync>;

/// The doctor search panel: location, filters and the last result list.
///
/// Changing a filter re-runs the search when a location is known. Searches
/// are not blocked while one is running; the latest one issued wins.
pub struct DoctorSearch {
    directory: Arc<dyn DoctorDirectory>,
    geocoder: Arc<dyn Geocoder>,
    panel: Orchestrator<SearchState>,
    on_select: Option<SelectHook>,
}

impl DoctorSearch {
    pub fn new(directory: Arc<dyn DoctorDirectory>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            directory,
            geocoder,
            panel: Orchestrator::new(SearchState::default()),
            on_select: None,
        }
    }

    /// Called with the doctor the user picked from the results.
    pub fn with_select_hook(mut self, hook: impl Fn(&Doctor) + Send + Sync + 'static) -> Self {
        self.on_select = Some(Box::new(hook));
        self
    }

    /// Fetch the specialty filter options. Failure leaves the list empty.
    pub async fn load_specialties(&self) {
        match self.directory.specialties().await {
            Ok(specialties) => {
                debug!(count = specialties.len(), "loaded specialties");
                self.panel.lock().await.specialties = specialties;
            }
            Err(err) => {
                warn!(error = %err, "failed to load specialties");
                self.panel.set_error(SPECIALTIES_FAILED).await;
            }
        }
    }

    /// Resolve a typed address and search around it.
    pub async fn locate(&self, input: &str) -> bool {
        let input = input.trim();
        if input.is_empty() {
            let err = AppError::Validation(MISSING_LOCATION.to_string());
            self.panel.reject(&err).await;
            return false;
        }

        let coordinates = match self.geocoder.locate(input).await {
            Ok(coordinates) => coordinates,
            Err(err) => {
                warn!(error = %err, address = input, "geocoding failed");
                self.panel.set_error(LOCATION_NOT_FOUND).await;
                return false;
            }
        };

        self.run_search(|state| {
            state.query.location = Some(Location {
                coordinates,
                label: Some(input.to_string()),
            });
            state.query.to_params()
        })
        .await
    }

    /// Search around a device position.
    pub async fn use_position(&self, coordinates: Coordinates) -> bool {
        let label = self.geocoder.describe(coordinates).await;
        self.run_search(|state| {
            state.query.location = Some(Location { coordinates, label });
            state.query.to_params()
        })
        .await
    }

    pub async fn set_specialty(&self, specialty: &str) -> bool {
        self.update_query(|query| query.set_specialty(specialty)).await
    }

    pub async fn set_radius(&self, radius_km: u32) -> bool {
        self.update_query(|query| query.set_radius(radius_km)).await
    }

    pub async fn clear_filters(&self) -> bool {
        self.update_query(SearchQuery::clear_filters).await
    }

    /// Apply a filter change, searching again only if the query changed and a
    /// location is already known.
    async fn update_query(&self, change: impl FnOnce(&mut SearchQuery)) -> bool {
        self.run_search(|state| {
            let before = state.query.clone();
            change(&mut state.query);
            if state.query == before {
                return None;
            }
            state.query.to_params()
        })
        .await
    }

    /// Run one search with the current filters.
    pub async fn search(&self) -> bool {
        self.run_search(|state| {
            let params = state.query.to_params();
            if params.is_none() {
                let err = AppError::Validation(MISSING_LOCATION.to_string());
                state.requests.reject(&err);
            }
            params
        })
        .await
    }

    /// `prepare` updates the query under the panel lock and yields the
    /// parameters to send, or `None` to skip the search.
    async fn run_search(
        &self,
        prepare: impl FnOnce(&mut SearchState) -> Option<DoctorSearchParams>,
    ) -> bool {
        let directory = &self.directory;
        self.panel
            .execute(
                |state| {
                    let params = prepare(state)?;
                    info!(
                        location = %params.location,
                        radius = params.radius,
                        specialty = params.specialty.as_deref().unwrap_or("all"),
                        "searching for doctors"
                    );
                    Some(params)
                },
                |params| async move { directory.search(&params).await },
                |state, outcome| {
                    if let Outcome::Completed(response) = outcome {
                        state.results = if response.doctors.is_empty() {
                            SearchResults::NoMatches
                        } else {
                            SearchResults::Found(response.doctors)
                        };
                    }
                },
            )
            .await
            .is_some()
    }

    /// Hand the doctor at `position` in the current results to the owner.
    pub async fn select(&self, position: usize) -> Option<Doctor> {
        let doctor = match &self.panel.lock().await.results {
            SearchResults::Found(doctors) => doctors.get(position).cloned(),
            _ => None,
        }?;
        info!(doctor_id = %doctor.id, "doctor selected");
        if let Some(hook) = &self.on_select {
            hook(&doctor);
        }
        Some(doctor)
    }

    pub async fn query(&self) -> SearchQuery {
        self.panel.lock().await.query.clone()
    }

    pub async fn results(&self) -> SearchResults {
        self.panel.lock().await.results.clone()
    }

    pub async fn specialties(&self) -> Vec<String> {
        self.panel.lock().await.specialties.clone()
    }

    pub async fn is_searching(&self) -> bool {
        self.panel.is_pending().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.panel.last_error().await
    }
}
