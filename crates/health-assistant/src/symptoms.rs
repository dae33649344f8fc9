use std::sync::Arc;

use tracing::{debug, info};

use health_common::api::AnalyzeResponse;

use crate::annotation::{self, Segment, Sentence};
use crate::error::AppError;
use crate::model::Symptom;
use crate::orchestrator::{Orchestrator, Outcome, RequestTracker, Tracked};
use crate::transport::SymptomAnalyzer;

pub const DISCLAIMER: &str = "⚠️ **Disclaimer:** This analysis is for informational purposes \
                              only and does not replace professional medical advice.";

const MISSING_INPUT: &str =
    "Please describe your symptoms or select some from the common symptoms list";

/// Analysis result parsed for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub symptoms: Vec<Segment>,
    /// Only present when the analyzer returned a diagnosis.
    pub diagnosis: Option<Vec<Sentence>>,
    pub disclaimer: Vec<Segment>,
}

impl AnalysisView {
    pub fn from_response(response: &AnalyzeResponse) -> Self {
        Self {
            symptoms: annotation::parse_symptom_list(&response.extracted_symptoms),
            diagnosis: response
                .diagnosis
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(annotation::parse_diagnosis),
            disclaimer: annotation::parse_bold(DISCLAIMER),
        }
    }
}

#[derive(Debug, Default)]
struct CheckerState {
    description: String,
    selected: Vec<Symptom>,
    result: Option<AnalyzeResponse>,
    requests: RequestTracker,
}

impl CheckerState {
    /// Typed description first, then the selected symptom names.
    fn analysis_text(&self) -> String {
        std::iter::once(self.description.trim())
            .chain(self.selected.iter().map(|s| s.name))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Tracked for CheckerState {
    fn tracker(&self) -> &RequestTracker {
        &self.requests
    }

    fn tracker_mut(&mut self) -> &mut RequestTracker {
        &mut self.requests
    }
}

/// The symptom description form.
pub struct SymptomChecker {
    analyzer: Arc<dyn SymptomAnalyzer>,
    form: Orchestrator<CheckerState>,
}

impl SymptomChecker {
    pub fn new(analyzer: Arc<dyn SymptomAnalyzer>) -> Self {
        Self {
            analyzer,
            form: Orchestrator::new(CheckerState::default()),
        }
    }

    pub async fn set_description(&self, description: &str) {
        self.form.lock().await.description = description.to_string();
    }

    /// Add a symptom to the selection. Returns `false` if it was already selected.
    pub async fn select(&self, symptom: Symptom) -> bool {
        let mut state = self.form.lock().await;
        if state.selected.iter().any(|s| s.id == symptom.id) {
            return false;
        }
        state.selected.push(symptom);
        true
    }

    pub async fn selected(&self) -> Vec<Symptom> {
        self.form.lock().await.selected.clone()
    }

    /// Run one analysis of the current description and selection.
    ///
    /// Ignored while an analysis is in flight. Returns `false` when nothing
    /// was dispatched.
    pub async fn analyze(&self) -> bool {
        let analyzer = &self.analyzer;
        self.form
            .execute(
                |state| {
                    if state.requests.is_pending() {
                        debug!("analysis already in flight");
                        return None;
                    }
                    let text = state.analysis_text();
                    if text.is_empty() {
                        let err = AppError::Validation(MISSING_INPUT.to_string());
                        state.requests.reject(&err);
                        return None;
                    }
                    info!(chars = text.len(), "analyzing symptoms");
                    Some(text)
                },
                |text| async move { analyzer.analyze(&text).await },
                |state, outcome| {
                    if let Outcome::Completed(response) = outcome {
                        state.result = Some(response);
                    }
                },
            )
            .await
            .is_some()
    }

    pub async fn result(&self) -> Option<AnalysisView> {
        self.form
            .lock()
            .await
            .result
            .as_ref()
            .map(AnalysisView::from_response)
    }

    pub async fn is_analyzing(&self) -> bool {
        self.form.is_pending().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.form.last_error().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use health_common::backend::StatusCode;
    use health_common::error::TransportError;

    use crate::model::{common_symptom, COMMON_SYMPTOMS};

    struct FakeAnalyzer {
        seen: std::sync::Mutex<Vec<String>>,
        calls: AtomicUsize,
        fail: bool,
        /// When set, every call waits to be released.
        gate: Option<Notify>,
    }

    impl FakeAnalyzer {
        fn new(fail: bool) -> Self {
            Self {
                seen: std::sync::Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                fail,
                gate: None,
            }
        }
    }

    #[async_trait]
    impl SymptomAnalyzer for FakeAnalyzer {
        async fn analyze(&self, text: &str) -> Result<AnalyzeResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(text.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(TransportError::Upstream {
                    status: StatusCode::BAD_GATEWAY,
                    body: String::new(),
                });
            }
            Ok(AnalyzeResponse {
                extracted_symptoms: "**Fever**, Headache".to_string(),
                diagnosis: Some(
                    "Possible **flu**. Explanation: fever with headache.".to_string(),
                ),
            })
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_validation_failure() {
        let analyzer = Arc::new(FakeAnalyzer::new(false));
        let checker = SymptomChecker::new(analyzer.clone());
        checker.set_description("   ").await;

        assert!(!checker.analyze().await);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(checker.last_error().await.as_deref(), Some(MISSING_INPUT));
        assert!(checker.result().await.is_none());
    }

    #[tokio::test]
    async fn test_analysis_text_joins_description_and_selection() {
        let analyzer = Arc::new(FakeAnalyzer::new(false));
        let checker = SymptomChecker::new(analyzer.clone());
        checker.set_description("sore throat since Monday").await;
        assert!(checker.select(COMMON_SYMPTOMS[1]).await);
        assert!(checker.select(common_symptom("cough").unwrap()).await);
        assert!(!checker.select(COMMON_SYMPTOMS[1]).await);
        assert_eq!(checker.selected().await.len(), 2);

        assert!(checker.analyze().await);
        assert_eq!(
            analyzer.seen.lock().unwrap().as_slice(),
            ["sore throat since Monday, Fever, Cough"]
        );
    }

    #[tokio::test]
    async fn test_selection_alone_is_enough() {
        let analyzer = Arc::new(FakeAnalyzer::new(false));
        let checker = SymptomChecker::new(analyzer.clone());
        checker.select(COMMON_SYMPTOMS[0]).await;
        assert!(checker.analyze().await);
        assert_eq!(analyzer.seen.lock().unwrap().as_slice(), ["Headache"]);
    }

    #[tokio::test]
    async fn test_result_is_parsed_for_display() {
        let checker = SymptomChecker::new(Arc::new(FakeAnalyzer::new(false)));
        checker.set_description("fever and headache").await;
        checker.analyze().await;

        let view = checker.result().await.unwrap();
        assert_eq!(
            view.symptoms,
            vec![
                Segment::SymptomChip(vec![Segment::Bold("Fever".to_string())]),
                Segment::SymptomChip(vec![Segment::Plain("Headache".to_string())]),
            ]
        );
        let diagnosis = view.diagnosis.unwrap();
        assert_eq!(diagnosis.len(), 2);
        assert!(!diagnosis[0].explanation);
        assert!(diagnosis[1].explanation);
        assert_eq!(view.disclaimer[1], Segment::Bold("Disclaimer:".to_string()));
        assert!(checker.last_error().await.is_none());
        assert!(!checker.is_analyzing().await);
    }

    #[tokio::test]
    async fn test_second_analyze_while_pending_is_noop() {
        let analyzer = Arc::new(FakeAnalyzer {
            gate: Some(Notify::new()),
            ..FakeAnalyzer::new(false)
        });
        let checker = SymptomChecker::new(analyzer.clone());
        checker.set_description("fever").await;

        let first = checker.analyze();
        let second = async {
            let was_analyzing = checker.is_analyzing().await;
            let dispatched = checker.analyze().await;
            if let Some(gate) = &analyzer.gate {
                gate.notify_one();
            }
            (was_analyzing, dispatched)
        };
        let (first, (was_analyzing, second)) = tokio::join!(first, second);

        assert!(first);
        assert!(was_analyzing);
        assert!(!second);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
        assert!(checker.result().await.is_some());
        assert!(!checker.is_analyzing().await);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let checker = SymptomChecker::new(Arc::new(FakeAnalyzer::new(true)));
        checker.set_description("fever").await;

        assert!(checker.analyze().await);
        assert!(checker.result().await.is_none());
        assert!(checker
            .last_error()
            .await
            .unwrap()
            .starts_with("Error from server: 502"));
    }

    #[test]
    fn test_missing_diagnosis_has_no_sentences() {
        let view = AnalysisView::from_response(&AnalyzeResponse {
            extracted_symptoms: "Cough".to_string(),
            diagnosis: None,
        });
        assert!(view.diagnosis.is_none());
        assert_eq!(view.symptoms.len(), 1);
    }
}
