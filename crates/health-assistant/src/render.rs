//! Plain-text rendering of parsed segments, results and the chat transcript.

use chrono::Local;

use health_common::api::Doctor;

use crate::annotation::{self, Segment, Sentence, EXPLANATION_LABEL};
use crate::doctors::SearchResults;
use crate::model::{ChatMessage, Sender, Visibility};
use crate::session::ChatState;
use crate::symptoms::AnalysisView;

const BOLD_ON: &str = "\x1b[1m";
const HIGHLIGHT_ON: &str = "\x1b[1;33m";
const RESET: &str = "\x1b[0m";

const NO_MATCHES: &str = "No doctors found matching your criteria";
const NO_MATCHES_HINT: &str = "Try adjusting your filters or search in a different location";

#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.color && !text.is_empty() {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn segment(&self, segment: &Segment) -> String {
        match segment {
            Segment::Plain(text) => text.clone(),
            Segment::Bold(text) => self.styled(BOLD_ON, text),
            Segment::Explanation { remainder, .. } => {
                format!("{}{remainder}", self.styled(HIGHLIGHT_ON, EXPLANATION_LABEL))
            }
            Segment::SymptomChip(inner) => format!("[{}]", self.segments(inner)),
        }
    }

    pub fn segments(&self, segments: &[Segment]) -> String {
        segments.iter().map(|s| self.segment(s)).collect()
    }

    /// One line per sentence; explanation sentences are set off as a call-out.
    pub fn sentences(&self, sentences: &[Sentence]) -> String {
        sentences
            .iter()
            .map(|sentence| {
                let text = format!("{}.", self.segments(&sentence.segments).trim());
                if sentence.explanation {
                    format!("  > {}", self.styled(HIGHLIGHT_ON, &text))
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn analysis(&self, view: &AnalysisView) -> String {
        let mut out = format!("Identified symptoms: {}\n", self.chips(&view.symptoms));
        if let Some(diagnosis) = &view.diagnosis {
            out.push_str("\nPossible assessment:\n");
            out.push_str(&self.sentences(diagnosis));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.segments(&view.disclaimer));
        out
    }

    fn chips(&self, chips: &[Segment]) -> String {
        chips
            .iter()
            .map(|chip| self.segment(chip))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn message(&self, message: &ChatMessage) -> String {
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        let (who, body) = match message.sender {
            Sender::User => ("You", message.text.clone()),
            Sender::Assistant => {
                let body = self.segments(&annotation::parse(&message.text));
                ("Assistant", body)
            }
        };
        format!("[{time}] {}: {body}", self.styled(BOLD_ON, who))
    }

    pub fn transcript(&self, state: &ChatState) -> String {
        let mut lines: Vec<String> = state.history.iter().map(|m| self.message(m)).collect();
        if state.is_pending() {
            lines.push("Assistant is typing...".to_string());
        }
        if let Some(error) = state.last_error() {
            lines.push(self.banner(error));
        }
        lines.join("\n")
    }

    pub fn widget_status(&self, state: &ChatState) -> &'static str {
        if !state.present {
            return "chat widget removed";
        }
        match state.visibility {
            Visibility::Closed => "chat closed",
            Visibility::Expanded => "chat open",
            Visibility::Minimized => "chat minimized",
        }
    }

    pub fn banner(&self, message: &str) -> String {
        self.styled(HIGHLIGHT_ON, &format!("! {message}"))
    }

    pub fn doctor(&self, doctor: &Doctor) -> String {
        let mut out = format!(
            "{} ({})\n  {} {:.1}\n  {}\n  Phone: {} | Email: {}",
            self.styled(BOLD_ON, &doctor.name),
            doctor.specialty,
            stars(doctor.rating),
            doctor.rating,
            doctor.address,
            doctor.phone,
            doctor.email,
        );
        if let Some(distance) = doctor.distance {
            out.push_str(&format!("\n  {distance:.1} km away"));
        }
        out
    }

    /// Nothing is shown before the first search completes.
    pub fn search_results(&self, results: &SearchResults) -> Option<String> {
        match results {
            SearchResults::Idle => None,
            SearchResults::NoMatches => Some(format!("{NO_MATCHES}\n{NO_MATCHES_HINT}")),
            SearchResults::Found(doctors) => {
                let noun = match doctors.len() {
                    1 => "Doctor",
                    _ => "Doctors",
                };
                let mut out = format!("{} {noun} Found", doctors.len());
                for doctor in doctors {
                    out.push_str("\n\n");
                    out.push_str(&self.doctor(doctor));
                }
                Some(out)
            }
        }
    }
}

/// Rating rounded to whole stars, out of five.
fn stars(rating: f64) -> String {
    let filled = rating.round().clamp(0.0, 5.0) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_common::api::{AnalyzeResponse, Coordinates};

    use crate::orchestrator::Tracked;

    fn sample_doctor(rating: f64, distance: Option<f64>) -> Doctor {
        Doctor {
            id: "d1".to_string(),
            name: "Dr. Smith 1".to_string(),
            specialty: "Cardiologist".to_string(),
            address: "1 Medical Street, Healthcare City".to_string(),
            phone: "+1-555-001-1111".to_string(),
            email: "doctor1@example.com".to_string(),
            rating,
            distance,
            location: Coordinates {
                lat: 37.78,
                lng: -122.41,
            },
            place_id: None,
        }
    }

    #[test]
    fn test_plain_rendering_strips_markup() {
        let renderer = Renderer::new(false);
        let segments = annotation::parse("Drink **water**. EXPLANATION: it helps");
        assert_eq!(
            renderer.segments(&segments),
            "Drink water. Explanation: it helps"
        );
    }

    #[test]
    fn test_color_rendering_wraps_bold() {
        let renderer = Renderer::new(true);
        assert_eq!(
            renderer.segment(&Segment::Bold("Fever".to_string())),
            "\x1b[1mFever\x1b[0m"
        );
    }

    #[test]
    fn test_analysis_layout() {
        let view = AnalysisView::from_response(&AnalyzeResponse {
            extracted_symptoms: "**Fever**, Cough".to_string(),
            diagnosis: Some("Likely a cold. Explanation: mild symptoms".to_string()),
        });
        let text = Renderer::new(false).analysis(&view);
        assert!(text.starts_with("Identified symptoms: [Fever] [Cough]\n"));
        assert!(text.contains("Likely a cold.\n  > Explanation: mild symptoms."));
        assert!(text.ends_with("does not replace professional medical advice."));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_star_rounding() {
        assert_eq!(stars(4.4), "★★★★☆");
        assert_eq!(stars(4.5), "★★★★★");
        assert_eq!(stars(0.2), "☆☆☆☆☆");
    }

    #[test]
    fn test_doctor_card_distance_one_decimal() {
        let renderer = Renderer::new(false);
        let card = renderer.doctor(&sample_doctor(3.6, Some(2.345)));
        assert!(card.contains("★★★★☆ 3.6"));
        assert!(card.contains("2.3 km away"));
        assert!(!renderer.doctor(&sample_doctor(3.6, None)).contains("km away"));
    }

    #[test]
    fn test_search_result_headers() {
        let renderer = Renderer::new(false);
        assert!(renderer.search_results(&SearchResults::Idle).is_none());

        let one = renderer
            .search_results(&SearchResults::Found(vec![sample_doctor(4.0, None)]))
            .unwrap();
        assert!(one.starts_with("1 Doctor Found"));

        let two = renderer
            .search_results(&SearchResults::Found(vec![
                sample_doctor(4.0, None),
                sample_doctor(2.0, None),
            ]))
            .unwrap();
        assert!(two.starts_with("2 Doctors Found"));

        let none = renderer.search_results(&SearchResults::NoMatches).unwrap();
        assert!(none.starts_with(NO_MATCHES));
    }

    #[test]
    fn test_transcript_shows_typing_and_error() {
        let mut state = ChatState::default();
        state.tracker_mut().begin();
        state.tracker_mut().set_error("Error from server: 500");
        let renderer = Renderer::new(false);
        let text = renderer.transcript(&state);
        assert!(text.contains("Assistant: Hello!"));
        assert!(text.contains("Assistant is typing..."));
        assert!(text.ends_with("! Error from server: 500"));
        assert_eq!(renderer.widget_status(&state), "chat closed");
    }
}
