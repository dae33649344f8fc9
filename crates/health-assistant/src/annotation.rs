//! Parser for the annotated text returned by the analysis and chat services.
//!
//! The markup is small and line-oriented:
//! - Bold spans: `**text**` (the span may not cross a line break)
//! - Explanation call-out: the first `explanation:` in a run of plain text, any casing
//! - Diagnosis text: sentences separated by `.`
//! - Symptom text: items separated by `,`
//!
//! Parser approach: a single left-to-right scan for bold delimiters, then a
//! case-insensitive search for the call-out marker inside each plain run.
//! Every function is total: malformed markup degrades to plain text and the
//! parser never panics.

/// Fixed label rendered in place of whatever casing the source used.
pub const EXPLANATION_LABEL: &str = "Explanation:";

const BOLD_MARKER: &str = "**";
const EXPLANATION_MARKER: &str = "explanation:";

/// One classified, contiguous unit of parsed text, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    /// Content with the `**` delimiters stripped.
    Bold(String),
    /// The call-out label and the text that followed it in the same run.
    Explanation {
        /// Marker exactly as written in the source, e.g. `EXPLANATION:`.
        marker: String,
        remainder: String,
    },
    /// One item of a symptom list, holding its own plain/bold segments.
    SymptomChip(Vec<Segment>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Bold,
    ExplanationLabel,
    SymptomChip,
}

impl Segment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Plain(_) => SegmentKind::Plain,
            Segment::Bold(_) => SegmentKind::Bold,
            Segment::Explanation { .. } => SegmentKind::ExplanationLabel,
            Segment::SymptomChip(_) => SegmentKind::SymptomChip,
        }
    }

    /// Text as shown to the user: delimiters stripped, label normalised.
    pub fn display_text(&self) -> String {
        match self {
            Segment::Plain(text) | Segment::Bold(text) => text.clone(),
            Segment::Explanation { remainder, .. } => format!("{EXPLANATION_LABEL}{remainder}"),
            Segment::SymptomChip(inner) => inner.iter().map(Segment::display_text).collect(),
        }
    }

    /// Source text this segment was parsed from.
    pub fn markup(&self) -> String {
        match self {
            Segment::Plain(text) => text.clone(),
            Segment::Bold(text) => format!("{BOLD_MARKER}{text}{BOLD_MARKER}"),
            Segment::Explanation { marker, remainder } => format!("{marker}{remainder}"),
            Segment::SymptomChip(inner) => to_markup(inner),
        }
    }
}

/// A diagnosis sentence. The terminating `.` is not stored; renderers append it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub segments: Vec<Segment>,
    /// The sentence starts with "explanation" and is highlighted as a whole.
    pub explanation: bool,
}

impl Sentence {
    pub fn display_text(&self) -> String {
        let mut text: String = self.segments.iter().map(Segment::display_text).collect();
        text.push('.');
        text
    }
}

/// Parse general annotated text: bold spans and the explanation call-out.
pub fn parse(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for token in scan_bold(raw) {
        match token {
            Token::Bold(text) => segments.push(Segment::Bold(text.to_string())),
            Token::Text(text) => split_explanation(text, &mut segments),
        }
    }
    segments
}

/// Parse text where only bold spans carry meaning (symptom chips, disclaimers).
pub fn parse_bold(raw: &str) -> Vec<Segment> {
    scan_bold(raw)
        .into_iter()
        .map(|token| match token {
            Token::Bold(text) => Segment::Bold(text.to_string()),
            Token::Text(text) => Segment::Plain(text.to_string()),
        })
        .collect()
}

/// Split diagnosis text into sentences on `.`, skipping blank fragments.
pub fn parse_diagnosis(raw: &str) -> Vec<Sentence> {
    raw.split('.')
        .filter(|fragment| !fragment.trim().is_empty())
        .map(|fragment| Sentence {
            segments: parse(fragment),
            explanation: fragment.trim().to_lowercase().starts_with("explanation"),
        })
        .collect()
}

/// Split a comma-separated symptom list into chips. Commas are not kept.
pub fn parse_symptom_list(raw: &str) -> Vec<Segment> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| Segment::SymptomChip(parse_bold(item)))
        .collect()
}

/// Rebuild the source text of a segment sequence.
pub fn to_markup(segments: &[Segment]) -> String {
    segments.iter().map(Segment::markup).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Bold(&'a str),
}

/// Find `**...**` spans, shortest match first, never crossing a line break.
///
/// An opening marker without a closing one on the same line is left in the
/// surrounding text and scanning resumes one byte later, so `**a\n**b**`
/// yields plain `**a\n` followed by bold `b`.
fn scan_bold(raw: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = raw[cursor..].find(BOLD_MARKER) {
        let open = cursor + offset;
        let body_start = open + BOLD_MARKER.len();
        match closing_marker(&raw[body_start..]) {
            Some(body_len) => {
                if open > text_start {
                    tokens.push(Token::Text(&raw[text_start..open]));
                }
                tokens.push(Token::Bold(&raw[body_start..body_start + body_len]));
                cursor = body_start + body_len + BOLD_MARKER.len();
                text_start = cursor;
            }
            // The marker is ASCII, so one byte past `open` is a char boundary.
            None => cursor = open + 1,
        }
    }

    if text_start < raw.len() {
        tokens.push(Token::Text(&raw[text_start..]));
    }
    tokens
}

/// Length of the bold body before the next `**`, if it stays on one line.
fn closing_marker(rest: &str) -> Option<usize> {
    let close = rest.find(BOLD_MARKER)?;
    if rest[..close].contains('\n') {
        return None;
    }
    Some(close)
}

fn split_explanation(text: &str, out: &mut Vec<Segment>) {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();
    let Some(pos) = lowered.find(EXPLANATION_MARKER) else {
        out.push(Segment::Plain(text.to_string()));
        return;
    };

    let end = pos + EXPLANATION_MARKER.len();
    if pos > 0 {
        out.push(Segment::Plain(text[..pos].to_string()));
    }
    out.push(Segment::Explanation {
        marker: text[pos..end].to_string(),
        remainder: text[end..].to_string(),
    });
}
