//! Final-answer extraction from raw engine output.
//!
//! The engine streams its reasoning trace followed by a `Final Answer:`
//! section. Only the text after the last marker is kept for the condensed
//! history; a response without a marker condenses to nothing.

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// Outcome of looking for the final answer in a raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalAnswer {
    /// Trimmed text following the last marker.
    Found(String),
    /// The marker never occurs.
    Missing,
}

impl FinalAnswer {
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once(FINAL_ANSWER_MARKER) {
            Some((_, tail)) => FinalAnswer::Found(tail.trim().to_string()),
            None => FinalAnswer::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FinalAnswer::Missing)
    }

    /// The condensed text: the answer, or `""` when the marker is missing.
    pub fn as_str(&self) -> &str {
        match self {
            FinalAnswer::Found(text) => text,
            FinalAnswer::Missing => "",
        }
    }

    pub fn into_string(self) -> String {
        match self {
            FinalAnswer::Found(text) => text,
            FinalAnswer::Missing => String::new(),
        }
    }
}

/// Text after the last `Final Answer:` marker, trimmed; empty if there is none.
pub fn extract_final_answer(raw: &str) -> String {
    FinalAnswer::parse(raw).into_string()
}
