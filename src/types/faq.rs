//! FAQ catalog domain types.

use serde::{Deserialize, Serialize};

/// One entry of the FAQ catalog: an answer plus the questions it matches.
///
/// Entries are immutable once loaded; a catalog update rebuilds the whole
/// index rather than mutating entries in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub answer: String,

    /// Phrasings users are expected to ask with, in catalog order.
    #[serde(rename = "matched_questions", default)]
    pub questions: Vec<String>,
}

impl FaqEntry {
    pub fn new(
        title: impl Into<String>,
        answer: impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            answer: answer.into(),
            questions,
        }
    }
}

/// What the index vectors are keyed on.
///
/// `QuestionKeyed` indexes one vector per (entry, question) pair so queries
/// match against how users ask; `AnswerKeyed` indexes one vector per entry
/// keyed by its answer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    QuestionKeyed,
    AnswerKeyed,
}

/// How hits that resolve to the same entry are merged when
/// `average_questions` is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Arithmetic mean of the merged hits' relevance.
    #[default]
    Average,
    /// Best hit wins, others are dropped.
    MaxWins,
}

/// A ranked answer returned across the engine boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub title: String,
    /// The question (or answer text, in answer-keyed mode) the query matched.
    pub matched_question: String,
    pub answer: String,
    /// Relevance score in `0..=100`, higher is better.
    pub relevance: u8,
}
