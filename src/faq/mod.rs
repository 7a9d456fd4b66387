//! FAQ catalog: ingestion, query orchestration, answer ranking.
//!
//! Owns the mapping from free-text questions to ranked answers. Loading a
//! catalog validates the whole batch, embeds every source text through the
//! cache, builds a fresh graph index and swaps it in atomically; queries run
//! against the snapshot current at their start.

use crate::embeddings::EmbeddingCache;
use crate::index::{HnswIndex, HnswParams, IndexItem, IndexStats};
use crate::types::{Answer, EngineError, FaqEntry, IngestMode, MergePolicy, Result};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Immutable snapshot of one loaded catalog generation.
struct CatalogState {
    entries: Vec<FaqEntry>,
    index: HnswIndex,
    /// Largest number of indexable questions on any single entry; bounds how
    /// many raw hits can collapse into one answer during merging.
    max_questions: usize,
}

impl CatalogState {
    fn empty(params: HnswParams) -> Self {
        Self {
            entries: Vec::new(),
            index: HnswIndex::new(params),
            max_questions: 1,
        }
    }
}

/// The engine facade: load a catalog, then answer questions against it.
///
/// `query` takes `&self` and is freely concurrent; `load` builds a complete
/// replacement state off to the side and swaps it under a short write lock,
/// so in-flight queries finish against the generation they started with and
/// a failed load leaves the previous catalog serving.
pub struct FaqHandler {
    cache: Arc<EmbeddingCache>,
    params: HnswParams,
    average_questions: bool,
    merge_policy: MergePolicy,
    state: RwLock<Arc<CatalogState>>,
}

impl FaqHandler {
    pub fn new(
        cache: Arc<EmbeddingCache>,
        params: HnswParams,
        average_questions: bool,
        merge_policy: MergePolicy,
    ) -> Self {
        let state = RwLock::new(Arc::new(CatalogState::empty(params.clone())));
        Self {
            cache,
            params,
            average_questions,
            merge_policy,
            state,
        }
    }

    /// Number of loaded entries.
    pub fn entry_count(&self) -> usize {
        self.snapshot().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().entries.is_empty()
    }

    pub fn index_stats(&self) -> IndexStats {
        self.snapshot().index.stats()
    }

    /// Validate and ingest a catalog, replacing whatever was loaded before.
    ///
    /// The batch is checked as a whole before any embedding work starts; on
    /// any failure the previous catalog stays live untouched. Calling this
    /// again is the reload path.
    ///
    /// # Errors
    ///
    /// `Validation` naming the offending entry if any entry has an empty
    /// title or answer, or (question-keyed) no non-blank question. Encoder or
    /// store failures propagate and abort the load.
    pub async fn load(&self, entries: Vec<FaqEntry>, mode: IngestMode) -> Result<()> {
        validate_entries(&entries, mode)?;

        let mut index = HnswIndex::new(self.params.clone());
        let mut item_count = 0usize;
        for (record_id, entry) in entries.iter().enumerate() {
            for text in source_texts(entry, mode) {
                let vector = self.cache.get_or_compute(text).await?;
                index.insert(IndexItem {
                    vector,
                    record_id,
                    source_text: text.to_string(),
                })?;
                item_count += 1;
            }
        }

        let max_questions = entries
            .iter()
            .map(|e| indexable_questions(e).count())
            .max()
            .unwrap_or(1)
            .max(1);

        let next = Arc::new(CatalogState {
            entries,
            index,
            max_questions,
        });
        info!(
            entries = next.entries.len(),
            vectors = item_count,
            top_layer = next.index.stats().top_layer,
            "catalog loaded"
        );
        *self.write_state() = next;
        Ok(())
    }

    /// Answer a free-text question with up to `response_count` ranked answers.
    ///
    /// Blank text, `response_count == 0`, or an empty catalog all yield an
    /// empty vec without calling the encoder.
    pub async fn query(&self, text: &str, response_count: usize) -> Result<Vec<Answer>> {
        if text.trim().is_empty() || response_count == 0 {
            return Ok(Vec::new());
        }
        let state = self.snapshot();
        if state.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.cache.get_or_compute(text).await?;

        // Over-fetch when hits can collapse during merging
        let k = if self.average_questions {
            response_count.saturating_mul(state.max_questions)
        } else {
            response_count
        };
        let hits = state.index.search(&query_vector, k)?;
        debug!(hits = hits.len(), k, "index search complete");

        // Raw relevance stays floating point until the final rounding
        let mut scored: Vec<(usize, String, f32)> = hits
            .into_iter()
            .map(|h| (h.record_id, h.source_text, (1.0 - h.distance) * 100.0))
            .collect();

        if self.average_questions {
            scored = merge_by_record(scored, self.merge_policy);
        }

        scored.sort_by(|a, b| b.2.total_cmp(&a.2));
        scored.truncate(response_count);

        Ok(scored
            .into_iter()
            .map(|(record_id, matched, score)| {
                let entry = &state.entries[record_id];
                Answer {
                    title: entry.title.clone(),
                    matched_question: matched,
                    answer: entry.answer.clone(),
                    relevance: score.round().clamp(0.0, 100.0) as u8,
                }
            })
            .collect())
    }

    fn snapshot(&self) -> Arc<CatalogState> {
        // Poisoning cannot leave the Arc itself inconsistent
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, Arc<CatalogState>> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Questions worth indexing: non-blank after trimming.
fn indexable_questions(entry: &FaqEntry) -> impl Iterator<Item = &str> {
    entry
        .questions
        .iter()
        .map(|q| q.as_str())
        .filter(|q| !q.trim().is_empty())
}

fn source_texts(entry: &FaqEntry, mode: IngestMode) -> Vec<&str> {
    match mode {
        IngestMode::QuestionKeyed => indexable_questions(entry).collect(),
        IngestMode::AnswerKeyed => vec![entry.answer.as_str()],
    }
}

/// Check a whole catalog batch before any embedding work.
///
/// # Errors
///
/// `Validation` naming the first offending entry: empty title, empty answer,
/// or (question-keyed) no non-blank question.
pub fn validate_entries(entries: &[FaqEntry], mode: IngestMode) -> Result<()> {
    for (i, entry) in entries.iter().enumerate() {
        let label = if entry.title.trim().is_empty() {
            format!("#{}", i)
        } else {
            format!("#{} ({:?})", i, entry.title)
        };
        if entry.title.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "entry {} has an empty title",
                label
            )));
        }
        if entry.answer.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "entry {} has an empty answer",
                label
            )));
        }
        if mode == IngestMode::QuestionKeyed && indexable_questions(entry).next().is_none() {
            return Err(EngineError::Validation(format!(
                "entry {} has no non-blank matched question",
                label
            )));
        }
    }
    Ok(())
}

/// Collapse hits that resolved to the same entry. Input is ascending by
/// distance, so the first hit per record is its best match and supplies the
/// `matched_question`. Order of first appearance is preserved so equal scores
/// keep their search order through the later stable sort.
fn merge_by_record(
    scored: Vec<(usize, String, f32)>,
    policy: MergePolicy,
) -> Vec<(usize, String, f32)> {
    let mut order: Vec<usize> = Vec::new();
    let mut merged: std::collections::HashMap<usize, (String, f32, usize)> =
        std::collections::HashMap::new();

    for (record_id, matched, score) in scored {
        match merged.get_mut(&record_id) {
            None => {
                order.push(record_id);
                merged.insert(record_id, (matched, score, 1));
            }
            Some((_, total, n)) => match policy {
                MergePolicy::Average => {
                    *total += score;
                    *n += 1;
                }
                MergePolicy::MaxWins => {
                    // Hits arrive ascending by distance, first is already max
                }
            },
        }
    }

    order
        .into_iter()
        .map(|record_id| {
            let (matched, total, n) = merged
                .remove(&record_id)
                .unwrap_or((String::new(), 0.0, 1));
            let score = match policy {
                MergePolicy::Average => total / n as f32,
                MergePolicy::MaxWins => total,
            };
            (record_id, matched, score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{Encoder, HashingEncoder};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handler_with(encoder: Arc<dyn Encoder>, average: bool, policy: MergePolicy) -> FaqHandler {
        let cache = Arc::new(EmbeddingCache::new(Arc::new(MemoryStore::new()), encoder));
        FaqHandler::new(cache, HnswParams::default(), average, policy)
    }

    fn entry(title: &str, answer: &str, questions: &[&str]) -> FaqEntry {
        FaqEntry::new(
            title,
            answer,
            questions.iter().map(|q| q.to_string()).collect(),
        )
    }

    /// Encoder with a fixed text-to-vector table, for exact score control.
    struct TableEncoder {
        table: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEncoder {
        fn new(rows: &[(&str, Vec<f32>)]) -> Self {
            Self {
                table: rows
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Encoder for TableEncoder {
        fn model_id(&self) -> &str {
            "table:3"
        }
        fn dim(&self) -> usize {
            3
        }
        async fn encode(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table
                .get(text.trim())
                .cloned()
                .ok_or_else(|| EngineError::Embedding(format!("no vector for {:?}", text)))
        }
    }

    #[tokio::test]
    async fn test_rejects_entry_with_empty_answer() {
        let handler = handler_with(
            Arc::new(HashingEncoder::default()),
            false,
            MergePolicy::Average,
        );
        let err = handler
            .load(
                vec![
                    entry("Sensors", "Connect via USB.", &["how to connect"]),
                    entry("Broken", "   ", &["anything"]),
                ],
                IngestMode::QuestionKeyed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(msg) if msg.contains("#1")));
        assert!(handler.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_question_keyed_entry_without_questions() {
        let handler = handler_with(
            Arc::new(HashingEncoder::default()),
            false,
            MergePolicy::Average,
        );
        let err = handler
            .load(
                vec![entry("No questions", "An answer.", &["  ", ""])],
                IngestMode::QuestionKeyed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // The same entry is fine answer-keyed
        handler
            .load(
                vec![entry("No questions", "An answer.", &["  ", ""])],
                IngestMode::AnswerKeyed,
            )
            .await
            .unwrap();
        assert_eq!(handler.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_skips_encoder() {
        let encoder = Arc::new(TableEncoder::new(&[("how to connect", vec![1.0, 0.0, 0.0])]));
        let handler = handler_with(encoder.clone(), false, MergePolicy::Average);
        handler
            .load(
                vec![entry("Sensors", "Connect via USB.", &["how to connect"])],
                IngestMode::QuestionKeyed,
            )
            .await
            .unwrap();
        let loaded_calls = encoder.calls.load(Ordering::SeqCst);

        assert!(handler.query("   ", 5).await.unwrap().is_empty());
        assert!(handler.query("how to connect", 0).await.unwrap().is_empty());
        assert_eq!(encoder.calls.load(Ordering::SeqCst), loaded_calls);
    }

    #[tokio::test]
    async fn test_merge_average_vs_max_wins() {
        // Two questions on one entry at distances 0.0 and 0.4 from the query,
        // so raw scores are 100 and 60
        let rows: Vec<(&str, Vec<f32>)> = vec![
            ("exact phrasing", vec![1.0, 0.0, 0.0]),
            ("looser phrasing", vec![0.6, 0.8, 0.0]),
            ("the query", vec![1.0, 0.0, 0.0]),
        ];

        for (policy, expected) in [(MergePolicy::Average, 80u8), (MergePolicy::MaxWins, 100u8)] {
            let handler = handler_with(Arc::new(TableEncoder::new(&rows)), true, policy);
            handler
                .load(
                    vec![entry(
                        "Sensors",
                        "Connect via USB.",
                        &["exact phrasing", "looser phrasing"],
                    )],
                    IngestMode::QuestionKeyed,
                )
                .await
                .unwrap();

            let answers = handler.query("the query", 3).await.unwrap();
            assert_eq!(answers.len(), 1, "hits of one entry must collapse");
            assert_eq!(answers[0].relevance, expected);
            assert_eq!(answers[0].matched_question, "exact phrasing");
        }
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_catalog() {
        let handler = handler_with(
            Arc::new(HashingEncoder::default()),
            false,
            MergePolicy::Average,
        );
        handler
            .load(
                vec![entry("Sensors", "Connect via USB.", &["how to connect"])],
                IngestMode::QuestionKeyed,
            )
            .await
            .unwrap();

        let err = handler
            .load(
                vec![entry("", "no title", &["q"])],
                IngestMode::QuestionKeyed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let answers = handler.query("how to connect the sensor", 1).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].title, "Sensors");
    }
}
