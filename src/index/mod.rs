//! Approximate nearest-neighbor index.
//!
//! A hierarchical navigable small world graph over embedding vectors:
//! construction is a single-writer phase, search is read-only and safe for
//! any number of concurrent callers once construction has finished.

pub mod distance;
pub mod hnsw;

pub use distance::{CosineDistance, Distance};
pub use hnsw::HnswIndex;

use serde::{Deserialize, Serialize};

/// One vector stored in the index, with the backreference needed to resolve
/// a hit to its FAQ entry. Created during ingestion, never mutated.
#[derive(Debug, Clone)]
pub struct IndexItem {
    pub vector: Vec<f32>,
    /// Position of the owning entry in the loaded catalog.
    pub record_id: usize,
    /// The specific question (or answer) string that produced the vector.
    pub source_text: String,
}

/// One approximate nearest neighbor. Ephemeral search output.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record_id: usize,
    pub source_text: String,
    pub distance: f32,
}

/// Graph tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswParams {
    /// Maximum neighbors selected per layer.
    pub m: usize,

    /// Layer-assignment rate; `None` means `1 / ln(m)`.
    pub level_lambda: Option<f64>,

    /// Candidate-list size for construction-time beam search.
    pub construction_pruning: usize,

    /// Candidate-list size for the layer-0 beam at query time, independent
    /// of `construction_pruning`.
    pub ef_search: usize,

    /// Widen the neighbor-selection candidate pool by one graph hop.
    pub expand_best_selection: bool,

    /// Backfill heuristic-rejected candidates up to the layer capacity,
    /// trading memory for recall.
    pub keep_pruned_connections: bool,

    /// Memoize pairwise distances during construction (never at query time).
    pub enable_distance_cache: bool,

    /// Seed for the construction RNG; fixed seed gives a reproducible graph.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 15,
            level_lambda: None,
            construction_pruning: 400,
            ef_search: 100,
            expand_best_selection: true,
            keep_pruned_connections: true,
            enable_distance_cache: true,
            seed: 42,
        }
    }
}

impl HnswParams {
    /// Effective layer-assignment rate.
    pub fn effective_level_lambda(&self) -> f64 {
        self.level_lambda
            .unwrap_or_else(|| 1.0 / (self.m as f64).ln())
    }

    /// Maximum neighbor-list length: `2*M` at layer 0, `M` above.
    pub fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }
}

/// Introspective counters, mostly for invariant checks in tests.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub len: usize,
    pub top_layer: usize,
    /// Largest neighbor-list length observed at layer 0.
    pub max_degree_base: usize,
    /// Largest neighbor-list length observed at any layer above 0.
    pub max_degree_upper: usize,
}
