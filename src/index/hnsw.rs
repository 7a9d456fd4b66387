//! Hierarchical navigable small world graph.
//!
//! Multi-layer proximity graph: every node lives on layer 0, exponentially
//! fewer nodes appear on each layer above, giving logarithmic search depth.
//! Insertion descends greedily to the node's top layer, then runs a beam
//! search per layer to pick diverse neighbors; queries descend the same way
//! and run the beam only at layer 0.

use crate::index::distance::{CosineDistance, Distance};
use crate::index::{HnswParams, IndexItem, IndexStats, SearchHit};
use crate::types::{EngineError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::debug;

/// Hard ceiling on layer assignment; with the default lambda the draw stays
/// far below this for any realistic catalog size.
const MAX_LAYER: usize = 16;

/// f32 ordered by total order, for use in heaps.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF32(f32);

impl Eq for OrdF32 {}

impl PartialOrd for OrdF32 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF32 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    /// Neighbor ids per layer, index 0 = base layer. Length fixes the
    /// node's top layer at creation.
    neighbors: Vec<Vec<u32>>,
}

impl Node {
    #[cfg(test)]
    fn top_layer(&self) -> usize {
        self.neighbors.len() - 1
    }
}

/// HNSW index over embedding vectors.
///
/// `insert` is a single-writer construction operation (`&mut self`); bulk
/// ingestion completes before the index is exposed for querying. `search`
/// takes `&self` and is safe for unbounded concurrent callers once
/// construction has finished.
pub struct HnswIndex {
    params: HnswParams,
    metric: Box<dyn Distance>,
    items: Vec<IndexItem>,
    nodes: Vec<Node>,
    entry: Option<u32>,
    top_layer: usize,
    rng: StdRng,
    /// Pairwise distance memo, construction only.
    dist_cache: HashMap<(u32, u32), f32>,
    dim: Option<usize>,
}

impl HnswIndex {
    /// Create an empty index with cosine distance.
    pub fn new(params: HnswParams) -> Self {
        Self::with_metric(params, Box::new(CosineDistance))
    }

    /// Create an empty index with a custom distance strategy. The same
    /// metric is used for construction and query.
    pub fn with_metric(params: HnswParams, metric: Box<dyn Distance>) -> Self {
        let rng = StdRng::seed_from_u64(params.seed);
        Self {
            params,
            metric,
            items: Vec::new(),
            nodes: Vec::new(),
            entry: None,
            top_layer: 0,
            rng,
            dist_cache: HashMap::new(),
            dim: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dimensionality fixed by the first inserted vector.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn stats(&self) -> IndexStats {
        let mut max_degree_base = 0;
        let mut max_degree_upper = 0;
        for node in &self.nodes {
            for (layer, list) in node.neighbors.iter().enumerate() {
                if layer == 0 {
                    max_degree_base = max_degree_base.max(list.len());
                } else {
                    max_degree_upper = max_degree_upper.max(list.len());
                }
            }
        }
        IndexStats {
            len: self.items.len(),
            top_layer: self.top_layer,
            max_degree_base,
            max_degree_upper,
        }
    }

    /// Add one item to the graph.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the vector's length differs from previously
    /// inserted vectors; this indicates encoder misconfiguration and is not
    /// recoverable.
    pub fn insert(&mut self, item: IndexItem) -> Result<()> {
        match self.dim {
            Some(dim) if item.vector.len() != dim => {
                return Err(EngineError::DimensionMismatch {
                    expected: dim,
                    actual: item.vector.len(),
                });
            }
            None => self.dim = Some(item.vector.len()),
            _ => {}
        }

        let id = self.nodes.len() as u32;
        let level = self.random_level();
        self.items.push(item);
        self.nodes.push(Node {
            neighbors: vec![Vec::new(); level + 1],
        });

        let Some(entry) = self.entry else {
            self.entry = Some(id);
            self.top_layer = level;
            return Ok(());
        };

        // Greedy descent through layers the new node does not occupy
        let mut ep = entry;
        if level < self.top_layer {
            for layer in ((level + 1)..=self.top_layer).rev() {
                ep = self.greedy_step_build(ep, id, layer);
            }
        }

        // Beam search + neighbor selection on each occupied layer
        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates =
                self.search_layer_build(ep, id, self.params.construction_pruning, layer);
            ep = candidates[0].0;

            let selected = self.select_neighbors(id, candidates, layer, true);
            for &nb in &selected {
                self.link(nb, id, layer);
            }
            self.nodes[id as usize].neighbors[layer] = selected;
        }

        if level > self.top_layer {
            debug!(node = id, level, "new index entry point");
            self.top_layer = level;
            self.entry = Some(id);
        }

        Ok(())
    }

    /// Approximate k-nearest-neighbor search, ascending distance.
    ///
    /// Returns at most `min(k, len)` hits with no duplicates; an empty graph
    /// or `k == 0` yields an empty vec, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let Some(entry) = self.entry else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dim) = self.dim {
            if query.len() != dim {
                return Err(EngineError::DimensionMismatch {
                    expected: dim,
                    actual: query.len(),
                });
            }
        }

        // Single-best greedy from the top down to layer 1
        let mut ep = entry;
        for layer in (1..=self.top_layer).rev() {
            ep = self.greedy_step_query(ep, query, layer);
        }

        let ef = self.params.ef_search.max(k);
        let mut found = self.search_layer_query(ep, query, ef, 0);
        found.truncate(k);

        Ok(found
            .into_iter()
            .map(|(id, distance)| {
                let item = &self.items[id as usize];
                SearchHit {
                    record_id: item.record_id,
                    source_text: item.source_text.clone(),
                    distance,
                }
            })
            .collect())
    }

    /// Draw a top layer from the geometric-like distribution
    /// `floor(-ln(uniform(0,1]) * lambda)`.
    fn random_level(&mut self) -> usize {
        let lambda = self.params.effective_level_lambda();
        let u: f64 = 1.0 - self.rng.gen::<f64>(); // (0, 1], ln is finite
        (((-u.ln()) * lambda).floor() as usize).min(MAX_LAYER)
    }

    fn layer_neighbors(&self, id: u32, layer: usize) -> Vec<u32> {
        let node = &self.nodes[id as usize];
        if layer < node.neighbors.len() {
            node.neighbors[layer].clone()
        } else {
            Vec::new()
        }
    }

    /// Distance between two stored vectors, memoized during construction.
    fn pair_dist(&mut self, a: u32, b: u32) -> f32 {
        if !self.params.enable_distance_cache {
            return self
                .metric
                .distance(&self.items[a as usize].vector, &self.items[b as usize].vector);
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&d) = self.dist_cache.get(&key) {
            return d;
        }
        let d = self
            .metric
            .distance(&self.items[a as usize].vector, &self.items[b as usize].vector);
        self.dist_cache.insert(key, d);
        d
    }

    /// Move to the closest neighbor until no neighbor improves (construction).
    fn greedy_step_build(&mut self, mut current: u32, target: u32, layer: usize) -> u32 {
        let mut best = self.pair_dist(target, current);
        loop {
            let mut changed = false;
            for nb in self.layer_neighbors(current, layer) {
                let d = self.pair_dist(target, nb);
                if d < best {
                    best = d;
                    current = nb;
                    changed = true;
                }
            }
            if !changed {
                return current;
            }
        }
    }

    /// Move to the closest neighbor until no neighbor improves (query).
    fn greedy_step_query(&self, mut current: u32, query: &[f32], layer: usize) -> u32 {
        let mut best = self
            .metric
            .distance(query, &self.items[current as usize].vector);
        loop {
            let mut changed = false;
            for &nb in &self.nodes[current as usize].neighbors[layer] {
                let d = self.metric.distance(query, &self.items[nb as usize].vector);
                if d < best {
                    best = d;
                    current = nb;
                    changed = true;
                }
            }
            if !changed {
                return current;
            }
        }
    }

    /// Best-first beam search at one layer during construction; returns
    /// candidates ascending by distance to `target`.
    fn search_layer_build(
        &mut self,
        entry: u32,
        target: u32,
        ef: usize,
        layer: usize,
    ) -> Vec<(u32, f32)> {
        let mut visited = vec![false; self.nodes.len()];
        visited[entry as usize] = true;
        visited[target as usize] = true;

        let d0 = self.pair_dist(target, entry);
        // Min-heap of frontier candidates, max-heap of best results
        let mut candidates = BinaryHeap::new();
        candidates.push(Reverse((OrdF32(d0), entry)));
        let mut results: BinaryHeap<(OrdF32, u32)> = BinaryHeap::new();
        results.push((OrdF32(d0), entry));

        while let Some(Reverse((OrdF32(c_dist), c_id))) = candidates.pop() {
            let worst = results.peek().map(|&(OrdF32(d), _)| d).unwrap_or(f32::MAX);
            if c_dist > worst && results.len() >= ef {
                break;
            }
            for nb in self.layer_neighbors(c_id, layer) {
                if visited[nb as usize] {
                    continue;
                }
                visited[nb as usize] = true;
                let d = self.pair_dist(target, nb);
                let worst = results.peek().map(|&(OrdF32(w), _)| w).unwrap_or(f32::MAX);
                if results.len() < ef || d < worst {
                    candidates.push(Reverse((OrdF32(d), nb)));
                    results.push((OrdF32(d), nb));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(u32, f32)> = results
            .into_iter()
            .map(|(OrdF32(d), id)| (id, d))
            .collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1));
        out
    }

    /// Best-first beam search at one layer at query time.
    fn search_layer_query(
        &self,
        entry: u32,
        query: &[f32],
        ef: usize,
        layer: usize,
    ) -> Vec<(u32, f32)> {
        let mut visited = vec![false; self.nodes.len()];
        visited[entry as usize] = true;

        let d0 = self
            .metric
            .distance(query, &self.items[entry as usize].vector);
        let mut candidates = BinaryHeap::new();
        candidates.push(Reverse((OrdF32(d0), entry)));
        let mut results: BinaryHeap<(OrdF32, u32)> = BinaryHeap::new();
        results.push((OrdF32(d0), entry));

        while let Some(Reverse((OrdF32(c_dist), c_id))) = candidates.pop() {
            let worst = results.peek().map(|&(OrdF32(d), _)| d).unwrap_or(f32::MAX);
            if c_dist > worst && results.len() >= ef {
                break;
            }
            for &nb in &self.nodes[c_id as usize].neighbors[layer] {
                if visited[nb as usize] {
                    continue;
                }
                visited[nb as usize] = true;
                let d = self.metric.distance(query, &self.items[nb as usize].vector);
                let worst = results.peek().map(|&(OrdF32(w), _)| w).unwrap_or(f32::MAX);
                if results.len() < ef || d < worst {
                    candidates.push(Reverse((OrdF32(d), nb)));
                    results.push((OrdF32(d), nb));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(u32, f32)> = results
            .into_iter()
            .map(|(OrdF32(d), id)| (id, d))
            .collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1));
        out
    }

    /// Pick up to `M` neighbors for `q` from `pool` with the diversification
    /// heuristic: a candidate is admitted only if it is closer to `q` than to
    /// every neighbor already selected, which spreads edges across clusters
    /// instead of piling onto the nearest one.
    fn select_neighbors(
        &mut self,
        q: u32,
        mut pool: Vec<(u32, f32)>,
        layer: usize,
        expand: bool,
    ) -> Vec<u32> {
        if expand && self.params.expand_best_selection {
            // Widen the pool by one hop around the current candidates
            let mut seen: HashSet<u32> = pool.iter().map(|&(id, _)| id).collect();
            seen.insert(q);
            let base: Vec<u32> = pool.iter().map(|&(id, _)| id).collect();
            for c in base {
                for nb in self.layer_neighbors(c, layer) {
                    if seen.insert(nb) {
                        let d = self.pair_dist(q, nb);
                        pool.push((nb, d));
                    }
                }
            }
        }

        pool.sort_by(|a, b| a.1.total_cmp(&b.1));

        let target = self.params.m;
        let capacity = self.params.layer_capacity(layer);
        let mut selected: Vec<(u32, f32)> = Vec::new();
        let mut discarded: Vec<(u32, f32)> = Vec::new();

        for (c, d_q) in pool {
            if selected.len() >= target {
                discarded.push((c, d_q));
                continue;
            }
            let diverse = selected.iter().all(|&(s, _)| self.pair_dist(c, s) > d_q);
            if diverse {
                selected.push((c, d_q));
            } else {
                discarded.push((c, d_q));
            }
        }

        if self.params.keep_pruned_connections {
            // Backfill the closest rejected candidates up to the layer cap
            for (c, d) in discarded {
                if selected.len() >= capacity {
                    break;
                }
                selected.push((c, d));
            }
        }

        selected.into_iter().map(|(c, _)| c).collect()
    }

    /// Add the bidirectional edge `from -> to`, re-pruning `from`'s list if
    /// it exceeds the layer capacity.
    fn link(&mut self, from: u32, to: u32, layer: usize) {
        {
            let list = &mut self.nodes[from as usize].neighbors[layer];
            if list.contains(&to) {
                return;
            }
            list.push(to);
        }
        if self.nodes[from as usize].neighbors[layer].len() > self.params.layer_capacity(layer) {
            self.reprune(from, layer);
        }
    }

    /// Re-select `node`'s neighbor list with the same heuristic used at
    /// insertion time.
    fn reprune(&mut self, node: u32, layer: usize) {
        let ids = self.nodes[node as usize].neighbors[layer].clone();
        let pool: Vec<(u32, f32)> = ids
            .into_iter()
            .map(|nb| (nb, self.pair_dist(node, nb)))
            .collect();
        let selected = self.select_neighbors(node, pool, layer, false);
        self.nodes[node as usize].neighbors[layer] = selected;
    }

    #[cfg(test)]
    fn node_top_layer(&self, id: u32) -> usize {
        self.nodes[id as usize].top_layer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(record_id: usize, vector: Vec<f32>) -> IndexItem {
        IndexItem {
            vector,
            record_id,
            source_text: format!("q{}", record_id),
        }
    }

    #[test]
    fn test_empty_graph_returns_empty() {
        let index = HnswIndex::new(HnswParams::default());
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_k_zero_returns_empty() {
        let mut index = HnswIndex::new(HnswParams::default());
        index.insert(item(0, vec![1.0, 0.0])).unwrap();
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_single_item() {
        let mut index = HnswIndex::new(HnswParams::default());
        index.insert(item(7, vec![0.0, 1.0])).unwrap();

        let hits = index.search(&[0.0, 1.0], 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_id, 7);
        assert!(hits[0].distance.abs() < 1e-5);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = HnswIndex::new(HnswParams::default());
        index.insert(item(0, vec![1.0, 0.0, 0.0])).unwrap();

        let err = index.insert(item(1, vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { .. }));

        let err = index.search(&[1.0], 1).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_nearest_of_three_clusters() {
        let mut index = HnswIndex::new(HnswParams::default());
        index.insert(item(0, vec![1.0, 0.0, 0.0])).unwrap();
        index.insert(item(1, vec![0.0, 1.0, 0.0])).unwrap();
        index.insert(item(2, vec![0.0, 0.0, 1.0])).unwrap();

        let hits = index.search(&[0.1, 0.9, 0.0], 1).unwrap();
        assert_eq!(hits[0].record_id, 1);
    }

    #[test]
    fn test_entry_point_tracks_highest_layer() {
        let mut index = HnswIndex::new(HnswParams::default());
        for i in 0..50 {
            let angle = i as f32 * 0.13;
            index.insert(item(i, vec![angle.cos(), angle.sin()])).unwrap();
        }
        let entry = index.entry.unwrap();
        assert_eq!(index.node_top_layer(entry), index.top_layer);
    }

    #[test]
    fn test_seeded_construction_is_reproducible() {
        let build = || {
            let mut index = HnswIndex::new(HnswParams {
                seed: 7,
                ..HnswParams::default()
            });
            for i in 0..40 {
                let angle = i as f32 * 0.31;
                index.insert(item(i, vec![angle.cos(), angle.sin()])).unwrap();
            }
            index
        };

        let a = build();
        let b = build();
        assert_eq!(a.stats().top_layer, b.stats().top_layer);

        let query = vec![0.7, 0.3];
        let hits_a: Vec<(usize, u32)> = a
            .search(&query, 5)
            .unwrap()
            .into_iter()
            .map(|h| (h.record_id, h.distance.to_bits()))
            .collect();
        let hits_b: Vec<(usize, u32)> = b
            .search(&query, 5)
            .unwrap()
            .into_iter()
            .map(|h| (h.record_id, h.distance.to_bits()))
            .collect();
        assert_eq!(hits_a, hits_b);
    }
}
