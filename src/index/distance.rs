//! Distance strategies for the graph index.

/// One-method distance strategy so alternate metrics can be substituted
/// without touching the graph algorithm. Lower is closer; must be consistent
/// between construction and query.
pub trait Distance: Send + Sync {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;
}

/// Cosine distance: `1 - cosine similarity`. The default metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineDistance;

impl Distance for CosineDistance {
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        let mut dot = 0f32;
        let mut norm_a = 0f32;
        let mut norm_b = 0f32;
        for (x, y) in a.iter().zip(b.iter()) {
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom == 0.0 {
            // A zero vector is equidistant from everything
            return 1.0;
        }
        1.0 - dot / denom
    }
}
