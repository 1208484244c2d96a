//! Vector math for centroid matching.

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm vectors, so degenerate
/// embeddings can never clear the attachment threshold.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Incremental mean update: fold one new vector into a centroid that
/// currently averages `count` members.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn running_mean(centroid: &[f32], count: i32, new: &[f32]) -> Vec<f32> {
    let n = count.max(1) as f32;
    centroid
        .iter()
        .zip(new.iter())
        .map(|(c, x)| (c * n + x) / (n + 1.0))
        .collect()
}
