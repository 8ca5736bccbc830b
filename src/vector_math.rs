use std::cmp::Ordering;

use ndarray::ArrayView1;

/// Cosine similarity in `[-1, 1]`; zero when either vector has no magnitude
/// or the lengths differ.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let query_view = ArrayView1::from(query);
    let candidate_view = ArrayView1::from(candidate);

    let dot = query_view.dot(&candidate_view);
    let denom = l2_norm(query_view) * l2_norm(candidate_view);
    if denom <= f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// Scores every candidate against `query` and orders them by descending
/// similarity. Equal scores keep their original relative order.
pub fn rank_descending_by_cosine<'a, I>(query: &[f32], candidates: I) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scores: Vec<(usize, f32)> = candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_similarity(query, candidate)))
        .collect();

    // `sort_by` is stable, which is what keeps ties in insertion order.
    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    scores
}

fn l2_norm(vector: ArrayView1<f32>) -> f32 {
    vector.dot(&vector).sqrt()
}
