//! Cosine similarity between document vectors.

/// Cosine similarity in `[-1, 1]`, computed in f64.
///
/// Returns `0.0` when either vector is empty or has zero norm, or when the
/// dimensions differ. A zero vector is what an empty document embeds to, so
/// an unreadable resume scores `0.0` instead of NaN.
pub fn similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}
