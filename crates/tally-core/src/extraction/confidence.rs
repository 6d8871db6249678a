//! Confidence aggregation.

/// Mean of per-signal scores, clamped to [0, 1]. Empty input scores 0.
pub fn mean_confidence(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: f64 = scores.iter().sum();
    (sum / scores.len() as f64).clamp(0.0, 1.0)
}

/// Round a confidence to two decimal places.
pub fn round_confidence(confidence: f64) -> f64 {
    (confidence * 100.0).round() / 100.0
}
