/// Multiplier per label or type whose rows come from several entities
/// under the union policy, and per open-ended shortest path searched only up
/// to the depth ceiling.
pub const APPROXIMATION_FACTOR: f64 = 0.9;

/// Multiplier per label, type or property resolved only case-insensitively.
pub const FALLBACK_FACTOR: f64 = 0.95;

/// Confidence of a direct translation. Exact, single-entity resolution
/// everywhere gives 1.0.
pub fn confidence(approximations: usize, fallbacks: usize) -> f64 {
    let score = APPROXIMATION_FACTOR.powi(approximations as i32)
        * FALLBACK_FACTOR.powi(fallbacks as i32);
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_translation_is_certain() {
        assert_eq!(confidence(0, 0), 1.0);
    }

    #[test]
    fn test_factors_multiply() {
        assert!((confidence(1, 0) - 0.9).abs() < 1e-12);
        assert!((confidence(2, 1) - 0.9 * 0.9 * 0.95).abs() < 1e-12);
        assert!(confidence(3, 3) < confidence(3, 2));
    }
}
