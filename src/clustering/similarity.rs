//! Cosine similarity and distance.

/// Euclidean norm.
pub fn norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity in `[-1, 1]`.
///
/// # Returns
///
/// `None` if either vector has zero norm or the lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let na = norm(a);
    let nb = norm(b);
    if na == 0.0 || nb == 0.0 {
        return None;
    }

    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();

    Some((dot / (na * nb)).clamp(-1.0, 1.0))
}

/// Cosine distance `1 - similarity`, in `[0, 2]`.
///
/// `None` for the same degenerate inputs as [`cosine_similarity`].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    cosine_similarity(a, b).map(|s| 1.0 - s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_basic() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap().abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_magnitude_independent() {
        let a = [0.3, -0.4, 1.2];
        let b = [3.0, -4.0, 12.0];
        assert!(cosine_distance(&a, &b).unwrap() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    }
}
