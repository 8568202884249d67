/// Total harmonic distortion
///
/// THD = sqrt(h1² + h2² + ... + hn²) / h0 × 100, where h0 is the
/// fundamental. Needs the fundamental plus at least one harmonic, and a
/// non-zero fundamental.
pub fn total_harmonic_distortion(harmonics: &[f64]) -> Option<f64> {
    let (fundamental, rest) = harmonics.split_first()?;
    if rest.is_empty() || *fundamental == 0.0 {
        return None;
    }

    let harmonic_sum: f64 = rest.iter().map(|h| h * h).sum();
    Some(harmonic_sum.sqrt() / fundamental * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thd_of_reference_series() {
        // sqrt(25 + 9 + 4 + 1) / 230 * 100
        let thd = total_harmonic_distortion(&[230.0, 5.0, 3.0, 2.0, 1.0]).unwrap();
        assert!((thd - 2.7152).abs() < 1e-3);
    }

    #[test]
    fn test_thd_needs_harmonics_and_fundamental() {
        assert_eq!(total_harmonic_distortion(&[]), None);
        assert_eq!(total_harmonic_distortion(&[230.0]), None);
        assert_eq!(total_harmonic_distortion(&[0.0, 1.0, 2.0]), None);
    }
}
