/// Arithmetic mean of the present values, or `None` if there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the present values, rounded to two decimals.
pub fn rounded_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().collect();
    mean(&present).map(round2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(40.0), 40.0);
        assert_eq!(round2(2.344), 2.34);
    }

    #[test]
    fn test_rounded_mean_skips_missing() {
        assert_eq!(rounded_mean([Some(1.0), None, Some(2.0)]), Some(1.5));
        assert_eq!(rounded_mean([None, None]), None);
        assert_eq!(rounded_mean([Some(1.0), Some(1.0), Some(2.0)]), Some(1.33));
    }
}
