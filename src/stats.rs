/// Rank-based quantile with linear interpolation between the two closest
/// ranks. Returns `None` for an empty sample.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Equal-population cut of `values` into `buckets` groups.
///
/// Bucket edges are the quantiles at `0, 1/b, .., 1`. Duplicate edges are
/// collapsed, so fewer groups may come back than were asked for. Returns the
/// number of groups formed and, for each value, the index of its group (the
/// first group also holds its lower edge). A sample with a single distinct
/// value forms no group and every index is `None`.
pub fn quantile_cut(values: &[f64], buckets: usize) -> (usize, Vec<Option<usize>>) {
    if values.is_empty() || buckets == 0 {
        return (0, vec![None; values.len()]);
    }

    let mut edges: Vec<f64> = (0..=buckets)
        .filter_map(|i| quantile(values, i as f64 / buckets as f64))
        .collect();
    edges.dedup();

    let groups = edges.len().saturating_sub(1);
    if groups == 0 {
        return (0, vec![None; values.len()]);
    }

    let assigned = values
        .iter()
        .map(|value| edges[1..].iter().position(|edge| value <= edge))
        .collect();

    (groups, assigned)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert!((quantile(&values, 0.9).unwrap() - 3.7).abs() < 1e-9);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn quantile_ignores_input_order() {
        assert_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], 0.25), Some(1.75));
    }

    #[test]
    fn cut_splits_into_equal_groups() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
        let (groups, assigned) = quantile_cut(&values, 3);
        assert_eq!(groups, 3);
        assert_eq!(
            assigned,
            vec![Some(0), Some(0), Some(1), Some(1), Some(2), Some(2)]
        );
    }

    #[test]
    fn cut_collapses_duplicate_edges() {
        let values = [1.0, 1.0, 1.0, 1.0, 5.0];
        let (groups, assigned) = quantile_cut(&values, 3);
        assert_eq!(groups, 1);
        assert!(assigned.iter().all(|a| *a == Some(0)));
    }

    #[test]
    fn cut_of_constant_sample_forms_no_group() {
        let (groups, assigned) = quantile_cut(&[7.0, 7.0], 3);
        assert_eq!(groups, 0);
        assert_eq!(assigned, vec![None, None]);
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(120, 6), Some(20.0));
        assert_eq!(ratio(3, 0), None);
        assert_eq!(mean(&[]), None);
    }
}
