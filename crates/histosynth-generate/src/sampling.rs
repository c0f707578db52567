use std::collections::BTreeMap;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use histosynth_core::LabelWeight;

use crate::errors::GenerationError;

/// Weighted categorical distribution over owned values.
#[derive(Debug, Clone)]
pub struct Categorical<T> {
    values: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T> Categorical<T> {
    /// Build from `(value, weight)` pairs. Zero weights are allowed as long as
    /// at least one weight is positive.
    pub fn new(entries: impl IntoIterator<Item = (T, f64)>) -> Result<Self, GenerationError> {
        let (values, weights): (Vec<T>, Vec<f64>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(&weights)
            .map_err(|err| GenerationError::Sampling(format!("invalid weights: {err}")))?;
        Ok(Self { values, index })
    }

    /// Build from observed counts, falling back to `defaults` when every count is zero.
    pub fn from_counts_or(
        counts: impl IntoIterator<Item = (T, u64)>,
        defaults: impl IntoIterator<Item = (T, f64)>,
    ) -> Result<Self, GenerationError> {
        let observed: Vec<(T, f64)> = counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(value, count)| (value, count as f64))
            .collect();
        if observed.is_empty() {
            Self::new(defaults)
        } else {
            Self::new(observed)
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        &self.values[self.index.sample(rng)]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// Label mix observed in history, or the configured one when history has none.
pub fn label_mix(
    counts: &BTreeMap<String, u64>,
    defaults: &[LabelWeight],
) -> Result<Categorical<String>, GenerationError> {
    Categorical::from_counts_or(
        counts.iter().map(|(label, count)| (label.clone(), *count)),
        defaults
            .iter()
            .map(|entry| (entry.label.clone(), entry.weight)),
    )
}

/// Draw up to `amount` distinct indices into `weights`, proportional to weight.
///
/// Indices with a zero weight are never drawn; the result is shorter than
/// `amount` when there are not enough positive weights.
pub fn sample_distinct_weighted<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &[f64],
    amount: usize,
) -> Result<Vec<usize>, GenerationError> {
    let positive = weights.iter().filter(|weight| **weight > 0.0).count();
    let amount = amount.min(positive);
    if amount == 0 {
        return Ok(Vec::new());
    }
    let picked = rand::seq::index::sample_weighted(rng, weights.len(), |idx| weights[idx], amount)
        .map_err(|err| GenerationError::Sampling(format!("weighted sample failed: {err}")))?;
    Ok(picked.into_vec())
}

/// Split `total` into parts proportional to `weights` (largest remainder).
pub fn apportion(total: u64, weights: &[f64]) -> Vec<u64> {
    let sum: f64 = weights.iter().filter(|weight| **weight > 0.0).sum();
    if weights.is_empty() {
        return Vec::new();
    }
    if sum <= 0.0 {
        return apportion(total, &vec![1.0; weights.len()]);
    }

    let exact: Vec<f64> = weights
        .iter()
        .map(|weight| total as f64 * weight.max(0.0) / sum)
        .collect();
    let mut parts: Vec<u64> = exact.iter().map(|value| value.floor() as u64).collect();
    let assigned: u64 = parts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|left, right| {
        let left_rem = exact[*left] - exact[*left].floor();
        let right_rem = exact[*right] - exact[*right].floor();
        right_rem.total_cmp(&left_rem).then(left.cmp(right))
    });
    for idx in order.into_iter().take(total.saturating_sub(assigned) as usize) {
        parts[idx] += 1;
    }
    parts
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn categorical_never_draws_zero_weight() {
        let dist = Categorical::new(vec![("a", 0.0), ("b", 1.0)]).expect("dist");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(*dist.sample(&mut rng), "b");
        }
    }

    #[test]
    fn categorical_rejects_all_zero_weights() {
        let err = Categorical::new(vec![("a", 0.0)]).unwrap_err();
        assert!(matches!(err, GenerationError::Sampling(_)));
    }

    #[test]
    fn counts_fall_back_to_defaults() {
        let dist = Categorical::from_counts_or(vec![("x", 0_u64)], vec![("y", 1.0)]).expect("dist");
        assert_eq!(dist.values(), &["y"]);
    }

    #[test]
    fn distinct_sample_is_capped_by_positive_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let picked = sample_distinct_weighted(&mut rng, &[1.0, 0.0, 2.0], 3).expect("sample");
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 2]);
    }

    #[test]
    fn apportion_preserves_total() {
        let parts = apportion(10, &[1.0, 1.0, 1.0]);
        assert_eq!(parts.iter().sum::<u64>(), 10);
        assert_eq!(parts, vec![4, 3, 3]);
        assert_eq!(apportion(5, &[0.0, 0.0]), vec![3, 2]);
    }
}
