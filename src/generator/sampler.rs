//! Weighted sampling.

use rand::Rng;

use crate::{ConfigError, SampleError};

/// Draw one item from `(item, weight)` pairs with probability `weight / total`.
///
/// ```
/// use glossa::weighted_choice;
/// use rand::SeedableRng;
///
/// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
/// let picked = weighted_choice(&mut rng, &[("only", 1.0), ("never", 0.0)]).unwrap();
/// assert_eq!(*picked, "only");
/// ```
pub fn weighted_choice<'a, T, R>(rng: &mut R, items: &'a [(T, f64)]) -> Result<&'a T, SampleError>
where
    R: Rng + ?Sized,
{
    weighted_choice_by(rng, items, |(_, weight)| *weight).map(|(item, _)| item)
}

/// Like [`weighted_choice`], reading each item's weight through `weight`.
///
/// Draws a uniform roll in `[0, total)` and walks the list subtracting weights
/// until the roll goes negative.
pub fn weighted_choice_by<'a, T, R, F>(rng: &mut R, items: &'a [T], weight: F) -> Result<&'a T, SampleError>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    if items.is_empty() {
        return Err(SampleError::Empty);
    }

    let total: f64 = items.iter().map(&weight).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SampleError::NonPositiveTotal(total));
    }

    let mut roll = rng.gen_range(0.0..total);
    for item in items {
        roll -= weight(item);
        if roll < 0.0 {
            return Ok(item);
        }
    }

    // Rounding can leave the roll at exactly zero after the last subtraction.
    items.iter().rev().find(|item| weight(*item) > 0.0).ok_or(SampleError::NonPositiveTotal(total))
}

/// Distribution over the number of syllables in a word.
#[derive(Debug, Clone, PartialEq)]
pub struct SyllableCounts {
    counts: Vec<(u32, f64)>,
}

impl SyllableCounts {
    pub fn new(counts: Vec<(u32, f64)>) -> Result<Self, ConfigError> {
        if counts.is_empty() {
            return Err(ConfigError::EmptySyllableDistribution);
        }
        for &(count, weight) in &counts {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { location: format!("syllables[{count}]"), weight });
            }
        }
        if counts.iter().all(|&(_, weight)| weight == 0.0) {
            return Err(ConfigError::InvalidWeight { location: "syllables (all zero)".to_string(), weight: 0.0 });
        }
        Ok(SyllableCounts { counts })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u32, SampleError> {
        weighted_choice(rng, &self.counts).copied()
    }

    pub fn counts(&self) -> &[(u32, f64)] {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn frequencies_follow_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let items = [("x", 1.0), ("y", 3.0)];
        let draws = 40_000;
        let ys = (0..draws).filter(|_| *weighted_choice(&mut rng, &items).unwrap() == "y").count();
        let xs = draws - ys;
        let ratio = ys as f64 / xs as f64;
        assert!((2.8..3.2).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn zero_weight_items_are_never_picked() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let items = [("never", 0.0), ("always", 2.0), ("nope", 0.0)];
        for _ in 0..1_000 {
            assert_eq!(*weighted_choice(&mut rng, &items).unwrap(), "always");
        }
    }

    #[test]
    fn preconditions_are_reported() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let empty: [(&str, f64); 0] = [];
        assert_eq!(weighted_choice(&mut rng, &empty).unwrap_err(), SampleError::Empty);
        assert_eq!(weighted_choice(&mut rng, &[("a", 0.0)]).unwrap_err(), SampleError::NonPositiveTotal(0.0));
    }

    #[test]
    fn same_seed_same_draws() {
        let items = [(1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0)];
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..32).map(|_| *weighted_choice(&mut rng, &items).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn syllable_counts_validate_weights() {
        assert!(matches!(SyllableCounts::new(vec![]), Err(ConfigError::EmptySyllableDistribution)));
        assert!(matches!(SyllableCounts::new(vec![(1, -1.0)]), Err(ConfigError::InvalidWeight { .. })));
        assert!(matches!(SyllableCounts::new(vec![(1, 0.0)]), Err(ConfigError::InvalidWeight { .. })));

        let counts = SyllableCounts::new(vec![(2, 1.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(counts.sample(&mut rng).unwrap(), 2);
    }
}
