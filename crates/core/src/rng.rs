use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Source of uniform randomness for question generation.
///
/// Kept object safe so callers can hand in `&mut dyn RandomSource`.
pub trait RandomSource {
    /// Uniform index in `0..upper`. Callers never pass `upper == 0`.
    fn index_below(&mut self, upper: usize) -> usize;

    /// Pick `amount` distinct indices from `0..len`, uniformly, in random order.
    ///
    /// `amount` is clamped to `len`.
    fn choose_distinct(&mut self, len: usize, amount: usize) -> Vec<usize> {
        let amount = amount.min(len);
        let mut pool: Vec<usize> = (0..len).collect();
        // Partial Fisher-Yates: the first `amount` slots end up as the sample.
        for i in 0..amount {
            let j = i + self.index_below(len - i);
            pool.swap(i, j);
        }
        pool.truncate(amount);
        pool
    }
}

/// Shuffle `items` in place with a uniform permutation.
pub fn shuffle<T, R: RandomSource + ?Sized>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.index_below(i + 1);
        items.swap(i, j);
    }
}

/// `RandomSource` backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(R);

impl RngSource<StdRng> {
    /// Reproducible source: the same seed yields the same quiz.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from the operating system, for live play.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl<R: Rng> RngSource<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn index_below(&mut self, upper: usize) -> usize {
        self.0.random_range(0..upper)
    }

    fn choose_distinct(&mut self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut self.0, len, amount.min(len)).into_vec()
    }
}
