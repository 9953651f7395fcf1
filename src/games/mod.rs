//! Game resolution.
//!
//! Each game is a pure function from policy + draw source to an outcome and
//! payout. Nothing in here touches persistence; the gateway applies the
//! resulting deltas.

pub mod blackjack;
pub mod color;
pub mod dice;
pub mod slot;
pub mod work;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness for game resolution.
///
/// Resolvers draw exclusively through this trait, so an outcome is
/// deterministic given the sequence of draws.
pub trait DrawSource {
    /// Uniform index in `[0, bound)`. `bound` must be non-zero.
    fn pick(&mut self, bound: usize) -> usize;

    /// Uniform float in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform integer in `[lo, hi]`, inclusive on both ends.
    fn range(&mut self, lo: i64, hi: i64) -> i64;
}

/// Draw source backed by a `rand` RNG.
pub struct RngDraws<R: Rng>(pub R);

impl<R: Rng> DrawSource for RngDraws<R> {
    fn pick(&mut self, bound: usize) -> usize {
        self.0.gen_range(0..bound)
    }

    fn unit(&mut self) -> f64 {
        self.0.gen()
    }

    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        self.0.gen_range(lo..=hi)
    }
}

/// Fresh entropy-seeded source for one resolution.
pub fn entropy_draws() -> RngDraws<StdRng> {
    RngDraws(StdRng::from_entropy())
}

/// Multiplier applied to a stake. Truncates toward zero.
pub(crate) fn scaled(stake: i64, multiplier: f64) -> i64 {
    (stake as f64 * multiplier) as i64
}
