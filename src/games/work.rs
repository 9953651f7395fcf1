//! Earning action reward draw.

use super::DrawSource;
use crate::policy::WorkPolicy;

/// Uniform reward from the configured range, inclusive on both ends.
pub fn roll_reward(policy: &WorkPolicy, draws: &mut impl DrawSource) -> i64 {
    draws.range(policy.min, policy.max)
}
