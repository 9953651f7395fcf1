//! Slot machine resolution.

use serde::{Deserialize, Serialize};

use super::{scaled, DrawSource};
use crate::policy::SlotPolicy;

/// Outcome of one spin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpin {
    pub reels: Vec<String>,
    pub multiplier: f64,
    pub payout: i64,
}

/// Spin three reels and look the result up in the payout table.
///
/// The table key is the drawn-order concatenation of the three symbols;
/// permutations of the same symbols are distinct keys.
pub fn resolve(policy: &SlotPolicy, draws: &mut impl DrawSource) -> SlotSpin {
    let reels: Vec<String> = (0..3)
        .map(|_| policy.symbols[draws.pick(policy.symbols.len())].clone())
        .collect();

    let key = reels.concat();
    let multiplier = policy.payouts.get(&key).copied().unwrap_or(0.0);
    let payout = scaled(policy.cost, multiplier);

    SlotSpin {
        reels,
        multiplier,
        payout,
    }
}
