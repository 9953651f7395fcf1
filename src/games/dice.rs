//! Dice guessing game resolution.

use serde::{Deserialize, Serialize};

use super::{scaled, DrawSource};
use crate::policy::DicePolicy;

pub const DIE_MIN: u8 = 1;
pub const DIE_MAX: u8 = 6;

/// Outcome of one roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceRoll {
    pub roll: u8,
    pub guess: u8,
    pub won: bool,
    pub payout: i64,
}

/// Roll one die and compare against the player's guess. The guess is
/// validated by the gateway before resolution.
pub fn resolve(policy: &DicePolicy, guess: u8, draws: &mut impl DrawSource) -> DiceRoll {
    let roll = draws.range(DIE_MIN as i64, DIE_MAX as i64) as u8;
    let won = roll == guess;
    let payout = if won { scaled(policy.bet, policy.multiplier) } else { 0 };

    DiceRoll {
        roll,
        guess,
        won,
        payout,
    }
}
