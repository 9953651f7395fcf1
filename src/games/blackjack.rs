//! Simplified blackjack resolution.
//!
//! Player and dealer each draw a single score uniformly from [16, 22].
//! A score over 21 is a bust; the player busting loses outright, even when
//! the dealer busts too.

use serde::{Deserialize, Serialize};

use super::{scaled, DrawSource};
use crate::policy::BlackjackPolicy;

const SCORE_LO: i64 = 16;
const SCORE_HI: i64 = 22;
const BUST_OVER: u8 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundResult {
    Win,
    Push,
    Lose,
    PlayerBust,
}

/// Outcome of one round. On a push the payout equals the stake, refunding
/// it exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackjackRound {
    pub player: u8,
    pub dealer: u8,
    pub result: RoundResult,
    pub payout: i64,
}

pub fn resolve(policy: &BlackjackPolicy, draws: &mut impl DrawSource) -> BlackjackRound {
    let player = draws.range(SCORE_LO, SCORE_HI) as u8;
    let dealer = draws.range(SCORE_LO, SCORE_HI) as u8;

    let (result, payout) = if player > BUST_OVER {
        (RoundResult::PlayerBust, 0)
    } else if dealer > BUST_OVER || player > dealer {
        (RoundResult::Win, scaled(policy.bet, policy.win_multiplier))
    } else if player == dealer {
        (RoundResult::Push, policy.bet)
    } else {
        (RoundResult::Lose, 0)
    };

    BlackjackRound {
        player,
        dealer,
        result,
        payout,
    }
}
