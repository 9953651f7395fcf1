//! Black/red/white color game resolution.

use serde::{Deserialize, Serialize};

use super::{scaled, DrawSource};
use crate::policy::ColorPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChoice {
    Black,
    Red,
    White,
}

/// Outcome of one spin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSpin {
    pub result: ColorChoice,
    pub choice: ColorChoice,
    pub won: bool,
    pub payout: i64,
}

/// Draw the result color and settle against the player's choice. White is
/// rare (`white_chance`); the remainder splits evenly between black and red.
pub fn resolve(policy: &ColorPolicy, choice: ColorChoice, draws: &mut impl DrawSource) -> ColorSpin {
    let result = if draws.unit() < policy.white_chance {
        ColorChoice::White
    } else if draws.pick(2) == 0 {
        ColorChoice::Black
    } else {
        ColorChoice::Red
    };

    let won = result == choice;
    let payout = if won {
        let multiplier = if result == ColorChoice::White {
            policy.white_multiplier
        } else {
            policy.red_black_multiplier
        };
        scaled(policy.bet, multiplier)
    } else {
        0
    };

    ColorSpin {
        result,
        choice,
        won,
        payout,
    }
}
