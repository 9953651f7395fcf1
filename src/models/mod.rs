use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

pub use crate::games::blackjack::{BlackjackRound, RoundResult};
pub use crate::games::color::{ColorChoice, ColorSpin};
pub use crate::games::dice::DiceRoll;
pub use crate::games::slot::SlotSpin;

/// Account entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub user_id: String,
    pub balance: i64,
    pub last_earn_at: Option<DateTime<Utc>>,
}

/// One ranking row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RankingEntry {
    pub user_id: String,
    pub balance: i64,
}

/// One user-initiated action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    Work,
    Slot,
    Dice { guess: u8 },
    Color { choice: ColorChoice },
    Blackjack,
}

impl ActionRequest {
    pub fn game_name(&self) -> &'static str {
        match self {
            ActionRequest::Work => "work",
            ActionRequest::Slot => "slot",
            ActionRequest::Dice { .. } => "dice",
            ActionRequest::Color { .. } => "color",
            ActionRequest::Blackjack => "blackjack",
        }
    }
}

/// Why an action was turned away. Rejections are results, not errors: they
/// are returned to the presentation layer and never mutate the ledger.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("insufficient funds: {required} required, balance is {balance}")]
    InsufficientFunds { required: i64, balance: i64 },

    #[error("cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: i64 },

    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },
}

/// Game-specific outcome detail attached to a settled action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameOutcome {
    Work { amount: i64 },
    Slot(SlotSpin),
    Dice(DiceRoll),
    Color(ColorSpin),
    Blackjack(BlackjackRound),
}

/// Settlement of one action request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    pub stake_deducted: i64,
    pub payout_credited: i64,
    pub new_balance: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl ActionResult {
    pub fn rejected(rejection: Rejection, balance: i64) -> Self {
        Self {
            accepted: false,
            rejection: Some(rejection),
            stake_deducted: 0,
            payout_credited: 0,
            new_balance: balance,
            outcome: None,
        }
    }

    pub fn settled(stake: i64, payout: i64, new_balance: i64, outcome: GameOutcome) -> Self {
        Self {
            accepted: true,
            rejection: None,
            stake_deducted: stake,
            payout_credited: payout,
            new_balance,
            outcome: Some(outcome),
        }
    }
}

// Response types for API

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RankingResponse {
    pub entries: Vec<RankingEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustBalanceResponse {
    pub user_id: String,
    pub new_balance: i64,
}

// Request types for API

#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustBalanceRequest {
    pub amount: i64,
}
