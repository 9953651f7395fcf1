//! Game policy: the one mutable document every resolution reads.
//!
//! The document is persisted as JSON in the single-row `policy_doc` table and
//! mirrored in memory behind an `RwLock`. Reads take a snapshot; updates go
//! through one validated entry point and are persisted before they become
//! visible.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::db::Db;
use crate::error::EngineError;

/// Required cardinality of the slot symbol set.
pub const SLOT_SYMBOL_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub work: WorkPolicy,
    pub slot: SlotPolicy,
    pub dice: DicePolicy,
    pub color: ColorPolicy,
    pub blackjack: BlackjackPolicy,
}

/// Earning action: reward range and cooldown interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPolicy {
    pub min: i64,
    pub max: i64,
    #[serde(default = "default_work_cooldown_secs")]
    pub cooldown_secs: i64,
}

/// Slot machine: stake, symbol set and payout table keyed by the
/// drawn-order concatenation of three symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPolicy {
    pub cost: i64,
    pub symbols: Vec<String>,
    pub payouts: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicePolicy {
    pub bet: i64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPolicy {
    pub bet: i64,
    pub white_chance: f64,
    pub white_multiplier: f64,
    pub red_black_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackjackPolicy {
    pub bet: i64,
    pub win_multiplier: f64,
}

fn default_work_cooldown_secs() -> i64 {
    3600
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            work: WorkPolicy {
                min: 100,
                max: 500,
                cooldown_secs: default_work_cooldown_secs(),
            },
            slot: SlotPolicy {
                cost: 1000,
                symbols: ["🍒", "🍋", "🍇", "⭐", "💎"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                payouts: [
                    ("🍒🍒🍒", 5.0),
                    ("🍋🍋🍋", 10.0),
                    ("🍇🍇🍇", 20.0),
                    ("⭐⭐⭐", 50.0),
                    ("💎💎💎", 100.0),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            },
            dice: DicePolicy {
                bet: 500,
                multiplier: 5.0,
            },
            color: ColorPolicy {
                bet: 1000,
                white_chance: 0.05,
                white_multiplier: 10.0,
                red_black_multiplier: 2.0,
            },
            blackjack: BlackjackPolicy {
                bet: 2000,
                win_multiplier: 2.0,
            },
        }
    }
}

impl Policy {
    /// Validate the whole document. Called on every update so a bad patch
    /// can never replace a good policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.work.min < 0 {
            return Err("work.min must be non-negative".to_string());
        }
        if self.work.min > self.work.max {
            return Err(format!(
                "work.min ({}) must not exceed work.max ({})",
                self.work.min, self.work.max
            ));
        }
        if self.work.cooldown_secs < 0 {
            return Err("work.cooldown_secs must be non-negative".to_string());
        }
        if self.slot.cost <= 0 {
            return Err("slot.cost must be positive".to_string());
        }
        if self.slot.symbols.len() != SLOT_SYMBOL_COUNT {
            return Err(format!(
                "slot.symbols must contain exactly {} symbols, got {}",
                SLOT_SYMBOL_COUNT,
                self.slot.symbols.len()
            ));
        }
        if self.slot.symbols.iter().any(|s| s.is_empty()) {
            return Err("slot.symbols must not contain empty symbols".to_string());
        }
        for (key, multiplier) in &self.slot.payouts {
            if key.is_empty() {
                return Err("slot.payouts keys must not be empty".to_string());
            }
            validate_multiplier(multiplier, "slot.payouts")?;
        }
        if self.dice.bet <= 0 {
            return Err("dice.bet must be positive".to_string());
        }
        validate_multiplier(&self.dice.multiplier, "dice.multiplier")?;
        if self.color.bet <= 0 {
            return Err("color.bet must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.color.white_chance) {
            return Err("color.white_chance must be within [0, 1]".to_string());
        }
        validate_multiplier(&self.color.white_multiplier, "color.white_multiplier")?;
        validate_multiplier(
            &self.color.red_black_multiplier,
            "color.red_black_multiplier",
        )?;
        if self.blackjack.bet <= 0 {
            return Err("blackjack.bet must be positive".to_string());
        }
        validate_multiplier(&self.blackjack.win_multiplier, "blackjack.win_multiplier")?;
        Ok(())
    }
}

fn validate_multiplier(value: &f64, field: &str) -> Result<(), String> {
    if !value.is_finite() || *value < 0.0 {
        return Err(format!("{} must be a finite non-negative number", field));
    }
    Ok(())
}

/// Partial update to one game's policy. Unset fields keep their current
/// value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum PolicyPatch {
    Work {
        min: Option<i64>,
        max: Option<i64>,
        cooldown_secs: Option<i64>,
    },
    Slot {
        cost: Option<i64>,
        symbols: Option<Vec<String>>,
        payouts: Option<HashMap<String, f64>>,
    },
    Dice {
        bet: Option<i64>,
        multiplier: Option<f64>,
    },
    Color {
        bet: Option<i64>,
        white_chance: Option<f64>,
        white_multiplier: Option<f64>,
        red_black_multiplier: Option<f64>,
    },
    Blackjack {
        bet: Option<i64>,
        win_multiplier: Option<f64>,
    },
}

impl PolicyPatch {
    pub fn game_name(&self) -> &'static str {
        match self {
            PolicyPatch::Work { .. } => "work",
            PolicyPatch::Slot { .. } => "slot",
            PolicyPatch::Dice { .. } => "dice",
            PolicyPatch::Color { .. } => "color",
            PolicyPatch::Blackjack { .. } => "blackjack",
        }
    }

    fn apply_to(&self, policy: &mut Policy) {
        match self {
            PolicyPatch::Work {
                min,
                max,
                cooldown_secs,
            } => {
                if let Some(min) = min {
                    policy.work.min = *min;
                }
                if let Some(max) = max {
                    policy.work.max = *max;
                }
                if let Some(cooldown_secs) = cooldown_secs {
                    policy.work.cooldown_secs = *cooldown_secs;
                }
            }
            PolicyPatch::Slot {
                cost,
                symbols,
                payouts,
            } => {
                if let Some(cost) = cost {
                    policy.slot.cost = *cost;
                }
                if let Some(symbols) = symbols {
                    policy.slot.symbols = symbols.clone();
                }
                if let Some(payouts) = payouts {
                    policy.slot.payouts = payouts.clone();
                }
            }
            PolicyPatch::Dice { bet, multiplier } => {
                if let Some(bet) = bet {
                    policy.dice.bet = *bet;
                }
                if let Some(multiplier) = multiplier {
                    policy.dice.multiplier = *multiplier;
                }
            }
            PolicyPatch::Color {
                bet,
                white_chance,
                white_multiplier,
                red_black_multiplier,
            } => {
                if let Some(bet) = bet {
                    policy.color.bet = *bet;
                }
                if let Some(white_chance) = white_chance {
                    policy.color.white_chance = *white_chance;
                }
                if let Some(white_multiplier) = white_multiplier {
                    policy.color.white_multiplier = *white_multiplier;
                }
                if let Some(red_black_multiplier) = red_black_multiplier {
                    policy.color.red_black_multiplier = *red_black_multiplier;
                }
            }
            PolicyPatch::Blackjack {
                bet,
                win_multiplier,
            } => {
                if let Some(bet) = bet {
                    policy.blackjack.bet = *bet;
                }
                if let Some(win_multiplier) = win_multiplier {
                    policy.blackjack.win_multiplier = *win_multiplier;
                }
            }
        }
    }
}

/// Durable policy store with an in-memory mirror for snapshot reads.
#[derive(Clone)]
pub struct PolicyStore {
    db: Db,
    current: Arc<RwLock<Policy>>,
}

impl PolicyStore {
    /// Load the persisted document, seeding defaults on first startup.
    pub async fn load(db: Db) -> Result<Self, EngineError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT doc FROM policy_doc WHERE id = 1")
            .fetch_optional(&db)
            .await?;

        let policy = match row {
            Some((doc,)) => serde_json::from_str(&doc).map_err(|e| {
                EngineError::InvalidPolicy(format!("stored policy document is unreadable: {}", e))
            })?,
            None => {
                let policy = Policy::default();
                persist(&db, &policy).await?;
                info!("Seeded default policy document");
                policy
            }
        };

        Ok(Self {
            db,
            current: Arc::new(RwLock::new(policy)),
        })
    }

    /// Snapshot of the current policy; stable for the duration of one
    /// resolution.
    pub async fn snapshot(&self) -> Policy {
        self.current.read().await.clone()
    }

    /// Apply a partial update: validate against a candidate copy, persist,
    /// then publish. Holding the write lock across the persist keeps
    /// updates mutually exclusive; on any failure the current policy is
    /// untouched.
    pub async fn apply(&self, patch: PolicyPatch) -> Result<Policy, EngineError> {
        let mut current = self.current.write().await;

        let mut candidate = current.clone();
        patch.apply_to(&mut candidate);
        candidate.validate().map_err(EngineError::InvalidPolicy)?;

        persist(&self.db, &candidate).await?;
        *current = candidate.clone();

        info!(game = patch.game_name(), "Policy updated");
        Ok(candidate)
    }
}

async fn persist(db: &Db, policy: &Policy) -> Result<(), EngineError> {
    let doc = serde_json::to_string(policy)
        .map_err(|e| EngineError::InvalidPolicy(format!("policy document failed to encode: {}", e)))?;

    sqlx::query(
        "INSERT INTO policy_doc (id, doc, updated_at) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
    )
    .bind(&doc)
    .bind(Utc::now())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_validates() {
        assert!(Policy::default().validate().is_ok());
    }

    #[test]
    fn patch_updates_only_named_fields() {
        let mut policy = Policy::default();
        let patch = PolicyPatch::Work {
            min: Some(200),
            max: None,
            cooldown_secs: None,
        };
        patch.apply_to(&mut policy);

        assert_eq!(policy.work.min, 200);
        assert_eq!(policy.work.max, 500);
        assert_eq!(policy.work.cooldown_secs, 3600);
    }

    #[test]
    fn symbol_cardinality_is_enforced() {
        let mut policy = Policy::default();
        policy.slot.symbols = vec!["🍒".to_string(), "🍋".to_string(), "🍇".to_string()];
        assert!(policy.validate().is_err());
    }

    #[test]
    fn inverted_work_range_is_rejected() {
        let mut policy = Policy::default();
        policy.work.min = 600;
        policy.work.max = 500;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn out_of_range_white_chance_is_rejected() {
        let mut policy = Policy::default();
        policy.color.white_chance = 1.5;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn negative_payout_multiplier_is_rejected() {
        let mut policy = Policy::default();
        policy.slot.payouts.insert("🍒🍒🍋".to_string(), -1.0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn missing_cooldown_defaults_on_decode() {
        let doc = r#"{"min":100,"max":500}"#;
        let work: WorkPolicy = serde_json::from_str(doc).unwrap();
        assert_eq!(work.cooldown_secs, 3600);
    }
}
