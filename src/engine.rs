//! Action gateway.
//!
//! Runs one user action from eligibility check to settlement. The whole
//! deduct-resolve-credit sequence executes inside a single transaction under
//! a per-user lock: an action either settles completely or leaves no trace,
//! and two concurrent plays by one user can never both pass an eligibility
//! check on the same stale balance.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::db::Db;
use crate::error::EngineError;
use crate::games::{self, blackjack, color, dice, slot, work, DrawSource};
use crate::ledger::{self, Ledger};
use crate::models::{
    Account, ActionRequest, ActionResult, ColorChoice, GameOutcome, RankingEntry, Rejection,
};
use crate::policy::{Policy, PolicyPatch, PolicyStore, WorkPolicy};

/// Minimum balance required to sit at any wagering table.
pub const TABLE_MINIMUM: i64 = 10_000;

/// Prune the lock registry once it grows past this many entries.
const LOCKS_PRUNE_THRESHOLD: usize = 1024;

/// A wagering play, after the earning action has been split off.
enum Wager {
    Slot,
    Dice { guess: u8 },
    Color { choice: ColorChoice },
    Blackjack,
}

/// Per-user action locks.
///
/// Entries nobody holds are pruned when the registry grows, the same way the
/// rate-limit bucket map evicts idle buckets.
#[derive(Clone)]
struct UserLocks {
    inner: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn acquire(&self, user_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.read().await.get(user_id) {
            return lock.clone();
        }

        let mut locks = self.inner.write().await;
        if locks.len() >= LOCKS_PRUNE_THRESHOLD {
            let before = locks.len();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            debug!("Pruned {} idle user locks", before - locks.len());
        }

        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// The economy engine: ledger, policy and game resolution behind one
/// action-oriented interface.
#[derive(Clone)]
pub struct Engine {
    db: Db,
    ledger: Ledger,
    policy: PolicyStore,
    locks: UserLocks,
}

impl Engine {
    pub async fn new(db: Db) -> Result<Self, EngineError> {
        let policy = PolicyStore::load(db.clone()).await?;

        Ok(Self {
            ledger: Ledger::new(db.clone()),
            policy,
            locks: UserLocks::new(),
            db,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub async fn current_policy(&self) -> Policy {
        self.policy.snapshot().await
    }

    pub async fn query_balance(&self, user_id: &str) -> Result<i64, EngineError> {
        self.ledger.balance_of(user_id).await
    }

    pub async fn get_ranking(&self, limit: i64) -> Result<Vec<RankingEntry>, EngineError> {
        self.ledger.top_n(limit).await
    }

    /// Signed balance adjustment with no eligibility checks. Authorization
    /// is the caller's responsibility.
    pub async fn admin_adjust_balance(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<i64, EngineError> {
        let new_balance = self.ledger.apply_delta(user_id, amount).await?;
        info!(user = %user_id, amount, new_balance, "Admin balance adjustment");
        Ok(new_balance)
    }

    pub async fn admin_update_policy(&self, patch: PolicyPatch) -> Result<Policy, EngineError> {
        self.policy.apply(patch).await
    }

    /// Resolve one action with entropy-seeded draws.
    pub async fn perform_action(
        &self,
        user_id: &str,
        request: ActionRequest,
    ) -> Result<ActionResult, EngineError> {
        self.perform_action_with(user_id, request, &mut games::entropy_draws())
            .await
    }

    /// Resolve one action with a caller-supplied draw source.
    pub async fn perform_action_with<D: DrawSource + Send>(
        &self,
        user_id: &str,
        request: ActionRequest,
        draws: &mut D,
    ) -> Result<ActionResult, EngineError> {
        let policy = self.policy.snapshot().await;

        let lock = self.locks.acquire(user_id).await;
        let _guard = lock.lock().await;

        let mut tx = self.db.begin().await?;
        let account = ledger::account(&mut tx, user_id).await?;

        let result = match request {
            ActionRequest::Work => earn(&mut tx, &account, &policy.work, draws).await?,
            ActionRequest::Slot => {
                wager(&mut tx, &account, &policy, Wager::Slot, draws).await?
            }
            ActionRequest::Dice { guess } => {
                wager(&mut tx, &account, &policy, Wager::Dice { guess }, draws).await?
            }
            ActionRequest::Color { choice } => {
                wager(&mut tx, &account, &policy, Wager::Color { choice }, draws).await?
            }
            ActionRequest::Blackjack => {
                wager(&mut tx, &account, &policy, Wager::Blackjack, draws).await?
            }
        };

        // A rejected action performed no balance writes; committing here only
        // persists the lazily created account row.
        tx.commit().await?;

        match &result.rejection {
            Some(rejection) => {
                debug!(user = %user_id, game = request.game_name(), %rejection, "Action rejected")
            }
            None => info!(
                user = %user_id,
                game = request.game_name(),
                stake = result.stake_deducted,
                payout = result.payout_credited,
                balance = result.new_balance,
                "Action settled"
            ),
        }

        Ok(result)
    }
}

/// Earning action: cooldown-gated, no stake, no table minimum. The cooldown
/// timestamp is written after the reward credit, in the same transaction, so
/// a cooldown can never be consumed without a granted reward.
async fn earn<D: DrawSource + Send>(
    conn: &mut SqliteConnection,
    account: &Account,
    policy: &WorkPolicy,
    draws: &mut D,
) -> Result<ActionResult, EngineError> {
    let now = Utc::now();

    if let Some(last) = account.last_earn_at {
        let elapsed = now.signed_duration_since(last).num_seconds();
        if elapsed < policy.cooldown_secs {
            return Ok(ActionResult::rejected(
                Rejection::CooldownActive {
                    remaining_secs: policy.cooldown_secs - elapsed,
                },
                account.balance,
            ));
        }
    }

    let reward = work::roll_reward(policy, draws);
    let new_balance = ledger::apply_delta(conn, &account.user_id, reward).await?;
    ledger::set_last_earn(conn, &account.user_id, now).await?;

    Ok(ActionResult::settled(
        0,
        reward,
        new_balance,
        GameOutcome::Work { amount: reward },
    ))
}

/// Wagering play. Checks run in order, first failure wins: table minimum,
/// stake cover, parameter validity. Only then is the stake deducted, the
/// game resolved and any payout credited.
async fn wager<D: DrawSource + Send>(
    conn: &mut SqliteConnection,
    account: &Account,
    policy: &Policy,
    play: Wager,
    draws: &mut D,
) -> Result<ActionResult, EngineError> {
    let stake = match &play {
        Wager::Slot => policy.slot.cost,
        Wager::Dice { .. } => policy.dice.bet,
        Wager::Color { .. } => policy.color.bet,
        Wager::Blackjack => policy.blackjack.bet,
    };

    if account.balance < TABLE_MINIMUM {
        return Ok(ActionResult::rejected(
            Rejection::InsufficientFunds {
                required: TABLE_MINIMUM,
                balance: account.balance,
            },
            account.balance,
        ));
    }

    if account.balance < stake {
        return Ok(ActionResult::rejected(
            Rejection::InsufficientFunds {
                required: stake,
                balance: account.balance,
            },
            account.balance,
        ));
    }

    if let Wager::Dice { guess } = &play {
        if !(dice::DIE_MIN..=dice::DIE_MAX).contains(guess) {
            return Ok(ActionResult::rejected(
                Rejection::InvalidParameter {
                    message: format!(
                        "dice guess must be between {} and {}, got {}",
                        dice::DIE_MIN,
                        dice::DIE_MAX,
                        guess
                    ),
                },
                account.balance,
            ));
        }
    }

    let after_stake = ledger::apply_delta(conn, &account.user_id, -stake).await?;

    let (payout, outcome) = match play {
        Wager::Slot => {
            let spin = slot::resolve(&policy.slot, draws);
            (spin.payout, GameOutcome::Slot(spin))
        }
        Wager::Dice { guess } => {
            let roll = dice::resolve(&policy.dice, guess, draws);
            (roll.payout, GameOutcome::Dice(roll))
        }
        Wager::Color { choice } => {
            let spin = color::resolve(&policy.color, choice, draws);
            (spin.payout, GameOutcome::Color(spin))
        }
        Wager::Blackjack => {
            let round = blackjack::resolve(&policy.blackjack, draws);
            (round.payout, GameOutcome::Blackjack(round))
        }
    };

    let new_balance = if payout > 0 {
        ledger::apply_delta(conn, &account.user_id, payout).await?
    } else {
        after_stake
    };

    Ok(ActionResult::settled(stake, payout, new_balance, outcome))
}
