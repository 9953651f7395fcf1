//! Ledger store: durable per-user balances and cooldown bookkeeping.
//!
//! Balance mutation is a single `UPDATE … RETURNING` statement, so the
//! read-modify-write happens atomically inside the database rather than in
//! application code. Decrements clamp at zero; a balance can never go
//! negative.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db::Db;
use crate::error::EngineError;
use crate::models::{Account, RankingEntry};

/// Balance granted to an account on first contact.
pub const STARTING_BALANCE: i64 = 1000;

#[derive(Clone)]
pub struct Ledger {
    db: Db,
}

impl Ledger {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Current balance, creating the account on first contact.
    pub async fn balance_of(&self, user_id: &str) -> Result<i64, EngineError> {
        let mut conn = self.db.acquire().await?;
        balance_of(&mut conn, user_id).await
    }

    /// Atomically apply `delta`, clamping the result at zero. Returns the
    /// new balance.
    pub async fn apply_delta(&self, user_id: &str, delta: i64) -> Result<i64, EngineError> {
        let mut conn = self.db.acquire().await?;
        apply_delta(&mut conn, user_id, delta).await
    }

    /// Timestamp of the last successful earning action, if any.
    pub async fn last_earn(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, EngineError> {
        let mut conn = self.db.acquire().await?;
        let account = account(&mut conn, user_id).await?;
        Ok(account.last_earn_at)
    }

    pub async fn set_last_earn(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut conn = self.db.acquire().await?;
        set_last_earn(&mut conn, user_id, at).await
    }

    /// Top balances, descending. Ties keep insertion order (rowid), so the
    /// ranking is stable for a fixed store state.
    pub async fn top_n(&self, limit: i64) -> Result<Vec<RankingEntry>, EngineError> {
        let entries = sqlx::query_as::<_, RankingEntry>(
            "SELECT user_id, balance FROM accounts ORDER BY balance DESC, rowid ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}

// Connection-scoped primitives. The gateway runs a whole action through
// these on one transaction so deduct, resolve and credit commit as a unit.

pub(crate) async fn ensure_account(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<(), EngineError> {
    sqlx::query("INSERT INTO accounts (user_id, balance) VALUES (?, ?) ON CONFLICT(user_id) DO NOTHING")
        .bind(user_id)
        .bind(STARTING_BALANCE)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn account(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Account, EngineError> {
    ensure_account(&mut *conn, user_id).await?;

    let account = sqlx::query_as::<_, Account>(
        "SELECT user_id, balance, last_earn_at FROM accounts WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(account)
}

pub(crate) async fn balance_of(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<i64, EngineError> {
    ensure_account(&mut *conn, user_id).await?;

    let (balance,): (i64,) = sqlx::query_as("SELECT balance FROM accounts WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(balance)
}

pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    user_id: &str,
    delta: i64,
) -> Result<i64, EngineError> {
    ensure_account(&mut *conn, user_id).await?;

    let (balance,): (i64,) = sqlx::query_as(
        "UPDATE accounts SET balance = MAX(0, balance + ?) WHERE user_id = ? RETURNING balance",
    )
    .bind(delta)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

pub(crate) async fn set_last_earn(
    conn: &mut SqliteConnection,
    user_id: &str,
    at: DateTime<Utc>,
) -> Result<(), EngineError> {
    sqlx::query("UPDATE accounts SET last_earn_at = ? WHERE user_id = ?")
        .bind(at)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
