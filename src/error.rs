//! Engine error taxonomy
//!
//! Only failures that must stop an operation surface here. Eligibility
//! failures (insufficient funds, active cooldown, bad parameters) are not
//! errors; they come back as structured rejections inside `ActionResult`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Administrative policy update failed validation; the prior policy is
    /// left unchanged.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Storage I/O failure. Fatal to the current operation; the enclosing
    /// transaction rolls back so no partial ledger mutation is committed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}
