use thiserror::Error;

use crate::BlockNumber;

/// Canonical error type exposed by the accounting primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChefError {
    /// No pool is registered under the given id.
    #[error("unknown pool {0}")]
    UnknownPool(usize),

    /// A pool for the same staked token already exists.
    #[error("pool for {want} already exists")]
    DuplicatePool { want: String },

    /// Withdrawal larger than the user's staked shares.
    #[error("insufficient shares: requested {requested}, staked {staked}")]
    InsufficientShares { requested: u128, staked: u128 },

    /// Claim found no grant with a remaining balance eligible for payout.
    #[error("nothing to claim at block {0}")]
    NothingToClaim(BlockNumber),

    /// Penalty fraction with a zero denominator or above one.
    #[error("invalid penalty {numerator}/{denominator}")]
    InvalidPenalty { numerator: u32, denominator: u32 },

    /// Emission schedule that cannot be evaluated.
    #[error("invalid emission schedule: {0}")]
    InvalidSchedule(&'static str),

    /// Checked arithmetic overflowed.
    #[error("math overflow")]
    MathOverflow,

    /// The transfer sink refused the batch; nothing was moved.
    #[error("transfer rejected: {0}")]
    TransferRejected(String),
}
