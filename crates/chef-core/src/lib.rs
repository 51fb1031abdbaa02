//! Core accounting for the CubChef reward distributor.
//!
//! The crate holds the arithmetic that decides who gets paid what and when:
//!
//! * [`vesting`]: per-beneficiary queues of harvested rewards that unlock
//!   linearly over a block range, with the early-claim penalty split.
//! * [`emission`]: a stepped tokens-per-block emission schedule.
//! * [`chef`]: pools weighted by allocation points,
//!   per-user shares, pending rewards and harvest-to-grant.
//! * [`transfer`]: the token transfer seam used to settle claims.
//!
//! Nothing in here talks to a chain. Block heights are passed in by the
//! caller and value moves only through a [`transfer::TransferSink`].

pub mod chef;
pub mod emission;
pub mod transfer;
pub mod vesting;

mod error;
mod math;

pub use error::ChefError;

/// Quantity of the reward token in its smallest unit.
pub type Amount = u128;

/// Chain height.
pub type BlockNumber = u64;

/// Account identifier of a reward beneficiary.
pub type Beneficiary = String;
