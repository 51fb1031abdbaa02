use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::emission::EmissionSchedule;
use crate::math::mul_div;
use crate::transfer::{Transfer, TransferSink};
use crate::vesting::{Grant, PenaltySplit, VestingLedger};
use crate::{Amount, Beneficiary, BlockNumber, ChefError};

/// Scale of `Pool::acc_tokens_per_share`.
pub const ACC_TOKEN_PRECISION: u128 = 1_000_000_000_000;

/// Harvested rewards vest over this many blocks (~90 days at 2s blocks).
pub const LOCKUP_PERIOD_BLOCKS: BlockNumber = 3_888_000;

pub const DEAD_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChefConfig {
    pub lockup_blocks: BlockNumber,
    pub penalty: PenaltySplit,
    pub penalty_address: Beneficiary,
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            lockup_blocks: LOCKUP_PERIOD_BLOCKS,
            penalty: PenaltySplit::HALF,
            penalty_address: DEAD_ADDRESS.to_string(),
        }
    }
}

/// A staked-token vault registered for emissions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pool {
    pub want: String,
    pub strategy: String,
    pub alloc_point: u64,
    pub last_reward_block: BlockNumber,
    pub acc_tokens_per_share: u128,
    pub total_shares: Amount,
}

impl Pool {
    /// Growth of `acc_tokens_per_share` between `last_reward_block` and `block`.
    fn accrual(
        &self,
        schedule: &EmissionSchedule,
        total_alloc_point: u64,
        block: BlockNumber,
    ) -> Result<u128, ChefError> {
        if block <= self.last_reward_block
            || self.total_shares == 0
            || self.alloc_point == 0
            || total_alloc_point == 0
        {
            return Ok(0);
        }
        let emitted = schedule.emitted_between(self.last_reward_block, block)?;
        let reward = mul_div(
            emitted,
            u128::from(self.alloc_point),
            u128::from(total_alloc_point),
        )?;
        mul_div(reward, ACC_TOKEN_PRECISION, self.total_shares)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub shares: Amount,
    pub reward_debt: Amount,
}

impl UserInfo {
    fn pending(&self, acc_tokens_per_share: u128) -> Result<Amount, ChefError> {
        Ok(settled_rewards(self.shares, acc_tokens_per_share)?.saturating_sub(self.reward_debt))
    }
}

fn settled_rewards(shares: Amount, acc_tokens_per_share: u128) -> Result<Amount, ChefError> {
    mul_div(shares, acc_tokens_per_share, ACC_TOKEN_PRECISION)
}

/// Every write of a deposit or withdraw, computed before any of them is
/// applied.
struct PositionUpdate {
    pid: usize,
    acc_tokens_per_share: u128,
    harvested: Amount,
    shares: Amount,
    total_shares: Amount,
    reward_debt: Amount,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    /// Everything outstanding, vested or not, minus the penalty.
    Early,
    /// Only grants past their end block, no penalty.
    Unlocked,
}

impl fmt::Display for ClaimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimMode::Early => f.write_str("early"),
            ClaimMode::Unlocked => f.write_str("unlocked"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub beneficiary: Beneficiary,
    pub block: BlockNumber,
    pub mode: ClaimMode,
    pub payout: Amount,
    pub penalty: Amount,
    pub grants_closed: usize,
}

/// Reward distributor: pools earn emissions by allocation point, users earn
/// by share, and harvested rewards enter the vesting ledger.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chef {
    config: ChefConfig,
    schedule: EmissionSchedule,
    pools: Vec<Pool>,
    users: Vec<BTreeMap<Beneficiary, UserInfo>>,
    total_alloc_point: u64,
    vesting: VestingLedger,
}

impl Chef {
    pub fn new(config: ChefConfig, schedule: EmissionSchedule) -> Result<Self, ChefError> {
        config.penalty.validate()?;
        Ok(Self {
            config,
            schedule,
            pools: Vec::new(),
            users: Vec::new(),
            total_alloc_point: 0,
            vesting: VestingLedger::new(),
        })
    }

    pub fn config(&self) -> &ChefConfig {
        &self.config
    }

    pub fn schedule(&self) -> &EmissionSchedule {
        &self.schedule
    }

    pub fn vesting(&self) -> &VestingLedger {
        &self.vesting
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn pool(&self, pid: usize) -> Result<&Pool, ChefError> {
        self.pools.get(pid).ok_or(ChefError::UnknownPool(pid))
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.total_alloc_point
    }

    pub fn tokens_per_block(&self, block: BlockNumber) -> Amount {
        self.schedule.rate_at(block)
    }

    pub fn user_info(&self, pid: usize, user: &str) -> Result<UserInfo, ChefError> {
        self.pool(pid)?;
        Ok(self.users[pid].get(user).copied().unwrap_or_default())
    }

    pub fn staked_want_tokens(&self, pid: usize, user: &str) -> Result<Amount, ChefError> {
        Ok(self.user_info(pid, user)?.shares)
    }

    pub fn add_pool(
        &mut self,
        alloc_point: u64,
        want: &str,
        strategy: &str,
        with_update: bool,
        block: BlockNumber,
    ) -> Result<usize, ChefError> {
        if self.pools.iter().any(|pool| pool.want == want) {
            return Err(ChefError::DuplicatePool {
                want: want.to_string(),
            });
        }
        if with_update {
            self.mass_update_pools(block)?;
        }
        self.total_alloc_point = self
            .total_alloc_point
            .checked_add(alloc_point)
            .ok_or(ChefError::MathOverflow)?;
        self.pools.push(Pool {
            want: want.to_string(),
            strategy: strategy.to_string(),
            alloc_point,
            last_reward_block: block,
            acc_tokens_per_share: 0,
            total_shares: 0,
        });
        self.users.push(BTreeMap::new());
        Ok(self.pools.len() - 1)
    }

    pub fn set_alloc_point(
        &mut self,
        pid: usize,
        alloc_point: u64,
        with_update: bool,
        block: BlockNumber,
    ) -> Result<(), ChefError> {
        let previous = self.pool(pid)?.alloc_point;
        if with_update {
            self.mass_update_pools(block)?;
        }
        self.total_alloc_point = (self.total_alloc_point - previous)
            .checked_add(alloc_point)
            .ok_or(ChefError::MathOverflow)?;
        self.pools[pid].alloc_point = alloc_point;
        Ok(())
    }

    pub fn update_pool(&mut self, pid: usize, block: BlockNumber) -> Result<(), ChefError> {
        let acc = self.settled_acc(pid, block)?;
        let pool = &mut self.pools[pid];
        if block > pool.last_reward_block {
            pool.acc_tokens_per_share = acc;
            pool.last_reward_block = block;
        }
        Ok(())
    }

    pub fn mass_update_pools(&mut self, block: BlockNumber) -> Result<(), ChefError> {
        for pid in 0..self.pools.len() {
            self.update_pool(pid, block)?;
        }
        Ok(())
    }

    /// `acc_tokens_per_share` of `pid` brought forward to `block`.
    fn settled_acc(&self, pid: usize, block: BlockNumber) -> Result<u128, ChefError> {
        let pool = self.pool(pid)?;
        pool.acc_tokens_per_share
            .checked_add(pool.accrual(&self.schedule, self.total_alloc_point, block)?)
            .ok_or(ChefError::MathOverflow)
    }

    /// Rewards `user` would harvest from `pid` at `block`.
    pub fn pending_tokens(&self, pid: usize, user: &str, block: BlockNumber) -> Result<Amount, ChefError> {
        let acc = self.settled_acc(pid, block)?;
        match self.users[pid].get(user) {
            Some(info) => info.pending(acc),
            None => Ok(0),
        }
    }

    /// Stakes `amount` and harvests pending rewards into a new grant.
    /// A zero amount only harvests. Returns the harvested quantity.
    pub fn deposit(
        &mut self,
        pid: usize,
        user: &str,
        amount: Amount,
        block: BlockNumber,
    ) -> Result<Amount, ChefError> {
        let info = self.user_info(pid, user)?;
        let shares = info.shares.checked_add(amount).ok_or(ChefError::MathOverflow)?;
        let total_shares = self.pools[pid]
            .total_shares
            .checked_add(amount)
            .ok_or(ChefError::MathOverflow)?;
        let update = self.position_update(pid, info, shares, total_shares, block)?;
        Ok(self.apply_position(user, block, update))
    }

    /// Unstakes `amount` and harvests pending rewards into a new grant.
    pub fn withdraw(
        &mut self,
        pid: usize,
        user: &str,
        amount: Amount,
        block: BlockNumber,
    ) -> Result<Amount, ChefError> {
        let info = self.user_info(pid, user)?;
        if amount > info.shares {
            return Err(ChefError::InsufficientShares {
                requested: amount,
                staked: info.shares,
            });
        }
        let total_shares = self.pools[pid].total_shares.saturating_sub(amount);
        let update = self.position_update(pid, info, info.shares - amount, total_shares, block)?;
        Ok(self.apply_position(user, block, update))
    }

    fn position_update(
        &self,
        pid: usize,
        info: UserInfo,
        shares: Amount,
        total_shares: Amount,
        block: BlockNumber,
    ) -> Result<PositionUpdate, ChefError> {
        let acc = self.settled_acc(pid, block)?;
        Ok(PositionUpdate {
            pid,
            acc_tokens_per_share: acc,
            harvested: info.pending(acc)?,
            shares,
            total_shares,
            reward_debt: settled_rewards(shares, acc)?,
        })
    }

    fn apply_position(&mut self, user: &str, block: BlockNumber, update: PositionUpdate) -> Amount {
        let pool = &mut self.pools[update.pid];
        if block > pool.last_reward_block {
            pool.acc_tokens_per_share = update.acc_tokens_per_share;
            pool.last_reward_block = block;
        }
        pool.total_shares = update.total_shares;
        let info = self.users[update.pid].entry(user.to_string()).or_default();
        info.shares = update.shares;
        info.reward_debt = update.reward_debt;
        if update.harvested > 0 {
            let end_block = block.saturating_add(self.config.lockup_blocks);
            self.vesting
                .add_grant(user, Grant::new(update.harvested, block, end_block));
        }
        update.harvested
    }

    /// Settles every pool at the current rate before switching schedules, so
    /// the new rates only apply from `block` on.
    pub fn update_emission_rate_schedule(
        &mut self,
        start_block: BlockNumber,
        rates: &[Amount],
        offsets: &[BlockNumber],
        block: BlockNumber,
    ) -> Result<(), ChefError> {
        let schedule = EmissionSchedule::new(start_block, rates, offsets)?;
        self.mass_update_pools(block)?;
        self.schedule = schedule;
        Ok(())
    }

    pub fn set_penalty_address(&mut self, address: &str) {
        self.config.penalty_address = address.to_string();
    }

    pub fn set_penalty(&mut self, penalty: PenaltySplit) -> Result<(), ChefError> {
        penalty.validate()?;
        self.config.penalty = penalty;
        Ok(())
    }

    pub fn locked_tokens(&self, user: &str, block: BlockNumber) -> Amount {
        self.vesting.locked_tokens(user, block)
    }

    pub fn unlocked_tokens(&self, user: &str, block: BlockNumber) -> Amount {
        self.vesting.unlocked_tokens(user, block)
    }

    pub fn pending_length(&self, user: &str) -> usize {
        self.vesting.pending_length(user)
    }

    /// Pays out vested rewards through `sink`.
    ///
    /// The vesting ledger is only updated after the sink accepted the whole
    /// batch; a rejected batch leaves every grant as it was.
    pub fn claim<S: TransferSink + ?Sized>(
        &mut self,
        user: &str,
        mode: ClaimMode,
        block: BlockNumber,
        sink: &mut S,
    ) -> Result<ClaimReceipt, ChefError> {
        let plan = match mode {
            ClaimMode::Early => self
                .vesting
                .plan_early_claim(user, block, self.config.penalty)?,
            ClaimMode::Unlocked => self.vesting.plan_unlocked_claim(user, block),
        };
        if plan.is_empty() {
            return Err(ChefError::NothingToClaim(block));
        }

        let mut transfers = Vec::with_capacity(2);
        if plan.payout > 0 {
            transfers.push(Transfer {
                to: user.to_string(),
                amount: plan.payout,
                memo: Some(format!("claim:{mode}")),
            });
        }
        if plan.penalty > 0 {
            transfers.push(Transfer {
                to: self.config.penalty_address.clone(),
                amount: plan.penalty,
                memo: Some(format!("penalty:{user}")),
            });
        }
        sink.transfer_batch(&transfers)?;
        self.vesting.commit(&plan);

        Ok(ClaimReceipt {
            beneficiary: user.to_string(),
            block,
            mode,
            payout: plan.payout,
            penalty: plan.penalty,
            grants_closed: plan.grant_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E18: Amount = 1_000_000_000_000_000_000;

    #[derive(Default)]
    struct RecordingSink {
        reject: bool,
        seen: Vec<Transfer>,
    }

    impl TransferSink for RecordingSink {
        fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), ChefError> {
            if self.reject {
                return Err(ChefError::TransferRejected("sink closed".into()));
            }
            self.seen.extend_from_slice(transfers);
            Ok(())
        }
    }

    fn weekly_chef(config: ChefConfig) -> Chef {
        let schedule = EmissionSchedule::new(
            100,
            &[5 * E18, 4 * E18, 3 * E18, 2 * E18],
            &[0, 100, 200, 300],
        )
        .unwrap();
        Chef::new(config, schedule).unwrap()
    }

    fn staker_config() -> ChefConfig {
        ChefConfig {
            penalty_address: "staker".into(),
            ..ChefConfig::default()
        }
    }

    #[test]
    fn add_pool_registers_vault() {
        let mut chef = weekly_chef(staker_config());
        let pid = chef.add_pool(1_000, "mock-erc20", "mock-vault", true, 1).unwrap();
        assert_eq!(pid, 0);
        let pool = chef.pool(0).unwrap();
        assert_eq!(pool.want, "mock-erc20");
        assert_eq!(pool.strategy, "mock-vault");
        assert_eq!(pool.alloc_point, 1_000);
        assert_eq!(pool.acc_tokens_per_share, 0);
        assert_eq!(chef.total_alloc_point(), 1_000);

        assert_eq!(
            chef.add_pool(10, "mock-erc20", "other", false, 2),
            Err(ChefError::DuplicatePool {
                want: "mock-erc20".into()
            })
        );
        assert_eq!(chef.pending_tokens(3, "alice", 5), Err(ChefError::UnknownPool(3)));
    }

    #[test]
    fn deposit_harvest_and_early_claim() {
        let mut chef = weekly_chef(staker_config());
        chef.add_pool(1_000, "mock-erc20", "mock-vault", true, 1).unwrap();
        chef.deposit(0, "alice", 420, 2).unwrap();
        assert_eq!(chef.staked_want_tokens(0, "alice").unwrap(), 420);

        let rate = chef.tokens_per_block(12);
        let pending = chef.pending_tokens(0, "alice", 12).unwrap();
        assert!(rate * 10 - pending <= 1, "pending {pending}");

        let harvested = chef.deposit(0, "alice", 0, 13).unwrap();
        assert!(harvested >= pending + rate - 1 && harvested <= pending + rate + 1);
        assert_eq!(chef.pending_length("alice"), 1);
        assert_eq!(chef.locked_tokens("alice", 13), harvested);
        assert_eq!(chef.unlocked_tokens("alice", 13), 0);
        assert_eq!(chef.pending_tokens(0, "alice", 13).unwrap(), 0);

        let mut sink = RecordingSink::default();
        let receipt = chef.claim("alice", ClaimMode::Early, 14, &mut sink).unwrap();
        assert_eq!(receipt.payout, harvested / 2);
        assert_eq!(receipt.payout + receipt.penalty, harvested);
        assert_eq!(receipt.grants_closed, 1);
        assert_eq!(sink.seen.len(), 2);
        assert_eq!(sink.seen[0].to, "alice");
        assert_eq!(sink.seen[1].to, "staker");
        assert_eq!(sink.seen[1].amount, receipt.penalty);
        assert_eq!(chef.locked_tokens("alice", 14), 0);
        assert_eq!(chef.unlocked_tokens("alice", 14), 0);
    }

    #[test]
    fn unlocked_claim_waits_for_the_lockup() {
        let config = ChefConfig {
            lockup_blocks: 100,
            ..staker_config()
        };
        let mut chef = Chef::new(config, EmissionSchedule::constant(10)).unwrap();
        chef.add_pool(1, "lp", "vault", false, 0).unwrap();
        chef.deposit(0, "bob", 50, 1).unwrap();
        let harvested = chef.deposit(0, "bob", 0, 11).unwrap();
        assert_eq!(harvested, 100);

        let mut sink = RecordingSink::default();
        assert_eq!(
            chef.claim("bob", ClaimMode::Unlocked, 50, &mut sink),
            Err(ChefError::NothingToClaim(50))
        );
        assert_eq!(chef.unlocked_tokens("bob", 61), 50);

        let receipt = chef.claim("bob", ClaimMode::Unlocked, 111, &mut sink).unwrap();
        assert_eq!(receipt.payout, 100);
        assert_eq!(receipt.penalty, 0);
        assert_eq!(sink.seen.len(), 1);
        assert_eq!(chef.pending_length("bob"), 0);
    }

    #[test]
    fn rejected_transfers_leave_grants_untouched() {
        let mut chef = Chef::new(staker_config(), EmissionSchedule::constant(10)).unwrap();
        chef.add_pool(1, "lp", "vault", false, 0).unwrap();
        chef.deposit(0, "carol", 1, 0).unwrap();
        chef.deposit(0, "carol", 0, 10).unwrap();
        let locked = chef.locked_tokens("carol", 20);

        let mut sink = RecordingSink {
            reject: true,
            ..RecordingSink::default()
        };
        let result = chef.claim("carol", ClaimMode::Early, 20, &mut sink);
        assert!(matches!(result, Err(ChefError::TransferRejected(_))));
        assert_eq!(chef.pending_length("carol"), 1);
        assert_eq!(chef.locked_tokens("carol", 20), locked);
        assert!(sink.seen.is_empty());
    }

    #[test]
    fn schedule_update_applies_from_the_update_block() {
        let mut chef = Chef::new(ChefConfig::default(), EmissionSchedule::constant(10)).unwrap();
        chef.add_pool(1, "lp", "vault", false, 0).unwrap();
        chef.deposit(0, "dave", 100, 0).unwrap();
        chef.update_emission_rate_schedule(10, &[20], &[0], 10).unwrap();
        assert_eq!(chef.tokens_per_block(15), 20);
        assert_eq!(chef.pending_tokens(0, "dave", 20).unwrap(), 300);
        assert!(chef
            .update_emission_rate_schedule(10, &[20, 10], &[0], 20)
            .is_err());
    }

    #[test]
    fn emissions_split_by_allocation_point() {
        let mut chef = Chef::new(ChefConfig::default(), EmissionSchedule::constant(100)).unwrap();
        chef.add_pool(1_000, "lp-a", "vault-a", false, 0).unwrap();
        chef.add_pool(3_000, "lp-b", "vault-b", false, 0).unwrap();
        chef.deposit(0, "alice", 10, 0).unwrap();
        chef.deposit(1, "bob", 10, 0).unwrap();
        assert_eq!(chef.pending_tokens(0, "alice", 10).unwrap(), 250);
        assert_eq!(chef.pending_tokens(1, "bob", 10).unwrap(), 750);

        chef.set_alloc_point(1, 1_000, true, 10).unwrap();
        assert_eq!(chef.total_alloc_point(), 2_000);
        assert_eq!(chef.pending_tokens(1, "bob", 20).unwrap(), 750 + 500);
    }

    #[test]
    fn withdraw_harvests_and_checks_shares() {
        let config = ChefConfig {
            lockup_blocks: 5,
            ..ChefConfig::default()
        };
        let mut chef = Chef::new(config, EmissionSchedule::constant(10)).unwrap();
        chef.add_pool(1, "lp", "vault", false, 0).unwrap();
        chef.deposit(0, "erin", 100, 0).unwrap();
        assert_eq!(
            chef.withdraw(0, "erin", 101, 5),
            Err(ChefError::InsufficientShares {
                requested: 101,
                staked: 100
            })
        );
        assert_eq!(chef.withdraw(0, "erin", 40, 10).unwrap(), 100);
        assert_eq!(chef.staked_want_tokens(0, "erin").unwrap(), 60);
        assert_eq!(chef.pool(0).unwrap().total_shares, 60);
        assert_eq!(chef.pending_length("erin"), 1);
        assert_eq!(chef.unlocked_tokens("erin", 15), 100);
    }

    #[test]
    fn large_deposit_after_a_tiny_early_stake() {
        let mut chef = weekly_chef(staker_config());
        chef.add_pool(1_000, "mock-erc20", "mock-vault", true, 1).unwrap();
        chef.deposit(0, "alice", 420, 2).unwrap();

        assert_eq!(chef.deposit(0, "bob", E18, 13).unwrap(), 0);
        assert!(chef.pool(0).unwrap().acc_tokens_per_share > 100_000_000_000_000_000_000_000_000_000);
        assert_eq!(chef.pool(0).unwrap().total_shares, E18 + 420);
        assert_eq!(chef.pending_tokens(0, "bob", 13).unwrap(), 0);

        let bob_pending = chef.pending_tokens(0, "bob", 23).unwrap();
        assert!(50 * E18 - bob_pending <= 2_000_000, "bob pending {bob_pending}");
        let alice_pending = chef.pending_tokens(0, "alice", 23).unwrap();
        assert!(alice_pending > 55 * E18 + 20_000 && alice_pending < 55 * E18 + 22_000);

        assert_eq!(chef.withdraw(0, "bob", E18, 23).unwrap(), bob_pending);
        assert_eq!(chef.staked_want_tokens(0, "bob").unwrap(), 0);
        assert_eq!(chef.pool(0).unwrap().total_shares, 420);
        assert_eq!(chef.pending_length("bob"), 1);
        assert_eq!(chef.locked_tokens("bob", 23), bob_pending);
    }

    #[test]
    fn failed_deposit_changes_nothing() {
        let config = ChefConfig {
            lockup_blocks: 5,
            ..ChefConfig::default()
        };
        let rate = 100_000_000 * E18;
        let mut chef = Chef::new(config, EmissionSchedule::constant(rate)).unwrap();
        chef.add_pool(1, "lp", "vault", false, 0).unwrap();
        chef.deposit(0, "erin", 1, 0).unwrap();
        let before = chef.clone();

        // reward debt of 1e13 shares at acc 1e38 does not fit in u128
        assert_eq!(
            chef.deposit(0, "dave", 10_000_000_000_000, 1),
            Err(ChefError::MathOverflow)
        );
        assert_eq!(chef, before);
        assert_eq!(chef.pool(0).unwrap().last_reward_block, 0);
        assert_eq!(chef.pending_length("dave"), 0);

        assert_eq!(chef.deposit(0, "erin", 0, 1).unwrap(), rate);
        assert_eq!(chef.pending_length("erin"), 1);
    }

    #[test]
    fn config_fields_and_defaults() {
        let config: ChefConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.lockup_blocks, LOCKUP_PERIOD_BLOCKS);
        assert_eq!(config.penalty, PenaltySplit::HALF);
        assert_eq!(config.penalty_address, DEAD_ADDRESS);

        let value = serde_json::to_value(&config).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["lockup_blocks", "penalty", "penalty_address"]);
    }
}
