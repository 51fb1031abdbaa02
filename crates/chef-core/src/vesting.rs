use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Amount, Beneficiary, BlockNumber, ChefError};

/// A single harvested reward that unlocks linearly between two heights.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grant {
    pub amount: Amount,
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
    pub claimed: Amount,
}

impl Grant {
    pub fn new(amount: Amount, start_block: BlockNumber, end_block: BlockNumber) -> Self {
        Self {
            amount,
            start_block,
            end_block,
            claimed: 0,
        }
    }

    /// Quantity not yet withdrawn, vested or not.
    pub fn remaining(&self) -> Amount {
        self.amount.saturating_sub(self.claimed)
    }

    pub fn is_vested(&self, current_block: BlockNumber) -> bool {
        current_block >= self.end_block
    }

    pub fn quote(&self, current_block: BlockNumber) -> GrantQuote {
        quote_grant(self, current_block)
    }
}

/// Split of a grant at a given height.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrantQuote {
    pub locked: Amount,
    pub unlocked: Amount,
    pub claimed: Amount,
}

/// Locked, unlocked and claimed quantities of `grant` at `current_block`.
///
/// The per-block rate is floor-divided, so the amount vested before the end
/// block may trail the exact linear value by up to `duration - 1` units. At
/// and past `end_block` the whole grant is vested.
pub fn quote_grant(grant: &Grant, current_block: BlockNumber) -> GrantQuote {
    let vested = vested_amount(grant, current_block);
    GrantQuote {
        locked: grant.amount.saturating_sub(vested),
        unlocked: vested.saturating_sub(grant.claimed),
        claimed: grant.claimed,
    }
}

fn vested_amount(grant: &Grant, current_block: BlockNumber) -> Amount {
    if current_block < grant.start_block {
        return 0;
    }
    if current_block >= grant.end_block {
        return grant.amount;
    }
    let duration = grant.end_block.saturating_sub(grant.start_block).max(1);
    let per_block = grant.amount / Amount::from(duration);
    let elapsed = Amount::from(current_block - grant.start_block);
    elapsed.saturating_mul(per_block).min(grant.amount)
}

/// Fraction of an early claim that is forfeited to the penalty address.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PenaltySplit {
    pub numerator: u32,
    pub denominator: u32,
}

impl PenaltySplit {
    pub const HALF: PenaltySplit = PenaltySplit {
        numerator: 1,
        denominator: 2,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ChefError> {
        let split = Self {
            numerator,
            denominator,
        };
        split.validate()?;
        Ok(split)
    }

    pub fn validate(&self) -> Result<(), ChefError> {
        if self.denominator == 0 || self.numerator > self.denominator {
            return Err(ChefError::InvalidPenalty {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }

    /// Returns `(payout, penalty)`. The payout is floored and the penalty
    /// absorbs the remainder, so the two always add up to `remaining`.
    pub fn split(&self, remaining: Amount) -> (Amount, Amount) {
        if self.denominator == 0 {
            return (remaining, 0);
        }
        let den = Amount::from(self.denominator);
        let keep = Amount::from(self.denominator.saturating_sub(self.numerator));
        // remaining * keep / den without the intermediate product
        let payout = (remaining / den) * keep + (remaining % den) * keep / den;
        (payout, remaining - payout)
    }
}

impl Default for PenaltySplit {
    fn default() -> Self {
        Self::HALF
    }
}

/// Claim computed against the current ledger state but not applied yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimPlan {
    pub beneficiary: Beneficiary,
    pub block: BlockNumber,
    pub payout: Amount,
    pub penalty: Amount,
    slots: Vec<usize>,
}

impl ClaimPlan {
    pub fn total(&self) -> Amount {
        self.payout.saturating_add(self.penalty)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Number of grants the plan settles.
    pub fn grant_count(&self) -> usize {
        self.slots.len()
    }
}

/// Grants of one beneficiary in creation order.
///
/// Settled grants leave a tombstone behind instead of shifting the queue;
/// the slots are compacted once tombstones outnumber live grants.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeneficiaryLedger {
    slots: Vec<Option<Grant>>,
    live: usize,
}

impl BeneficiaryLedger {
    pub fn push(&mut self, grant: Grant) {
        self.slots.push(Some(grant));
        self.live += 1;
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Grant> {
        self.slots.iter().flatten()
    }

    fn entries(&self) -> impl Iterator<Item = (usize, &Grant)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|grant| (idx, grant)))
    }

    pub fn locked(&self, current_block: BlockNumber) -> Amount {
        self.iter()
            .map(|grant| grant.quote(current_block).locked)
            .fold(0, Amount::saturating_add)
    }

    pub fn unlocked(&self, current_block: BlockNumber) -> Amount {
        self.iter()
            .map(|grant| grant.quote(current_block).unlocked)
            .fold(0, Amount::saturating_add)
    }

    fn settle(&mut self, slot: usize) {
        // a settled grant is fully claimed, so it leaves the queue
        if let Some(entry) = self.slots.get_mut(slot) {
            if entry.take().is_some() {
                self.live -= 1;
            }
        }
    }

    fn compact(&mut self) {
        if self.slots.len() - self.live > self.live {
            self.slots.retain(Option::is_some);
        }
    }
}

/// Vesting queues of every beneficiary.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VestingLedger {
    beneficiaries: BTreeMap<Beneficiary, BeneficiaryLedger>,
}

impl VestingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_grant(&mut self, beneficiary: &str, grant: Grant) {
        self.beneficiaries
            .entry(beneficiary.to_string())
            .or_default()
            .push(grant);
    }

    pub fn grants<'a>(&'a self, beneficiary: &str) -> impl Iterator<Item = &'a Grant> + 'a {
        self.beneficiaries
            .get(beneficiary)
            .into_iter()
            .flat_map(BeneficiaryLedger::iter)
    }

    /// Every outstanding grant with its split at `current_block`.
    pub fn quotes(&self, beneficiary: &str, current_block: BlockNumber) -> Vec<(Grant, GrantQuote)> {
        self.grants(beneficiary)
            .map(|grant| (*grant, grant.quote(current_block)))
            .collect()
    }

    pub fn locked_tokens(&self, beneficiary: &str, current_block: BlockNumber) -> Amount {
        self.beneficiaries
            .get(beneficiary)
            .map_or(0, |ledger| ledger.locked(current_block))
    }

    pub fn unlocked_tokens(&self, beneficiary: &str, current_block: BlockNumber) -> Amount {
        self.beneficiaries
            .get(beneficiary)
            .map_or(0, |ledger| ledger.unlocked(current_block))
    }

    pub fn pending_length(&self, beneficiary: &str) -> usize {
        self.beneficiaries
            .get(beneficiary)
            .map_or(0, BeneficiaryLedger::len)
    }

    /// Plans an early claim of every outstanding grant, vested or not.
    pub fn plan_early_claim(
        &self,
        beneficiary: &str,
        current_block: BlockNumber,
        penalty: PenaltySplit,
    ) -> Result<ClaimPlan, ChefError> {
        penalty.validate()?;
        let mut slots = Vec::new();
        let mut remaining: Amount = 0;
        if let Some(ledger) = self.beneficiaries.get(beneficiary) {
            for (slot, grant) in ledger.entries() {
                remaining = remaining.saturating_add(grant.remaining());
                slots.push(slot);
            }
        }
        let (payout, penalty) = penalty.split(remaining);
        Ok(ClaimPlan {
            beneficiary: beneficiary.to_string(),
            block: current_block,
            payout,
            penalty,
            slots,
        })
    }

    /// Plans a penalty-free claim of the grants whose end block has passed.
    /// Grants still vesting are not part of the plan.
    pub fn plan_unlocked_claim(&self, beneficiary: &str, current_block: BlockNumber) -> ClaimPlan {
        let mut slots = Vec::new();
        let mut payout: Amount = 0;
        if let Some(ledger) = self.beneficiaries.get(beneficiary) {
            for (slot, grant) in ledger.entries() {
                if grant.is_vested(current_block) {
                    payout = payout.saturating_add(grant.remaining());
                    slots.push(slot);
                }
            }
        }
        ClaimPlan {
            beneficiary: beneficiary.to_string(),
            block: current_block,
            payout,
            penalty: 0,
            slots,
        }
    }

    /// Applies a plan produced by one of the `plan_*` methods with no
    /// mutation of this ledger in between.
    pub(crate) fn commit(&mut self, plan: &ClaimPlan) {
        let Some(ledger) = self.beneficiaries.get_mut(&plan.beneficiary) else {
            return;
        };
        for &slot in &plan.slots {
            ledger.settle(slot);
        }
        if ledger.is_empty() {
            self.beneficiaries.remove(&plan.beneficiary);
        } else {
            ledger.compact();
        }
    }

    /// Settles every grant of `beneficiary` and returns `(payout, penalty)`.
    pub fn claim_early(
        &mut self,
        beneficiary: &str,
        current_block: BlockNumber,
        penalty: PenaltySplit,
    ) -> Result<(Amount, Amount), ChefError> {
        let plan = self.plan_early_claim(beneficiary, current_block, penalty)?;
        self.commit(&plan);
        Ok((plan.payout, plan.penalty))
    }

    /// Settles the fully vested grants of `beneficiary` and returns the payout.
    pub fn claim_after_unlock(&mut self, beneficiary: &str, current_block: BlockNumber) -> Amount {
        let plan = self.plan_unlocked_claim(beneficiary, current_block);
        self.commit(&plan);
        plan.payout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn quotes_follow_the_linear_schedule() {
        let mut grant = Grant::new(1_000, 100, 200);
        let q = quote_grant(&grant, 150);
        assert_eq!((q.locked, q.unlocked, q.claimed), (500, 500, 0));

        grant.claimed = 500;
        let q = quote_grant(&grant, 199);
        assert_eq!((q.locked, q.unlocked, q.claimed), (10, 490, 500));
    }

    #[test]
    fn start_and_end_blocks_are_the_vesting_bounds() {
        let grant = Grant::new(1_000, 10, 13);
        assert_eq!(grant.quote(10).locked, 1_000);
        assert_eq!(grant.quote(10).unlocked, 0);
        // 1000 / 3 floors to 333 per block
        assert_eq!(grant.quote(12).unlocked, 666);
        assert_eq!(grant.quote(13).locked, 0);
        assert_eq!(grant.quote(13).unlocked, 1_000);
        assert_eq!(grant.quote(5_000).unlocked, 1_000);
    }

    #[test]
    fn queries_before_start_clamp_to_zero() {
        let mut grant = Grant::new(1_000, 100, 200);
        grant.claimed = 300;
        let q = grant.quote(42);
        assert_eq!(q.unlocked, 0);
        assert_eq!(q.locked, 1_000);
        assert_eq!(q.claimed, 300);
    }

    #[test]
    fn zero_length_grant_vests_instantly() {
        let grant = Grant::new(77, 500, 500);
        assert_eq!(grant.quote(499).unlocked, 0);
        assert_eq!(grant.quote(500).unlocked, 77);
        assert_eq!(grant.quote(500).locked, 0);
    }

    #[test]
    fn unlocked_is_monotonic_and_amounts_are_conserved() {
        let mut rng = StdRng::seed_from_u64(0x5EED_CAFE);
        for _ in 0..200 {
            let start = rng.gen_range(0..10_000u64);
            let end = start + rng.gen_range(0..5_000u64);
            let amount = rng.gen_range(0..1_000_000_000_000u128);
            let grant = Grant::new(amount, start, end);
            let mut previous = 0;
            for block in (start.saturating_sub(10)..end + 10).step_by(7) {
                let q = grant.quote(block);
                assert!(q.unlocked >= previous, "unlocked went backwards at {block}");
                assert_eq!(q.locked + q.unlocked + q.claimed, amount);
                previous = q.unlocked;
            }
        }
    }

    #[test]
    fn penalty_split_rounds_in_favour_of_the_penalty() {
        assert_eq!(PenaltySplit::HALF.split(1_000), (500, 500));
        assert_eq!(PenaltySplit::HALF.split(1_001), (500, 501));
        assert_eq!(PenaltySplit::new(0, 1).unwrap().split(9), (9, 0));
        assert_eq!(PenaltySplit::new(3, 3).unwrap().split(9), (0, 9));
        let (payout, penalty) = PenaltySplit::new(1, 3).unwrap().split(u128::MAX);
        assert_eq!(payout.checked_add(penalty), Some(u128::MAX));
    }

    #[test]
    fn invalid_penalties_are_rejected() {
        assert!(matches!(
            PenaltySplit::new(1, 0),
            Err(ChefError::InvalidPenalty { .. })
        ));
        assert!(PenaltySplit::new(3, 2).is_err());
        let ledger = VestingLedger::new();
        let bad = PenaltySplit {
            numerator: 5,
            denominator: 4,
        };
        assert!(ledger.plan_early_claim("alice", 0, bad).is_err());
    }

    #[test]
    fn early_claim_settles_everything() {
        let mut ledger = VestingLedger::new();
        ledger.add_grant("alice", Grant::new(1_000, 100, 200));
        ledger.add_grant("alice", Grant::new(501, 150, 400));
        ledger.add_grant("bob", Grant::new(10, 100, 200));

        let (payout, penalty) = ledger.claim_early("alice", 160, PenaltySplit::HALF).unwrap();
        assert_eq!(payout + penalty, 1_501);
        assert_eq!(payout, 750);
        assert_eq!(penalty, 751);
        assert_eq!(ledger.locked_tokens("alice", 160), 0);
        assert_eq!(ledger.unlocked_tokens("alice", 160), 0);
        assert_eq!(ledger.pending_length("alice"), 0);
        assert_eq!(ledger.pending_length("bob"), 1);

        ledger.add_grant("alice", Grant::new(40, 170, 180));
        assert_eq!(ledger.pending_length("alice"), 1);
        assert_eq!(ledger.locked_tokens("alice", 170), 40);
    }

    #[test]
    fn unlock_claim_only_takes_vested_grants() {
        let mut ledger = VestingLedger::new();
        ledger.add_grant("alice", Grant::new(100, 0, 10));
        ledger.add_grant("alice", Grant::new(200, 5, 50));
        ledger.add_grant("alice", Grant::new(300, 8, 12));

        assert_eq!(ledger.claim_after_unlock("alice", 12), 400);
        assert_eq!(ledger.pending_length("alice"), 1);
        let left: Vec<_> = ledger.grants("alice").copied().collect();
        assert_eq!(left, vec![Grant::new(200, 5, 50)]);
        assert_eq!(ledger.unlocked_tokens("alice", 12), 28);

        assert_eq!(ledger.claim_after_unlock("alice", 20), 0);
        assert_eq!(ledger.pending_length("alice"), 1);
    }

    #[test]
    fn tombstones_keep_creation_order() {
        let mut ledger = VestingLedger::new();
        for idx in 0..6u64 {
            // even grants end early, odd grants keep vesting
            let end = if idx % 2 == 0 { 10 } else { 1_000 + idx };
            ledger.add_grant("carol", Grant::new(Amount::from(idx) + 1, 0, end));
        }
        ledger.claim_after_unlock("carol", 10);
        let ends: Vec<_> = ledger.grants("carol").map(|g| g.end_block).collect();
        assert_eq!(ends, vec![1_001, 1_003, 1_005]);

        ledger.add_grant("carol", Grant::new(9, 11, 12));
        ledger.claim_after_unlock("carol", 12);
        let amounts: Vec<_> = ledger.grants("carol").map(|g| g.amount).collect();
        assert_eq!(amounts, vec![2, 4, 6]);
        assert_eq!(ledger.pending_length("carol"), 3);
    }

    #[test]
    fn plans_do_not_mutate_until_committed() {
        let mut ledger = VestingLedger::new();
        ledger.add_grant("dave", Grant::new(1_000, 0, 100));
        let plan = ledger
            .plan_early_claim("dave", 50, PenaltySplit::HALF)
            .unwrap();
        assert_eq!(plan.grant_count(), 1);
        assert_eq!(ledger.pending_length("dave"), 1);
        assert_eq!(ledger.locked_tokens("dave", 50), 500);

        ledger.commit(&plan);
        assert_eq!(ledger.pending_length("dave"), 0);
        assert!(ledger.quotes("dave", 50).is_empty());
    }

    #[test]
    fn ledger_round_trips_through_json() {
        let mut ledger = VestingLedger::new();
        ledger.add_grant("erin", Grant::new(5, 1, 2));
        let encoded = serde_json::to_string(&ledger).unwrap();
        let decoded: VestingLedger = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ledger);
    }
}
