use std::collections::BTreeMap;

use chef_core::transfer::{Transfer, TransferSink};
use chef_core::{Amount, ChefError};
use serde::{Deserialize, Serialize};

pub type AccountId = String;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("mint of {requested} would exceed supply cap {cap} (supply {supply})")]
    SupplyCapExceeded {
        requested: Amount,
        supply: Amount,
        cap: Amount,
    },
    #[error("supply overflow")]
    SupplyOverflow,
}

impl From<LedgerError> for ChefError {
    fn from(err: LedgerError) -> Self {
        ChefError::TransferRejected(err.to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SnapshotMetadata {
    pub height: u64,
    pub total_supply: Amount,
    pub max_supply: Option<Amount>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: SnapshotMetadata,
    pub balances: BTreeMap<AccountId, Amount>,
    pub events: Vec<LedgerEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Mint {
        to: AccountId,
        amount: Amount,
        memo: Option<String>,
    },
}

/// Balances of the reward token. The chef owns the token, so settling a
/// claim mints to the recipients.
#[derive(Default)]
pub struct TokenLedger {
    pub meta: SnapshotMetadata,
    pub balances: BTreeMap<AccountId, Amount>,
    pub events: Vec<LedgerEvent>,
}

impl TokenLedger {
    pub fn new(max_supply: Option<Amount>) -> Self {
        Self {
            meta: SnapshotMetadata {
                max_supply,
                ..SnapshotMetadata::default()
            },
            ..Self::default()
        }
    }

    pub fn balance_of(&self, account: &str) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.meta.total_supply
    }

    fn credit_account(&mut self, account: &str, amount: Amount) {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
    }

    /// Mints every transfer of the batch or none of them.
    pub fn mint_batch(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        let requested = transfers
            .iter()
            .try_fold(0 as Amount, |acc, t| acc.checked_add(t.amount))
            .ok_or(LedgerError::SupplyOverflow)?;
        let supply = self
            .meta
            .total_supply
            .checked_add(requested)
            .ok_or(LedgerError::SupplyOverflow)?;
        if let Some(cap) = self.meta.max_supply {
            if supply > cap {
                return Err(LedgerError::SupplyCapExceeded {
                    requested,
                    supply: self.meta.total_supply,
                    cap,
                });
            }
        }

        for transfer in transfers {
            self.credit_account(&transfer.to, transfer.amount);
            self.events.push(LedgerEvent::Mint {
                to: transfer.to.clone(),
                amount: transfer.amount,
                memo: transfer.memo.clone(),
            });
        }
        self.meta.total_supply = supply;
        self.meta.height += 1;
        Ok(())
    }

    pub fn mint(&mut self, to: &str, amount: Amount, memo: Option<String>) -> Result<(), LedgerError> {
        self.mint_batch(&[Transfer {
            to: to.to_string(),
            amount,
            memo,
        }])
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            balances: self.balances.clone(),
            events: self.events.clone(),
        }
    }
}

impl TransferSink for TokenLedger {
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), ChefError> {
        self.mint_batch(transfers).map_err(ChefError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mint_to(to: &str, amount: Amount) -> Transfer {
        Transfer {
            to: to.into(),
            amount,
            memo: None,
        }
    }

    #[test]
    fn snapshot_reports_balances_and_mint_log() {
        let mut ledger = TokenLedger::new(None);
        ledger.mint("alice", 1_000, Some("genesis".into())).unwrap();
        ledger.mint("bob", 2_000, None).unwrap();
        ledger.mint("alice", 1, None).unwrap();

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.meta.height, 3);
        assert_eq!(snapshot.meta.total_supply, 3_001);
        assert_eq!(snapshot.balances["alice"], 1_001);
        assert_eq!(snapshot.balances["bob"], 2_000);
        assert_eq!(
            snapshot.events[0],
            LedgerEvent::Mint {
                to: "alice".into(),
                amount: 1_000,
                memo: Some("genesis".into()),
            }
        );
        assert_eq!(snapshot.events.len(), 3);
    }

    #[test]
    fn batches_respect_the_supply_cap_atomically() {
        let mut ledger = TokenLedger::new(Some(1_000));
        ledger
            .mint_batch(&[mint_to("alice", 400), mint_to("staker", 400)])
            .unwrap();
        assert_eq!(ledger.total_supply(), 800);
        assert_eq!(ledger.meta.height, 1);

        let err = ledger
            .mint_batch(&[mint_to("alice", 100), mint_to("staker", 101)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::SupplyCapExceeded { requested: 201, .. }));
        assert_eq!(ledger.balance_of("alice"), 400);
        assert_eq!(ledger.balance_of("staker"), 400);
        assert_eq!(ledger.events.len(), 2);
    }

    #[test]
    fn sink_rejections_surface_as_transfer_errors() {
        let mut ledger = TokenLedger::new(Some(10));
        let result = ledger.transfer_batch(&[mint_to("alice", 11)]);
        assert!(matches!(result, Err(ChefError::TransferRejected(_))));
        assert_eq!(ledger.total_supply(), 0);
        assert!(ledger.snapshot().events.is_empty());
    }
}
