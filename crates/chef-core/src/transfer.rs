use serde::{Deserialize, Serialize};

use crate::{Amount, Beneficiary, ChefError};

/// Reward tokens moved to `to` as part of a settlement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transfer {
    pub to: Beneficiary,
    pub amount: Amount,
    pub memo: Option<String>,
}

/// Destination of claim settlements.
///
/// A batch is all-or-nothing: on `Err` no transfer of the batch may have
/// taken effect.
pub trait TransferSink {
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), ChefError>;
}

impl<S: TransferSink + ?Sized> TransferSink for &mut S {
    fn transfer_batch(&mut self, transfers: &[Transfer]) -> Result<(), ChefError> {
        (**self).transfer_batch(transfers)
    }
}
