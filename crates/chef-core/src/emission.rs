use serde::{Deserialize, Serialize};

use crate::{Amount, BlockNumber, ChefError};

/// One rate change, `offset` blocks after the schedule start.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmissionStep {
    pub offset: BlockNumber,
    pub rate: Amount,
}

/// Stepped tokens-per-block schedule.
///
/// The first rate applies from genesis; each later step takes over at
/// `start_block + offset`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmissionSchedule {
    start_block: BlockNumber,
    steps: Vec<EmissionStep>,
}

impl EmissionSchedule {
    pub fn new(
        start_block: BlockNumber,
        rates: &[Amount],
        offsets: &[BlockNumber],
    ) -> Result<Self, ChefError> {
        if rates.is_empty() {
            return Err(ChefError::InvalidSchedule("no rates"));
        }
        if rates.len() != offsets.len() {
            return Err(ChefError::InvalidSchedule("rates and offsets differ in length"));
        }
        if offsets[0] != 0 {
            return Err(ChefError::InvalidSchedule("first offset must be zero"));
        }
        if offsets.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ChefError::InvalidSchedule("offsets must be strictly increasing"));
        }
        let steps = rates
            .iter()
            .zip(offsets)
            .map(|(&rate, &offset)| EmissionStep { offset, rate })
            .collect();
        Ok(Self { start_block, steps })
    }

    /// A single rate forever.
    pub fn constant(rate: Amount) -> Self {
        Self {
            start_block: 0,
            steps: vec![EmissionStep { offset: 0, rate }],
        }
    }

    pub fn start_block(&self) -> BlockNumber {
        self.start_block
    }

    pub fn steps(&self) -> &[EmissionStep] {
        &self.steps
    }

    fn activation(&self, step: &EmissionStep) -> BlockNumber {
        self.start_block.saturating_add(step.offset)
    }

    pub fn rate_at(&self, block: BlockNumber) -> Amount {
        self.steps
            .iter()
            .skip(1)
            .take_while(|step| self.activation(step) <= block)
            .last()
            .or_else(|| self.steps.first())
            .map_or(0, |step| step.rate)
    }

    /// Tokens emitted over the half-open range `[from, to)`.
    pub fn emitted_between(&self, from: BlockNumber, to: BlockNumber) -> Result<Amount, ChefError> {
        let mut total: Amount = 0;
        if to <= from {
            return Ok(total);
        }
        for (idx, step) in self.steps.iter().enumerate() {
            let seg_start = if idx == 0 { 0 } else { self.activation(step) };
            let seg_end = self
                .steps
                .get(idx + 1)
                .map_or(BlockNumber::MAX, |next| self.activation(next));
            let lo = from.max(seg_start);
            let hi = to.min(seg_end);
            if hi <= lo {
                continue;
            }
            let chunk = step
                .rate
                .checked_mul(Amount::from(hi - lo))
                .ok_or(ChefError::MathOverflow)?;
            total = total.checked_add(chunk).ok_or(ChefError::MathOverflow)?;
        }
        Ok(total)
    }
}
