use primitive_types::U256;

use crate::ChefError;

/// `a * b / denominator` with a 256-bit intermediate product, floored.
///
/// Only the quotient has to fit in `u128`: share counts times an
/// accumulator scaled by 1e12 routinely exceed it.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, ChefError> {
    if denominator == 0 {
        return Err(ChefError::MathOverflow);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(ChefError::MathOverflow)?;
    u128::try_from(product / U256::from(denominator)).map_err(|_| ChefError::MathOverflow)
}
