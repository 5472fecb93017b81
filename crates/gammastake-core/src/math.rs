// crates/gammastake-core/src/math.rs
//
// Checked fixed-point helpers. Any overflow or underflow surfaces as
// StakeError::ArithmeticOverflow; nothing here saturates.

use crate::error::{Result, StakeError};
use crate::types::U256;

/// `a * b / denominator`, rounding down.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(StakeError::ArithmeticOverflow(
            "division by zero in mul_div".to_string(),
        ));
    }
    let product = a.checked_mul(b).ok_or_else(|| {
        StakeError::ArithmeticOverflow(format!("{} * {} overflows", a, b))
    })?;
    Ok(product / denominator)
}

/// Checked addition, `what` names the quantity for the error message.
pub fn add(a: U256, b: U256, what: &str) -> Result<U256> {
    a.checked_add(b)
        .ok_or_else(|| StakeError::ArithmeticOverflow(format!("{} overflows", what)))
}

/// Checked subtraction, `what` names the quantity for the error message.
pub fn sub(a: U256, b: U256, what: &str) -> Result<U256> {
    a.checked_sub(b).ok_or_else(|| {
        StakeError::ArithmeticOverflow(format!("{} underflows: {} - {}", what, a, b))
    })
}
