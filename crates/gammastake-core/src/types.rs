// crates/gammastake-core/src/types.rs
//
// Value types and protocol constants shared by every Gammastake component.
//
// Amounts are 256-bit unsigned integers in the token's smallest unit
// (18 decimals for every token the router registers). Reward indices are
// fixed point with PRECISION = 10^30, which does not fit in a u128 once
// multiplied by a realistic block reward, hence U256 throughout.

use alloy_primitives::{keccak256, uint};
use serde::{Deserialize, Serialize};

pub use alloy_primitives::{Address, U256};

/// Token quantity in the smallest denomination.
pub type Amount = U256;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// 1/100 of a percent. 10,000 bps = 100%.
pub type BasisPoints = u64;

/// Fixed-point scale of `cumulative_reward_per_token`.
pub const PRECISION: U256 = uint!(1000000000000000000000000000000_U256);

/// Denominator for all basis-point math.
pub const BASIS_POINTS_DIVISOR: u64 = 10_000;

/// Length of a (non-leap) year in seconds. Bonus emission and the default
/// vesting duration are both expressed against it.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Upper bound for a bonus distributor's multiplier (2000%).
pub const MAX_BONUS_MULTIPLIER_BPS: BasisPoints = 200_000;

/// Decimals used by every token the protocol registers.
pub const TOKEN_DECIMALS: u8 = 18;

/// Scale a whole-token quantity to its smallest unit.
///
/// # Example
/// ```
/// use gammastake_core::{expand_decimals, U256};
/// assert_eq!(expand_decimals(3, 2), U256::from(300u64));
/// ```
pub fn expand_decimals(amount: u64, decimals: u8) -> Amount {
    U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

/// Derive a stable component address from a human-readable label.
///
/// Components in this engine are not deployed anywhere, so addresses are
/// simply the low 20 bytes of `keccak256(label)`.
pub fn derive_address(label: &str) -> Address {
    Address::from_slice(&keccak256(label.as_bytes())[12..])
}

/// Caller identity and timestamp for one state-changing operation.
///
/// Every mutating call on a tracker, distributor, or vester takes one of
/// these instead of consulting ambient state, so permission checks and
/// time are both explicit inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The address performing the call.
    pub caller: Address,
    /// Block time of the call.
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// Same timestamp, different caller. Used when a component acts on
    /// behalf of itself inside a larger operation.
    pub fn as_caller(&self, caller: Address) -> Self {
        Self {
            caller,
            now: self.now,
        }
    }
}
