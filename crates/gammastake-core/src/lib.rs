// crates/gammastake-core/src/lib.rs
//
// gammastake-core: Value types, token ledger, and error types for the
// Gammastake staking engine.
//
// This is the leaf crate that the rewards and router crates depend on.
// It defines amounts and addresses, the fungible token ledger every
// component holds custody in, the clock abstraction, protocol events,
// and the trait interfaces tiers implement.

pub mod clock;
pub mod error;
pub mod events;
pub mod ledger;
pub mod math;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use gammastake_core::{Amount, TokenLedger};`

// Value types and constants
pub use types::{
    derive_address, expand_decimals, Address, Amount, BasisPoints, CallContext, Timestamp, U256,
    BASIS_POINTS_DIVISOR, MAX_BONUS_MULTIPLIER_BPS, PRECISION, SECONDS_PER_YEAR, TOKEN_DECIMALS,
};

// Ledger
pub use ledger::{TokenInfo, TokenLedger};

// Time
pub use clock::{Clock, ManualClock, SystemClock};

// Events
pub use events::ProtocolEvent;

// Error type
pub use error::{Result, StakeError};

// Traits
pub use traits::{StakeableLedger, TrackerView};
