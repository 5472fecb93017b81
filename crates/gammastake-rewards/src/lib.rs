// crates/gammastake-rewards/src/lib.rs
//
// gammastake-rewards: Emission, accrual, and vesting for the Gammastake
// staking engine.
//
// A RewardDistributor emits one reward token into exactly one tracker.
// Trackers turn deposits into shares and settle rewards against a
// cumulative reward-per-token index; the FeeTracker variant caps how much
// bonus stake may earn. Vesters convert escrowed rewards into the
// governance token over time.

pub mod distributor;
pub mod fee_tracker;
pub mod tracker;
pub mod vester;

// Re-export key types for ergonomic access from downstream crates.
pub use distributor::{Emission, RewardDistributor};
pub use fee_tracker::{BonusCap, FeeTracker};
pub use tracker::{FullWeight, RewardTracker, StakeWeighting, Tracker};
pub use vester::{Vester, VesterConfig, VestingCap};
