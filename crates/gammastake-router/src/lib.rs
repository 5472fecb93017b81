// crates/gammastake-router/src/lib.rs
//
// gammastake-router: The staking router and protocol configuration for the
// Gammastake staking engine.
//
// StakingRouter owns the token ledger and every tracker and vester, and is
// the only component users talk to. It sequences the stake/unstake cascade
// across tiers, restakes bonus points, manages per-pool LP staking, and
// rolls back any operation that fails part way.

pub mod config;
pub mod pools;
pub mod router;

pub use config::ProtocolConfig;
pub use pools::{PoolClaim, PoolStaking};
pub use router::{CoreTracker, RewardBreakdown, StakingRouter, TrackerId};
