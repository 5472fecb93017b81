// crates/gammastake-core/src/events.rs
//
// Protocol events recorded by distributors, trackers, vesters, and the router.
//
// Components buffer events in their own state; the router drains them after
// each successful operation (see StakingRouter::take_events). Events from a
// rolled-back operation are discarded along with the rest of its state.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, BasisPoints, Timestamp};

/// Observable state changes of the staking engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    /// A distributor was paused or resumed.
    StatusChange {
        /// The tracker fed by the distributor.
        reward_tracker: Address,
        /// Time of the change.
        timestamp: Timestamp,
        /// New paused flag.
        paused: bool,
    },
    /// A distributor moved rewards into its tracker.
    Distribute {
        reward_tracker: Address,
        amount: Amount,
    },
    /// Flat emission rate changed.
    TokensPerIntervalChange {
        distributor: Address,
        tokens_per_interval: Amount,
    },
    /// Bonus emission multiplier changed.
    BonusMultiplierChange {
        distributor: Address,
        basis_points: BasisPoints,
    },
    /// An account claimed tracker rewards.
    Claim {
        tracker: Address,
        account: Address,
        receiver: Address,
        amount: Amount,
    },
    /// Escrow tokens entered a vester.
    VesterDeposit {
        vester: Address,
        account: Address,
        amount: Amount,
    },
    /// Vested tokens were paid out.
    VesterClaim {
        vester: Address,
        receiver: Address,
        amount: Amount,
    },
    /// An account left a vester; `balance` is the escrow refunded.
    VesterWithdraw {
        vester: Address,
        account: Address,
        claimed_amount: Amount,
        balance: Amount,
    },
    /// Paired stake moved between an account and a vester.
    PairTransfer {
        vester: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// GS or esGS staked through the router.
    StakedGs {
        account: Address,
        token: Address,
        amount: Amount,
    },
    /// GS or esGS unstaked through the router.
    UnstakedGs {
        account: Address,
        token: Address,
        amount: Amount,
    },
    /// Pool LP tokens staked through the router.
    StakedLp {
        account: Address,
        pool: Address,
        amount: Amount,
    },
    /// Pool LP tokens unstaked through the router.
    UnstakedLp {
        account: Address,
        pool: Address,
        amount: Amount,
    },
}
