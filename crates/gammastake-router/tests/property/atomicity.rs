//! Property-based tests for the router's all-or-nothing operations.
//!
//! Invariants tested:
//! - A failed unstake leaves the whole router state byte-for-byte unchanged
//! - Stake followed by a full unstake returns every GS token
//! - Staked amounts are equal across the three tiers for GS-only stakers

use proptest::prelude::*;

use crate::common::{units, user, Harness, DAY};
use gammastake_core::{Amount, StakeError};

// ── proptest! blocks ──────────────────────────────────────────────────────────

proptest! {
    /// Unstaking more than was staked fails and rolls back every tier.
    #[test]
    fn prop_failed_unstake_rolls_back(
        stake in 1u64..=1_000_000,
        excess in 1u64..=1_000,
        elapsed in 0u64..=(3 * DAY),
    ) {
        let mut h = Harness::new();
        h.fund_core();
        let account = user("staker");
        h.stake_gs(account, units(stake));
        h.advance(elapsed);

        let before = h.router.snapshot_json().unwrap();
        let err = h.router.unstake_gs(account, units(stake + excess)).unwrap_err();
        prop_assert!(matches!(err, StakeError::ExceedsStakedAmount(_)));
        prop_assert_eq!(h.router.snapshot_json().unwrap(), before);
    }

    /// Whatever is staked can be unstaked in full.
    #[test]
    fn prop_stake_unstake_round_trip(
        stake in 1u64..=1_000_000,
        elapsed in 0u64..=(3 * DAY),
    ) {
        let mut h = Harness::new();
        h.fund_core();
        let account = user("staker");
        let gs = h.router.gs();
        h.stake_gs(account, units(stake));
        h.advance(elapsed);

        h.router.unstake_gs(account, units(stake)).unwrap();
        prop_assert_eq!(h.balance(gs, account), units(stake));
        let core = h.router.core();
        prop_assert_eq!(core.reward_tracker.staked_amount(&account), Amount::ZERO);
        prop_assert_eq!(core.bonus_tracker.staked_amount(&account), Amount::ZERO);
        // any bonus points earned are burned with the stake
        prop_assert_eq!(core.fee_tracker.staked_amount(&account), Amount::ZERO);
    }

    /// Without bonus points every tier holds the same stake.
    #[test]
    fn prop_cascade_keeps_tiers_aligned(
        stakes in prop::collection::vec(1u64..=1_000_000, 1..=4),
    ) {
        let mut h = Harness::new();
        h.fund_core();
        let account = user("staker");
        for amount in &stakes {
            h.stake_gs(account, units(*amount));
        }
        let total = units(stakes.iter().sum());
        let core = h.router.core();
        prop_assert_eq!(core.reward_tracker.staked_amount(&account), total);
        prop_assert_eq!(core.bonus_tracker.staked_amount(&account), total);
        prop_assert_eq!(core.fee_tracker.staked_amount(&account), total);
    }
}
