//! Property-based tests for reward accrual through the router.
//!
//! Invariants tested:
//! - Stakers never get more than the distributor emitted, and lose at most
//!   rounding dust
//! - Stakers present over the same interval earn in proportion to stake
//! - A second claim at the same instant pays nothing
//! - A paused distributor freezes every claimable balance

use proptest::prelude::*;

use crate::common::{raw, units, user, Harness, DAY, ES_GS_PER_SECOND};
use gammastake_core::{Address, Amount, U256};
use gammastake_router::{RewardBreakdown, TrackerId};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn staked_harness(stakes: &[u64]) -> (Harness, Vec<Address>) {
    let mut h = Harness::new();
    h.fund_core();
    let accounts: Vec<Address> = (0..stakes.len())
        .map(|i| user(&format!("staker{}", i)))
        .collect();
    for (account, amount) in accounts.iter().zip(stakes) {
        h.stake_gs(*account, units(*amount));
    }
    (h, accounts)
}

fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

// ── proptest! blocks ──────────────────────────────────────────────────────────

proptest! {
    /// Total claimable esGS matches emission up to a few wei per staker.
    #[test]
    fn prop_accrual_conserves_emission(
        stakes in prop::collection::vec(1u64..=1_000_000, 1..=4),
        elapsed in 1u64..=(20 * DAY),
    ) {
        let (h, accounts) = staked_harness(&stakes);
        h.advance(elapsed);

        let mut total = Amount::ZERO;
        for account in &accounts {
            total += h.router.claimable(account).unwrap().es_gs;
        }
        let emitted = raw(ES_GS_PER_SECOND) * U256::from(elapsed);
        prop_assert!(total <= emitted);
        prop_assert!(emitted - total <= U256::from(10 * accounts.len() as u64));
    }

    /// Two stakers from the same instant earn in the ratio of their stakes.
    #[test]
    fn prop_rewards_proportional_to_stake(
        a in 1u64..=1_000_000,
        b in 1u64..=1_000_000,
        elapsed in 1u64..=(20 * DAY),
    ) {
        let (h, accounts) = staked_harness(&[a, b]);
        h.advance(elapsed);

        let claim_a = h.router.claimable(&accounts[0]).unwrap().es_gs;
        let claim_b = h.router.claimable(&accounts[1]).unwrap().es_gs;
        let (stake_a, stake_b) = (units(a), units(b));
        // floor rounding keeps the cross products within one stake of each other
        prop_assert!(abs_diff(claim_a * stake_b, claim_b * stake_a) <= stake_a + stake_b);
    }

    /// Claiming twice without time passing pays nothing the second time.
    #[test]
    fn prop_claim_is_idempotent(
        stake in 1u64..=1_000_000,
        elapsed in 1u64..=(20 * DAY),
    ) {
        let (mut h, accounts) = staked_harness(&[stake]);
        let account = accounts[0];
        h.advance(elapsed);

        let first = h.router.claim(account, true, true, true).unwrap();
        prop_assert!(first.es_gs > Amount::ZERO);
        let second = h.router.claim(account, true, true, true).unwrap();
        prop_assert_eq!(second, RewardBreakdown::default());
        prop_assert_eq!(h.router.claimable(&account).unwrap(), RewardBreakdown::default());
    }

    /// After a pause no amount of waiting changes what is claimable.
    #[test]
    fn prop_pause_freezes_claimable(
        stakes in prop::collection::vec(1u64..=1_000_000, 1..=3),
        before in 0u64..=(5 * DAY),
        after in 1u64..=(5 * DAY),
    ) {
        let (mut h, accounts) = staked_harness(&stakes);
        let gov = h.gov;
        h.advance(before);
        h.router.set_distributor_paused(gov, TrackerId::Reward, true).unwrap();
        let frozen: Vec<Amount> = accounts
            .iter()
            .map(|account| h.router.claimable(account).unwrap().es_gs)
            .collect();

        h.advance(after);
        for (account, expected) in accounts.iter().zip(&frozen) {
            prop_assert_eq!(h.router.claimable(account).unwrap().es_gs, *expected);
        }
    }
}
