//! Property-based tests for ledger conservation across the core tiers.
//!
//! Invariants tested:
//! - On every tier, per-account deposit balances of each token sum to the
//!   tracker's total deposit supply of that token
//! - On every tier, per-account staked amounts sum to the share token's
//!   total supply

use std::collections::HashMap;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use crate::common::{units, user, Harness, DAY};
use gammastake_core::{Address, Amount, TokenLedger, U256};
use gammastake_rewards::{StakeWeighting, Tracker};

// ── Helpers ───────────────────────────────────────────────────────────────────

const ACCOUNTS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    StakeGs { who: usize, amount: u64 },
    StakeEsGs { who: usize, amount: u64 },
    /// Unstake a percentage of the account's staked GS.
    UnstakeGs { who: usize, percent: u64 },
    Compound { who: usize },
    Advance { seconds: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACCOUNTS, 1u64..=10_000).prop_map(|(who, amount)| Op::StakeGs { who, amount }),
        (0..ACCOUNTS, 1u64..=10_000).prop_map(|(who, amount)| Op::StakeEsGs { who, amount }),
        (0..ACCOUNTS, 1u64..=100).prop_map(|(who, percent)| Op::UnstakeGs { who, percent }),
        (0..ACCOUNTS).prop_map(|who| Op::Compound { who }),
        (1u64..=(2 * DAY)).prop_map(|seconds| Op::Advance { seconds }),
    ]
}

fn apply(h: &mut Harness, accounts: &[Address], op: &Op) {
    match *op {
        Op::StakeGs { who, amount } => h.stake_gs(accounts[who], units(amount)),
        Op::StakeEsGs { who, amount } => {
            let es_gs = h.router.es_gs();
            h.mint(es_gs, accounts[who], units(amount));
            h.router.stake_es_gs(accounts[who], units(amount)).unwrap();
        }
        Op::UnstakeGs { who, percent } => {
            let gs = h.router.gs();
            let staked = h
                .router
                .core()
                .reward_tracker
                .deposit_balance(&accounts[who], &gs);
            let amount = staked * U256::from(percent) / U256::from(100u64);
            if !amount.is_zero() {
                h.router.unstake_gs(accounts[who], amount).unwrap();
            }
        }
        // an account with nothing to compound may be rejected; that rolls back
        Op::Compound { who } => {
            let _ = h.router.compound(accounts[who]);
        }
        Op::Advance { seconds } => h.advance(seconds),
    }
}

fn assert_conserved<W: StakeWeighting>(
    tracker: &Tracker<W>,
    ledger: &TokenLedger,
) -> Result<(), TestCaseError> {
    let staked: Amount = tracker
        .stakers()
        .fold(Amount::ZERO, |total, (_, amount)| total + *amount);
    prop_assert_eq!(staked, tracker.total_supply(ledger));

    let mut per_token: HashMap<Address, Amount> = HashMap::new();
    for (_, token, balance) in tracker.deposits() {
        *per_token.entry(*token).or_default() += *balance;
    }
    for (token, total) in &per_token {
        prop_assert_eq!(*total, tracker.total_deposit_supply(token));
    }
    Ok(())
}

// ── proptest! blocks ──────────────────────────────────────────────────────────

proptest! {
    /// Random staking activity never lets account entries drift from totals.
    #[test]
    fn prop_tier_totals_match_account_entries(
        ops in prop::collection::vec(op_strategy(), 1..=24),
    ) {
        let mut h = Harness::new();
        h.fund_core();
        let accounts: Vec<Address> = (0..ACCOUNTS)
            .map(|i| user(&format!("staker{}", i)))
            .collect();

        for op in &ops {
            apply(&mut h, &accounts, op);
            let core = h.router.core();
            let ledger = h.router.ledger();
            assert_conserved(&core.reward_tracker, ledger)?;
            assert_conserved(&core.bonus_tracker, ledger)?;
            assert_conserved(&core.fee_tracker, ledger)?;
        }
    }
}
