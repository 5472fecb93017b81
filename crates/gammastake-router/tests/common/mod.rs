// crates/gammastake-router/tests/common/mod.rs
//
// Shared fixtures for router integration tests: a router on a manual clock,
// the standard emission setup, and token helpers that act as gov.

#![allow(dead_code)]

use std::sync::Arc;

use gammastake_core::{derive_address, expand_decimals, Address, Amount, ManualClock, Timestamp, U256};
use gammastake_router::{ProtocolConfig, StakingRouter, TrackerId};

pub const START: Timestamp = 1_700_000_000;
pub const DAY: u64 = 24 * 60 * 60;

/// 0.02066798941 esGS per second, ~1785.7 per day.
pub const ES_GS_PER_SECOND: u128 = 20_667_989_410_000_000;
/// 0.00004133597 WETH per second, ~3.57 per day.
pub const WETH_PER_SECOND: u128 = 41_335_970_000_000;

/// Install a test subscriber once; later calls are no-ops. `RUST_LOG`
/// overrides the configured level.
pub fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub fn units(n: u64) -> Amount {
    expand_decimals(n, 18)
}

/// Amount in raw 18-decimal base units.
pub fn raw(n: u128) -> Amount {
    U256::from(n)
}

pub fn user(label: &str) -> Address {
    derive_address(label)
}

/// Strictly between `low` and `high` whole tokens.
pub fn between(value: Amount, low: u64, high: u64) -> bool {
    value > units(low) && value < units(high)
}

pub struct Harness {
    pub router: StakingRouter,
    pub clock: ManualClock,
    pub gov: Address,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        init_tracing(&config.log_level);
        let clock = ManualClock::new(START);
        let gov = config.gov;
        let router = StakingRouter::new(config, Arc::new(clock.clone())).expect("router deploys");
        Self { router, clock, gov }
    }

    /// Fund and start every core distributor: esGS at ~1785.7 per day,
    /// bonus points at 100% APR, WETH at ~3.57 per day.
    pub fn fund_core(&mut self) {
        let gov = self.gov;
        let es_gs = self.router.es_gs();
        let bn_gs = self.router.bn_gs();
        let weth = self.router.weth();
        let reward_distributor = self.router.distributor_address(TrackerId::Reward).unwrap();
        let bonus_distributor = self.router.distributor_address(TrackerId::Bonus).unwrap();
        let fee_distributor = self.router.distributor_address(TrackerId::Fee).unwrap();

        self.mint(es_gs, reward_distributor, units(50_000));
        self.router
            .set_tokens_per_interval(gov, TrackerId::Reward, raw(ES_GS_PER_SECOND))
            .unwrap();
        self.router.set_bonus_multiplier(gov, 10_000).unwrap();
        self.mint(bn_gs, bonus_distributor, units(1_500));
        self.mint(weth, fee_distributor, units(100));
        self.router
            .set_tokens_per_interval(gov, TrackerId::Fee, raw(WETH_PER_SECOND))
            .unwrap();
    }

    pub fn mint(&mut self, token: Address, to: Address, amount: Amount) {
        let gov = self.gov;
        self.router.ledger_mut().mint(&token, gov, to, amount).unwrap();
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: Amount) {
        self.router
            .ledger_mut()
            .approve(&token, owner, spender, amount)
            .unwrap();
    }

    pub fn balance(&self, token: Address, account: Address) -> Amount {
        self.router.ledger().balance_of(&token, &account)
    }

    pub fn advance(&self, seconds: u64) {
        self.clock.advance(seconds);
    }

    /// Mint GS to `account`, approve the reward tier, and stake it.
    pub fn stake_gs(&mut self, account: Address, amount: Amount) {
        let gs = self.router.gs();
        let reward_tracker = self.router.core().reward_tracker.address();
        self.mint(gs, account, amount);
        self.approve(gs, account, reward_tracker, amount);
        self.router.stake_gs(account, amount).unwrap();
    }
}
