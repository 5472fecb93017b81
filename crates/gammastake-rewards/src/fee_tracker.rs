// crates/gammastake-rewards/src/fee_tracker.rs
//
// Fee tracker: the third tier, where bonus points stop earning once they
// outgrow the account's real stake.
//
// An account's bonus deposit earns only up to `active * bn_rate_cap / 10_000`,
// where `active` is everything it deposited other than the bonus token. The
// excess is held as "inactive points", subtracted from both the account's
// weight and the tracker's reward supply. Inactive points are re-derived
// whenever the account's deposits change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gammastake_core::{
    math, Address, Amount, BasisPoints, CallContext, Result, StakeError, TokenInfo, TokenLedger,
    U256, BASIS_POINTS_DIVISOR,
};

use crate::tracker::{StakeWeighting, Tracker};

/// Weighting that caps how many bonus points may earn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusCap {
    bonus_token: Address,
    bn_rate_cap: BasisPoints,
    inactive_points: HashMap<Address, Amount>,
    total_inactive_points: Amount,
}

impl BonusCap {
    /// Cap bonus points at 100% of the account's other deposits.
    pub fn new(bonus_token: Address) -> Self {
        Self::with_cap(bonus_token, BASIS_POINTS_DIVISOR)
    }

    pub fn with_cap(bonus_token: Address, bn_rate_cap: BasisPoints) -> Self {
        Self {
            bonus_token,
            bn_rate_cap,
            inactive_points: HashMap::new(),
            total_inactive_points: Amount::ZERO,
        }
    }

    pub fn bonus_token(&self) -> Address {
        self.bonus_token
    }

    fn inactive(&self, account: &Address) -> Amount {
        self.inactive_points
            .get(account)
            .copied()
            .unwrap_or_default()
    }
}

impl StakeWeighting for BonusCap {
    fn reward_weight(&self, account: &Address, staked: Amount) -> Amount {
        staked.saturating_sub(self.inactive(account))
    }

    fn reward_supply(&self, total_supply: Amount) -> Amount {
        total_supply.saturating_sub(self.total_inactive_points)
    }

    fn rebalance(&mut self, account: &Address, deposits: &HashMap<Address, Amount>) -> Result<()> {
        let mut active = Amount::ZERO;
        let mut bonus = Amount::ZERO;
        for (token, balance) in deposits {
            if *token == self.bonus_token {
                bonus = *balance;
            } else {
                active = math::add(active, *balance, "active deposits")?;
            }
        }
        let allowed = math::mul_div(
            active,
            U256::from(self.bn_rate_cap),
            U256::from(BASIS_POINTS_DIVISOR),
        )?;
        let next = bonus.saturating_sub(allowed);
        let previous = self.inactive(account);

        let total = math::sub(self.total_inactive_points, previous, "total inactive points")?;
        self.total_inactive_points = math::add(total, next, "total inactive points")?;
        if next.is_zero() {
            self.inactive_points.remove(account);
        } else {
            self.inactive_points.insert(*account, next);
        }
        if next != previous {
            debug!(account = %account, inactive = %next, "inactive bonus points changed");
        }
        Ok(())
    }
}

/// Third-tier tracker paying protocol fees with capped bonus points.
pub type FeeTracker = Tracker<BonusCap>;

impl Tracker<BonusCap> {
    /// Create an uninitialized fee tracker accepting `bonus_token` as the
    /// capped deposit.
    pub fn fee_tracker(address: Address, gov: Address, info: TokenInfo, bonus_token: Address) -> Self {
        Tracker::new(address, gov, info, BonusCap::new(bonus_token))
    }

    /// Bonus points of `account` currently excluded from earning.
    pub fn inactive_points(&self, account: &Address) -> Amount {
        self.weighting().inactive(account)
    }

    pub fn total_inactive_points(&self) -> Amount {
        self.weighting().total_inactive_points
    }

    pub fn bn_rate_cap(&self) -> BasisPoints {
        self.weighting().bn_rate_cap
    }

    /// Change the bonus cap. Accrual is settled at the old cap first; an
    /// account's inactive points follow the new cap on its next deposit
    /// change.
    pub fn set_bn_rate_cap(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        bn_rate_cap: BasisPoints,
    ) -> Result<()> {
        if ctx.caller != self.gov() {
            return Err(StakeError::Forbidden(format!(
                "{}: caller {} is not gov",
                self.info().symbol,
                ctx.caller
            )));
        }
        self.update_rewards(ledger, None, ctx.now)?;
        self.weighting_mut().bn_rate_cap = bn_rate_cap;
        info!(tracker = %self.address(), bn_rate_cap, "bonus rate cap changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributor::RewardDistributor;
    use gammastake_core::{derive_address, expand_decimals, Timestamp};

    const START: Timestamp = 1_700_000_000;
    const DAY: u64 = 24 * 60 * 60;

    fn units(n: u64) -> Amount {
        expand_decimals(n, 18)
    }

    #[test]
    fn test_rebalance_caps_bonus_at_active_deposits() {
        let staked = derive_address("staked");
        let bn = derive_address("bn");
        let account = derive_address("user0");
        let mut cap = BonusCap::new(bn);

        let deposits = HashMap::from([(staked, units(1000)), (bn, units(1500))]);
        cap.rebalance(&account, &deposits).unwrap();
        assert_eq!(cap.inactive(&account), units(500));
        assert_eq!(cap.reward_weight(&account, units(2500)), units(2000));
        assert_eq!(cap.reward_supply(units(3500)), units(3000));

        let deposits = HashMap::from([(staked, units(2000)), (bn, units(1500))]);
        cap.rebalance(&account, &deposits).unwrap();
        assert_eq!(cap.inactive(&account), Amount::ZERO);
        assert_eq!(cap.total_inactive_points, Amount::ZERO);
    }

    #[test]
    fn test_rebalance_respects_custom_cap() {
        let staked = derive_address("staked");
        let bn = derive_address("bn");
        let account = derive_address("user0");
        // bonus may reach half of the real stake
        let mut cap = BonusCap::with_cap(bn, 5_000);
        let deposits = HashMap::from([(staked, units(1000)), (bn, units(800))]);
        cap.rebalance(&account, &deposits).unwrap();
        assert_eq!(cap.inactive(&account), units(300));
    }

    struct Fixture {
        ledger: TokenLedger,
        tracker: FeeTracker,
        gov: Address,
        staked: Address,
        bn: Address,
    }

    fn setup() -> Fixture {
        let gov = derive_address("gov");
        let staked = derive_address("sbgs");
        let bn = derive_address("bngs");
        let weth = derive_address("weth");
        let mut ledger = TokenLedger::new();
        for (token, symbol) in [(staked, "sbGS"), (bn, "bnGS"), (weth, "WETH")] {
            ledger
                .register_token(token, gov, TokenInfo::new(symbol, symbol))
                .unwrap();
            ledger.set_minter(&token, gov, gov, true).unwrap();
        }

        let address = derive_address("fee-tracker");
        let mut tracker = FeeTracker::fee_tracker(address, gov, TokenInfo::new("Staked + Bonus + Fee GS", "sbfGS"), bn);
        let distributor = RewardDistributor::flat(derive_address("fee-distributor"), gov, weth, address, START);
        ledger
            .mint(&weth, gov, distributor.address(), units(5_000))
            .unwrap();
        let ctx = CallContext::new(gov, START);
        tracker
            .initialize(&ctx, &mut ledger, &[staked, bn], distributor)
            .unwrap();
        // 0.01 WETH per second
        tracker
            .set_tokens_per_interval(&ctx, &mut ledger, expand_decimals(1, 16))
            .unwrap();
        Fixture {
            ledger,
            tracker,
            gov,
            staked,
            bn,
        }
    }

    fn stake(f: &mut Fixture, user: Address, token: Address, amount: Amount, offset: u64) {
        f.ledger.mint(&token, f.gov, user, amount).unwrap();
        f.ledger
            .approve(&token, user, f.tracker.address(), amount)
            .unwrap();
        f.tracker
            .stake(&CallContext::new(user, START + offset), &mut f.ledger, token, amount)
            .unwrap();
    }

    fn between(value: Amount, low: u64, high: u64) -> bool {
        value > units(low) && value < units(high)
    }

    #[test]
    fn test_inactive_points_follow_deposits_through_a_week() {
        let mut f = setup();
        let user0 = derive_address("user0");
        let user1 = derive_address("user1");

        let staked = f.staked;
        stake(&mut f, user0, staked, units(1000), 0);
        let bn = f.bn;
        stake(&mut f, user0, bn, units(1500), 0);
        stake(&mut f, user1, staked, units(1000), 0);
        assert_eq!(f.tracker.inactive_points(&user0), units(500));
        assert_eq!(f.tracker.total_inactive_points(), units(500));
        assert_eq!(f.tracker.reward_supply(&f.ledger), units(3000));

        // 864 WETH per day split 2000:1000
        let day1 = START + DAY;
        let claimable0 = f.tracker.claimable(&f.ledger, &user0, day1).unwrap();
        let claimable1 = f.tracker.claimable(&f.ledger, &user1, day1).unwrap();
        assert!(between(claimable0, 575, 577));
        assert!(between(claimable1, 287, 289));

        // leave with 200 of the real stake and 300 of the bonus
        let ctx = CallContext::new(user0, day1);
        f.tracker
            .unstake(&ctx, &mut f.ledger, f.staked, units(200), user0)
            .unwrap();
        f.tracker
            .unstake(&ctx, &mut f.ledger, f.bn, units(300), user0)
            .unwrap();
        assert_eq!(f.tracker.inactive_points(&user0), units(400));
        assert_eq!(f.tracker.staked_amount(&user0), units(2000));

        // 864 split 1600:1000
        let day2 = START + 2 * DAY;
        let claimable0 = f.tracker.claimable(&f.ledger, &user0, day2).unwrap();
        let claimable1 = f.tracker.claimable(&f.ledger, &user1, day2).unwrap();
        assert!(between(claimable0, 576 + 531, 576 + 532));
        assert!(between(claimable1, 288 + 332, 288 + 333));

        stake(&mut f, user0, staked, units(700), 2 * DAY);
        assert_eq!(f.tracker.inactive_points(&user0), Amount::ZERO);
        assert_eq!(f.tracker.total_inactive_points(), Amount::ZERO);

        // 864 split 2700:1000
        let day3 = START + 3 * DAY;
        let claimable0 = f.tracker.claimable(&f.ledger, &user0, day3).unwrap();
        let claimable1 = f.tracker.claimable(&f.ledger, &user1, day3).unwrap();
        assert!(between(claimable0, 576 + 531 + 630, 576 + 532 + 631));
        assert!(between(claimable1, 288 + 332 + 233, 288 + 333 + 234));
    }

    #[test]
    fn test_bonus_only_account_earns_nothing() {
        let mut f = setup();
        let user0 = derive_address("user0");
        let user1 = derive_address("user1");
        let bn = f.bn;
        stake(&mut f, user0, bn, units(100), 0);
        let staked = f.staked;
        stake(&mut f, user1, staked, units(100), 0);
        assert_eq!(f.tracker.inactive_points(&user0), units(100));

        let claimable0 = f.tracker.claimable(&f.ledger, &user0, START + DAY).unwrap();
        let claimable1 = f.tracker.claimable(&f.ledger, &user1, START + DAY).unwrap();
        assert_eq!(claimable0, Amount::ZERO);
        assert!(between(claimable1, 863, 865));
    }

    #[test]
    fn test_set_bn_rate_cap_requires_gov() {
        let mut f = setup();
        let stranger = derive_address("stranger");
        let err = f
            .tracker
            .set_bn_rate_cap(&CallContext::new(stranger, START), &mut f.ledger, 5_000)
            .unwrap_err();
        assert!(matches!(err, StakeError::Forbidden(_)));

        f.tracker
            .set_bn_rate_cap(&CallContext::new(f.gov, START), &mut f.ledger, 5_000)
            .unwrap();
        assert_eq!(f.tracker.bn_rate_cap(), 5_000);
    }
}
