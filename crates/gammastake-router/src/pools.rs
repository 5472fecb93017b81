// crates/gammastake-router/src/pools.rs
//
// Pool staking: single-tier trackers for LP tokens, keyed by
// (pool token, escrow token). Each pool tracker emits its own escrow token
// and has a vester converting that escrow into GS, capped by the account's
// history in the pool tracker. Pool vesters take no paired stake.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use gammastake_core::{
    derive_address, Address, Amount, CallContext, ProtocolEvent, Result, StakeError, TokenInfo,
};
use gammastake_rewards::{FullWeight, RewardDistributor, RewardTracker, Vester, VesterConfig};

use crate::router::{apply_private_modes, StakingRouter};

/// Tracker and vester serving one (pool, escrow token) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStaking {
    pub tracker: RewardTracker,
    pub vester: Vester,
}

/// What a pool claim paid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolClaim {
    /// Escrow tokens from the pool tracker.
    pub es_token: Amount,
    /// GS from the pool vester.
    pub vested: Amount,
}

/// Look up pool staking, reporting a miss with `missing`.
pub(crate) fn pool_entry(
    pools: &mut HashMap<Address, HashMap<Address, PoolStaking>>,
    pool: Address,
    es_token: Address,
    missing: fn(String) -> StakeError,
) -> Result<&mut PoolStaking> {
    pools
        .get_mut(&pool)
        .and_then(|by_es| by_es.get_mut(&es_token))
        .ok_or_else(|| missing(format!("pool {} with escrow {}", pool, es_token)))
}

impl StakingRouter {
    /// Create the tracker, distributor, and vester for `(pool, es_token)`.
    ///
    /// Both tokens must already be registered in the ledger with gov as
    /// their governor. The pool tracker becomes the LP token's handler and
    /// the vester becomes a handler and minter of the escrow token.
    ///
    /// # Errors
    /// - `StakeError::Forbidden` if the caller is not gov.
    /// - `StakeError::TokenNotFound` for an unregistered token.
    /// - `StakeError::AlreadyInitialized` if the pair is already set up.
    pub fn setup_pool_staking(&mut self, caller: Address, pool: Address, es_token: Address) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            if router.pool_staking(pool, es_token, StakeError::TrackerNotFound).is_ok() {
                return Err(StakeError::AlreadyInitialized(format!(
                    "pool {} with escrow {}",
                    pool, es_token
                )));
            }
            let pool_symbol = router.ledger.token_info(&pool)?.symbol.clone();
            let es_symbol = router.ledger.token_info(&es_token)?.symbol.clone();

            let rctx = router.as_router(ctx);
            let label = format!("gammastake.pool.{}.{}", pool, es_token);
            let tracker_address = derive_address(&format!("{}.tracker", label));
            let vester_address = derive_address(&format!("{}.vester", label));

            let mut tracker = RewardTracker::new(
                tracker_address,
                router.address,
                TokenInfo::new(&format!("Staked {}", pool_symbol), &format!("s{}", pool_symbol)),
                FullWeight,
            );
            tracker.initialize(
                &rctx,
                &mut router.ledger,
                &[pool],
                RewardDistributor::flat(
                    derive_address(&format!("{}.distributor", label)),
                    router.address,
                    es_token,
                    tracker_address,
                    ctx.now,
                ),
            )?;
            tracker.set_handler(&rctx, &mut router.ledger, router.address, true)?;
            apply_private_modes(
                &mut tracker,
                &rctx,
                &mut router.ledger,
                router.config.private_transfer_mode,
                router.config.private_staking_mode,
                false,
            )?;

            router.ledger.set_handler(&pool, ctx.caller, tracker_address, true)?;
            router.ledger.set_handler(&es_token, ctx.caller, vester_address, true)?;
            router.ledger.set_minter(&es_token, ctx.caller, vester_address, true)?;

            let mut vester = Vester::new(VesterConfig {
                address: vester_address,
                gov: router.address,
                name: format!("Vested {}", es_symbol),
                symbol: format!("v{}", es_symbol),
                vesting_duration: router.config.vesting_duration,
                es_token,
                claimable_token: router.gs,
                pair_token: None,
                reward_tracker: Some(tracker_address),
                cap: router.config.pool_vester_cap,
            })?;
            vester.set_handler(&rctx, router.address, true)?;

            router
                .pools
                .entry(pool)
                .or_default()
                .insert(es_token, PoolStaking { tracker, vester });
            info!(pool = %pool, es_token = %es_token, tracker = %tracker_address, "pool staking set up");
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // LP staking
    // -----------------------------------------------------------------------

    pub fn stake_lp(&mut self, caller: Address, pool: Address, es_token: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.stake_lp_inner(ctx, pool, es_token, ctx.caller, ctx.caller, amount)
        })
    }

    /// Stake the caller's LP tokens on behalf of `account`.
    pub fn stake_lp_for_account(
        &mut self,
        caller: Address,
        pool: Address,
        es_token: Address,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.check_for_account(ctx, &account)?;
            router.stake_lp_inner(ctx, pool, es_token, ctx.caller, account, amount)
        })
    }

    pub fn unstake_lp(&mut self, caller: Address, pool: Address, es_token: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.unstake_lp_inner(ctx, pool, es_token, ctx.caller, amount)
        })
    }

    /// Unstake `account`'s LP tokens; they are returned to `account`.
    pub fn unstake_lp_for_account(
        &mut self,
        caller: Address,
        pool: Address,
        es_token: Address,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.check_for_account(ctx, &account)?;
            router.unstake_lp_inner(ctx, pool, es_token, account, amount)
        })
    }

    fn stake_lp_inner(
        &mut self,
        ctx: &CallContext,
        pool: Address,
        es_token: Address,
        funding_account: Address,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount("router: cannot stake zero".to_string()));
        }
        let rctx = self.as_router(ctx);
        let staking = pool_entry(&mut self.pools, pool, es_token, StakeError::TrackerNotFound)?;
        staking
            .tracker
            .stake_for_account(&rctx, &mut self.ledger, funding_account, account, pool, amount)?;
        info!(account = %account, pool = %pool, amount = %amount, "staked lp");
        self.events.push(ProtocolEvent::StakedLp {
            account,
            pool,
            amount,
        });
        Ok(())
    }

    fn unstake_lp_inner(
        &mut self,
        ctx: &CallContext,
        pool: Address,
        es_token: Address,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount("router: cannot unstake zero".to_string()));
        }
        let rctx = self.as_router(ctx);
        let staking = pool_entry(&mut self.pools, pool, es_token, StakeError::TrackerNotFound)?;
        staking
            .tracker
            .unstake_for_account(&rctx, &mut self.ledger, account, pool, amount, account)?;
        info!(account = %account, pool = %pool, amount = %amount, "unstaked lp");
        self.events.push(ProtocolEvent::UnstakedLp {
            account,
            pool,
            amount,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Pool rewards and vesting
    // -----------------------------------------------------------------------

    /// Claim pool escrow rewards, vested GS, or both.
    pub fn claim_pool(
        &mut self,
        caller: Address,
        pool: Address,
        es_token: Address,
        include_reward: bool,
        include_vesting: bool,
    ) -> Result<PoolClaim> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            let account = ctx.caller;
            let missing: fn(String) -> StakeError = if include_reward {
                StakeError::TrackerNotFound
            } else {
                StakeError::VesterNotFound
            };
            let staking = pool_entry(&mut router.pools, pool, es_token, missing)?;
            let mut claimed = PoolClaim::default();
            if include_reward {
                claimed.es_token = staking
                    .tracker
                    .claim_for_account(&rctx, &mut router.ledger, account, account)?;
            }
            if include_vesting {
                claimed.vested = staking.vester.claim_for_account(
                    &rctx,
                    &mut router.ledger,
                    Some(&staking.tracker),
                    account,
                    account,
                )?;
            }
            Ok(claimed)
        })
    }

    pub fn vest_es_token_for_pool(
        &mut self,
        caller: Address,
        pool: Address,
        es_token: Address,
        amount: Amount,
    ) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            let staking = pool_entry(&mut router.pools, pool, es_token, StakeError::VesterNotFound)?;
            staking.vester.deposit_for_account(
                &rctx,
                &mut router.ledger,
                Some(&staking.tracker),
                ctx.caller,
                amount,
            )
        })
    }

    pub fn withdraw_es_token_for_pool(&mut self, caller: Address, pool: Address, es_token: Address) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            let staking = pool_entry(&mut router.pools, pool, es_token, StakeError::VesterNotFound)?;
            staking
                .vester
                .withdraw_for_account(&rctx, &mut router.ledger, ctx.caller)
        })
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn pool(&self, pool: Address, es_token: Address) -> Option<&PoolStaking> {
        self.pools.get(&pool).and_then(|by_es| by_es.get(&es_token))
    }

    pub(crate) fn pool_staking(
        &self,
        pool: Address,
        es_token: Address,
        missing: fn(String) -> StakeError,
    ) -> Result<&PoolStaking> {
        self.pool(pool, es_token)
            .ok_or_else(|| missing(format!("pool {} with escrow {}", pool, es_token)))
    }

    /// Reward-weighted average stake of `account`: in the core reward tier
    /// when `pool` is `None`, otherwise in the pool tracker.
    pub fn get_average_staked_amount(
        &self,
        pool: Option<Address>,
        es_token: Address,
        account: &Address,
    ) -> Result<Amount> {
        match pool {
            None => Ok(self.core.reward_tracker.average_staked_amount(account)),
            Some(pool) => Ok(self
                .pool_staking(pool, es_token, StakeError::TrackerNotFound)?
                .tracker
                .average_staked_amount(account)),
        }
    }

    /// Escrow rewards `account` could claim now from the pool tracker.
    pub fn pool_claimable(&self, pool: Address, es_token: Address, account: &Address) -> Result<Amount> {
        self.pool_staking(pool, es_token, StakeError::TrackerNotFound)?
            .tracker
            .claimable(&self.ledger, account, self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::router::TrackerId;
    use gammastake_core::{expand_decimals, ManualClock, Timestamp};
    use std::sync::Arc;

    const START: Timestamp = 1_700_000_000;

    fn setup() -> (StakingRouter, Address, Address) {
        let clock = ManualClock::new(START);
        let mut router = StakingRouter::new(ProtocolConfig::default(), Arc::new(clock)).unwrap();
        let gov = router.gov();
        let pool = derive_address("pool.lp");
        let es = derive_address("pool.es");
        router
            .ledger_mut()
            .register_token(pool, gov, TokenInfo::new("Pool LP", "PLP"))
            .unwrap();
        router
            .ledger_mut()
            .register_token(es, gov, TokenInfo::new("Escrowed Pool", "esPL"))
            .unwrap();
        (router, pool, es)
    }

    #[test]
    fn test_setup_pool_staking() {
        let (mut router, pool, es) = setup();
        let gov = router.gov();
        router.setup_pool_staking(gov, pool, es).unwrap();

        let staking = router.pool(pool, es).unwrap();
        assert_eq!(staking.tracker.reward_token(), Some(es));
        assert!(staking.tracker.is_deposit_token(&pool));
        assert_eq!(staking.vester.pair_token(), None);
        assert_eq!(staking.vester.reward_tracker(), Some(staking.tracker.address()));
        assert_eq!(staking.tracker.info().symbol, "sPLP");
        assert!(router.ledger().is_handler(&pool, &staking.tracker.address()));
        assert!(router.ledger().is_minter(&es, &staking.vester.address()));
    }

    #[test]
    fn test_setup_pool_staking_rejects_duplicates_and_strangers() {
        let (mut router, pool, es) = setup();
        let gov = router.gov();
        let stranger = derive_address("stranger");
        assert!(matches!(
            router.setup_pool_staking(stranger, pool, es),
            Err(StakeError::Forbidden(_))
        ));
        router.setup_pool_staking(gov, pool, es).unwrap();
        assert!(matches!(
            router.setup_pool_staking(gov, pool, es),
            Err(StakeError::AlreadyInitialized(_))
        ));
        assert!(matches!(
            router.setup_pool_staking(gov, derive_address("unknown"), es),
            Err(StakeError::TokenNotFound(_))
        ));
    }

    #[test]
    fn test_missing_pool_lookups() {
        let (mut router, pool, es) = setup();
        let user = derive_address("user0");
        assert!(matches!(
            router.stake_lp(user, pool, es, expand_decimals(1, 18)),
            Err(StakeError::TrackerNotFound(_))
        ));
        assert!(matches!(
            router.claim_pool(user, pool, es, false, true),
            Err(StakeError::VesterNotFound(_))
        ));
        assert!(matches!(
            router.withdraw_es_token_for_pool(user, pool, es),
            Err(StakeError::VesterNotFound(_))
        ));
        assert!(matches!(
            router.get_average_staked_amount(Some(pool), es, &user),
            Err(StakeError::TrackerNotFound(_))
        ));
        let gov = router.gov();
        assert!(matches!(
            router.set_tokens_per_interval(gov, TrackerId::Pool { pool, es_token: es }, Amount::from(1u64)),
            Err(StakeError::TrackerNotFound(_))
        ));
    }

    #[test]
    fn test_stake_and_unstake_lp() {
        let (mut router, pool, es) = setup();
        let gov = router.gov();
        let user = derive_address("user0");
        router.setup_pool_staking(gov, pool, es).unwrap();
        let amount = expand_decimals(100, 18);
        router.ledger_mut().set_minter(&pool, gov, gov, true).unwrap();
        router.ledger_mut().mint(&pool, gov, user, amount).unwrap();

        router.stake_lp(user, pool, es, amount).unwrap();
        let tracker = router.pool(pool, es).unwrap().tracker.address();
        assert_eq!(router.ledger().balance_of(&pool, &user), Amount::ZERO);
        assert_eq!(router.ledger().balance_of(&tracker, &user), amount);

        router.unstake_lp(user, pool, es, amount).unwrap();
        assert_eq!(router.ledger().balance_of(&pool, &user), amount);
        let events = router.take_events();
        assert!(events.contains(&ProtocolEvent::StakedLp {
            account: user,
            pool,
            amount
        }));
        assert!(events.contains(&ProtocolEvent::UnstakedLp {
            account: user,
            pool,
            amount
        }));
    }
}
