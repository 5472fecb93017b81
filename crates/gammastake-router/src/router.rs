// crates/gammastake-router/src/router.rs
//
// StakingRouter: the single entry point that chains the staking tiers.
//
// Tier layout of the core stack:
//
//   GS / esGS ──► reward tracker (sGS, earns esGS)
//                   └─► bonus tracker (sbGS, earns bnGS)
//                         └─► fee tracker (sbfGS + bnGS, earns WETH)
//
// Each tier's share token is a deposit token of the next. Trackers never
// call each other: the router sequences every hop explicitly, acting as a
// handler on each tier. The core vester turns esGS into GS and locks fee
// tracker shares as its paired stake.
//
// Every public operation runs inside `atomically`, which snapshots the
// whole router (ledger included) and restores it if any step fails.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gammastake_core::{
    derive_address, math, Address, Amount, BasisPoints, CallContext, Clock, ProtocolEvent, Result,
    StakeError, StakeableLedger, Timestamp, TokenInfo, TokenLedger, TrackerView,
};
use gammastake_rewards::{
    FeeTracker, FullWeight, RewardDistributor, RewardTracker, StakeWeighting, Tracker, Vester,
    VesterConfig,
};

use crate::config::ProtocolConfig;
use crate::pools::PoolStaking;

/// Identifies a tracker (and its distributor or vester) for governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerId {
    /// Tier 1, paying esGS. Its vester is the core vester.
    Reward,
    /// Tier 2, paying bnGS.
    Bonus,
    /// Tier 3, paying WETH.
    Fee,
    /// A pool tracker and its vester.
    Pool { pool: Address, es_token: Address },
}

/// The three core tiers and the core vester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreTracker {
    pub reward_tracker: RewardTracker,
    pub bonus_tracker: RewardTracker,
    pub fee_tracker: FeeTracker,
    pub vester: Vester,
}

/// Amounts paid (or payable) per reward token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub es_gs: Amount,
    pub bn_gs: Amount,
    pub weth: Amount,
}

/// Governance operations shared by every tracker flavour.
pub(crate) trait TierAdmin {
    fn set_tokens_per_interval(&mut self, ctx: &CallContext, ledger: &mut TokenLedger, amount: Amount) -> Result<()>;

    fn set_distributor_paused(&mut self, ctx: &CallContext, ledger: &mut TokenLedger, paused: bool) -> Result<()>;

    fn withdraw_distributor_token(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<()>;

    fn distributor_address(&self) -> Option<Address>;
}

impl<W: StakeWeighting> TierAdmin for Tracker<W> {
    fn set_tokens_per_interval(&mut self, ctx: &CallContext, ledger: &mut TokenLedger, amount: Amount) -> Result<()> {
        Tracker::set_tokens_per_interval(self, ctx, ledger, amount)
    }

    fn set_distributor_paused(&mut self, ctx: &CallContext, ledger: &mut TokenLedger, paused: bool) -> Result<()> {
        Tracker::set_distributor_paused(self, ctx, ledger, paused)
    }

    fn withdraw_distributor_token(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<()> {
        Tracker::withdraw_distributor_token(self, ctx, ledger, token, receiver, amount)
    }

    fn distributor_address(&self) -> Option<Address> {
        self.distributor().map(|d| d.address())
    }
}

/// Apply the configured private modes to a freshly initialized tracker.
pub(crate) fn apply_private_modes<W: StakeWeighting>(
    tracker: &mut Tracker<W>,
    ctx: &CallContext,
    ledger: &mut TokenLedger,
    transfer: bool,
    staking: bool,
    claiming: bool,
) -> Result<()> {
    tracker.set_in_private_transfer_mode(ctx, ledger, transfer)?;
    tracker.set_in_private_staking_mode(ctx, staking)?;
    tracker.set_in_private_claiming_mode(ctx, claiming)
}

/// Orchestrates staking, claiming, compounding, and vesting across tiers.
#[derive(Clone, Serialize)]
pub struct StakingRouter {
    #[serde(skip)]
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) address: Address,
    pub(crate) gov: Address,
    pub(crate) config: ProtocolConfig,
    pub(crate) managers: HashSet<Address>,
    pub(crate) gs: Address,
    pub(crate) es_gs: Address,
    pub(crate) bn_gs: Address,
    pub(crate) weth: Address,
    pub(crate) ledger: TokenLedger,
    pub(crate) core: CoreTracker,
    /// pool token -> escrow token -> staking
    pub(crate) pools: HashMap<Address, HashMap<Address, PoolStaking>>,
    pub(crate) events: Vec<ProtocolEvent>,
}

impl fmt::Debug for StakingRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StakingRouter")
            .field("address", &self.address)
            .field("gov", &self.gov)
            .field("managers", &self.managers)
            .field("core", &self.core)
            .field("pools", &self.pools)
            .finish_non_exhaustive()
    }
}

impl StakingRouter {
    /// Deploy the core stack: register GS, esGS, bnGS and WETH under
    /// `config.gov`, build the three tiers and the core vester, and wire
    /// every handler and minter the cascade needs.
    ///
    /// Distributors start unfunded; gov mints reward tokens to them through
    /// [`ledger_mut`](Self::ledger_mut).
    ///
    /// # Errors
    /// Returns `StakeError::Config` if the configuration is invalid.
    pub fn new(config: ProtocolConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let now = clock.now();
        let gov = config.gov;
        let address = derive_address("gammastake.router");
        let deployer = CallContext::new(gov, now);
        let admin = deployer.as_caller(address);

        let gs = derive_address("gammastake.token.gs");
        let es_gs = derive_address("gammastake.token.es_gs");
        let bn_gs = derive_address("gammastake.token.bn_gs");
        let weth = derive_address("gammastake.token.weth");

        let mut ledger = TokenLedger::new();
        for (token, name, symbol) in [
            (gs, "Gammastake", "GS"),
            (es_gs, "Escrowed GS", "esGS"),
            (bn_gs, "Bonus GS", "bnGS"),
            (weth, "Wrapped Ether", "WETH"),
        ] {
            ledger.register_token(token, gov, TokenInfo::new(name, symbol))?;
            ledger.set_minter(&token, gov, gov, true)?;
        }

        let reward_address = derive_address("gammastake.core.reward_tracker");
        let bonus_address = derive_address("gammastake.core.bonus_tracker");
        let fee_address = derive_address("gammastake.core.fee_tracker");
        let vester_address = derive_address("gammastake.core.vester");

        let mut reward_tracker =
            RewardTracker::new(reward_address, address, TokenInfo::new("Staked GS", "sGS"), FullWeight);
        reward_tracker.initialize(
            &admin,
            &mut ledger,
            &[gs, es_gs],
            RewardDistributor::flat(
                derive_address("gammastake.core.reward_distributor"),
                address,
                es_gs,
                reward_address,
                now,
            ),
        )?;

        let mut bonus_tracker = RewardTracker::new(
            bonus_address,
            address,
            TokenInfo::new("Staked + Bonus GS", "sbGS"),
            FullWeight,
        );
        bonus_tracker.initialize(
            &admin,
            &mut ledger,
            &[reward_address],
            RewardDistributor::bonus(
                derive_address("gammastake.core.bonus_distributor"),
                address,
                bn_gs,
                bonus_address,
                now,
            ),
        )?;
        if config.bonus_multiplier_basis_points > 0 {
            bonus_tracker.set_bonus_multiplier(&admin, &mut ledger, config.bonus_multiplier_basis_points)?;
        }

        let mut fee_tracker = FeeTracker::fee_tracker(
            fee_address,
            address,
            TokenInfo::new("Staked + Bonus + Fee GS", "sbfGS"),
            bn_gs,
        );
        fee_tracker.initialize(
            &admin,
            &mut ledger,
            &[bonus_address, bn_gs],
            RewardDistributor::flat(
                derive_address("gammastake.core.fee_distributor"),
                address,
                weth,
                fee_address,
                now,
            ),
        )?;
        fee_tracker.set_bn_rate_cap(&admin, &mut ledger, config.bn_rate_cap)?;

        // tier N+1 pulls tier N shares; the vester pulls fee shares as its pair
        reward_tracker.set_handler(&admin, &mut ledger, address, true)?;
        reward_tracker.set_handler(&admin, &mut ledger, bonus_address, true)?;
        bonus_tracker.set_handler(&admin, &mut ledger, address, true)?;
        bonus_tracker.set_handler(&admin, &mut ledger, fee_address, true)?;
        fee_tracker.set_handler(&admin, &mut ledger, address, true)?;
        fee_tracker.set_handler(&admin, &mut ledger, vester_address, true)?;

        ledger.set_handler(&es_gs, gov, reward_address, true)?;
        ledger.set_handler(&es_gs, gov, vester_address, true)?;
        ledger.set_minter(&es_gs, gov, vester_address, true)?;
        ledger.set_handler(&bn_gs, gov, fee_address, true)?;
        ledger.set_minter(&bn_gs, gov, address, true)?;

        let mut vester = Vester::new(VesterConfig {
            address: vester_address,
            gov: address,
            name: "Vested GS".to_string(),
            symbol: "vGS".to_string(),
            vesting_duration: config.vesting_duration,
            es_token: es_gs,
            claimable_token: gs,
            pair_token: Some(fee_address),
            reward_tracker: Some(reward_address),
            cap: config.core_vester_cap,
        })?;
        vester.set_handler(&admin, address, true)?;

        let transfer = config.private_transfer_mode;
        let staking = config.private_staking_mode;
        apply_private_modes(&mut reward_tracker, &admin, &mut ledger, transfer, staking, false)?;
        apply_private_modes(
            &mut bonus_tracker,
            &admin,
            &mut ledger,
            transfer,
            staking,
            config.private_claiming_mode,
        )?;
        apply_private_modes(&mut fee_tracker, &admin, &mut ledger, transfer, staking, false)?;

        let managers = config.manager.into_iter().collect();
        info!(router = %address, gov = %gov, "staking router deployed");

        Ok(Self {
            clock,
            address,
            gov,
            config,
            managers,
            gs,
            es_gs,
            bn_gs,
            weth,
            ledger,
            core: CoreTracker {
                reward_tracker,
                bonus_tracker,
                fee_tracker,
                vester,
            },
            pools: HashMap::new(),
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Run `op` as `caller` at the clock's current time. On error every
    /// change `op` made is rolled back.
    ///
    /// The rollback point is a full clone of the router, ledger and
    /// per-account maps included, so every call costs O(total state) in
    /// time and memory. Fine for simulations and test-sized books; a large
    /// deployment would want snapshots scoped to the touched components.
    pub(crate) fn atomically<T, F>(&mut self, caller: Address, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &CallContext) -> Result<T>,
    {
        let ctx = CallContext::new(caller, self.clock.now());
        let snapshot = self.clone();
        let mark = self.events.len();
        match op(self, &ctx) {
            Ok(value) => {
                let inner = self.drain_component_events();
                self.events.splice(mark..mark, inner);
                Ok(value)
            }
            Err(err) => {
                warn!(caller = %caller, error = %err, "operation rolled back");
                *self = snapshot;
                Err(err)
            }
        }
    }

    fn drain_component_events(&mut self) -> Vec<ProtocolEvent> {
        let mut events = self.core.reward_tracker.take_events();
        events.extend(self.core.bonus_tracker.take_events());
        events.extend(self.core.fee_tracker.take_events());
        events.extend(self.core.vester.take_events());
        for staking in self.pools.values_mut().flat_map(|by_es| by_es.values_mut()) {
            events.extend(staking.tracker.take_events());
            events.extend(staking.vester.take_events());
        }
        events
    }

    /// Context for calls the router makes on components it administers.
    pub(crate) fn as_router(&self, ctx: &CallContext) -> CallContext {
        ctx.as_caller(self.address)
    }

    pub(crate) fn only_gov(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.gov {
            return Err(StakeError::Forbidden(format!(
                "router: caller {} is not gov",
                ctx.caller
            )));
        }
        Ok(())
    }

    /// `ForAccount` operations are open to the account itself, a manager,
    /// or gov.
    pub(crate) fn check_for_account(&self, ctx: &CallContext, account: &Address) -> Result<()> {
        if ctx.caller == *account || ctx.caller == self.gov || self.managers.contains(&ctx.caller) {
            return Ok(());
        }
        Err(StakeError::Forbidden(format!(
            "router: {} may not act for {}",
            ctx.caller, account
        )))
    }

    fn core_tiers(core: &mut CoreTracker) -> [&mut dyn StakeableLedger; 3] {
        [
            &mut core.reward_tracker as &mut dyn StakeableLedger,
            &mut core.bonus_tracker,
            &mut core.fee_tracker,
        ]
    }

    // -----------------------------------------------------------------------
    // Core staking
    // -----------------------------------------------------------------------

    pub fn stake_gs(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let gs = router.gs;
            router.stake_gs_inner(ctx, ctx.caller, ctx.caller, gs, amount)
        })
    }

    /// Stake the caller's GS on behalf of `account`.
    pub fn stake_gs_for_account(&mut self, caller: Address, account: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.check_for_account(ctx, &account)?;
            let gs = router.gs;
            router.stake_gs_inner(ctx, ctx.caller, account, gs, amount)
        })
    }

    pub fn stake_es_gs(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let es_gs = router.es_gs;
            router.stake_gs_inner(ctx, ctx.caller, ctx.caller, es_gs, amount)
        })
    }

    pub fn unstake_gs(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let gs = router.gs;
            router.unstake_gs_inner(ctx, ctx.caller, gs, amount)
        })
    }

    pub fn unstake_es_gs(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let es_gs = router.es_gs;
            router.unstake_gs_inner(ctx, ctx.caller, es_gs, amount)
        })
    }

    fn stake_gs_inner(
        &mut self,
        ctx: &CallContext,
        funding_account: Address,
        account: Address,
        token: Address,
        amount: Amount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount("router: cannot stake zero".to_string()));
        }
        let rctx = self.as_router(ctx);
        let mut funding = funding_account;
        let mut deposit_token = token;
        for tier in Self::core_tiers(&mut self.core) {
            tier.stake_for_account(&rctx, &mut self.ledger, funding, account, deposit_token, amount)?;
            funding = account;
            deposit_token = tier.address();
        }
        info!(account = %account, token = %token, amount = %amount, "staked");
        self.events.push(ProtocolEvent::StakedGs {
            account,
            token,
            amount,
        });
        Ok(())
    }

    /// Unwind the cascade, then burn the bonus points backing the removed
    /// stake. Pending bonus points are compounded first so the burn sees
    /// the account's full bonus.
    fn unstake_gs_inner(&mut self, ctx: &CallContext, account: Address, token: Address, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount("router: cannot unstake zero".to_string()));
        }
        let rctx = self.as_router(ctx);
        let balance = self.core.reward_tracker.staked_amount(&account);

        let tiers = Self::core_tiers(&mut self.core);
        let deposit_tokens = [token, tiers[0].address(), tiers[1].address()];
        for (tier, deposit_token) in tiers.into_iter().zip(deposit_tokens).rev() {
            tier.unstake_for_account(&rctx, &mut self.ledger, account, deposit_token, amount, account)?;
        }

        let bn_gs = self.bn_gs;
        let claimed = self
            .core
            .bonus_tracker
            .claim_for_account(&rctx, &mut self.ledger, account, account)?;
        if !claimed.is_zero() {
            self.core
                .fee_tracker
                .stake_for_account(&rctx, &mut self.ledger, account, account, bn_gs, claimed)?;
        }

        let staked_bn = self.core.fee_tracker.deposit_balance(&account, &bn_gs);
        if !staked_bn.is_zero() {
            let reduction = math::mul_div(staked_bn, amount, balance)?;
            if !reduction.is_zero() {
                self.core
                    .fee_tracker
                    .unstake_for_account(&rctx, &mut self.ledger, account, bn_gs, reduction, account)?;
                self.ledger.burn(&bn_gs, self.address, account, reduction)?;
                debug!(account = %account, amount = %reduction, "burned bonus points");
            }
        }

        info!(account = %account, token = %token, amount = %amount, "unstaked");
        self.events.push(ProtocolEvent::UnstakedGs {
            account,
            token,
            amount,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rewards
    // -----------------------------------------------------------------------

    /// Claim the selected core rewards. Bonus points are never paid out:
    /// they are staked straight into the fee tier.
    pub fn claim(
        &mut self,
        caller: Address,
        include_reward: bool,
        include_bonus: bool,
        include_fee: bool,
    ) -> Result<RewardBreakdown> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            let account = ctx.caller;
            let mut claimed = RewardBreakdown::default();
            if include_reward {
                claimed.es_gs = router
                    .core
                    .reward_tracker
                    .claim_for_account(&rctx, &mut router.ledger, account, account)?;
            }
            if include_bonus {
                claimed.bn_gs = router.compound_bonus(&rctx, account)?;
            }
            if include_fee {
                claimed.weth = router
                    .core
                    .fee_tracker
                    .claim_for_account(&rctx, &mut router.ledger, account, account)?;
            }
            info!(
                account = %account,
                es_gs = %claimed.es_gs,
                bn_gs = %claimed.bn_gs,
                weth = %claimed.weth,
                "claimed"
            );
            Ok(claimed)
        })
    }

    /// Restake pending esGS through the cascade and pending bnGS into the
    /// fee tier.
    pub fn compound(&mut self, caller: Address) -> Result<()> {
        self.atomically(caller, |router, ctx| router.compound_inner(ctx, ctx.caller))
    }

    pub fn compound_for_account(&mut self, caller: Address, account: Address) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.check_for_account(ctx, &account)?;
            router.compound_inner(ctx, account)
        })
    }

    fn compound_inner(&mut self, ctx: &CallContext, account: Address) -> Result<()> {
        let rctx = self.as_router(ctx);
        let es_amount = self
            .core
            .reward_tracker
            .claim_for_account(&rctx, &mut self.ledger, account, account)?;
        if !es_amount.is_zero() {
            let es_gs = self.es_gs;
            self.stake_gs_inner(ctx, account, account, es_gs, es_amount)?;
        }
        let bn_amount = self.compound_bonus(&rctx, account)?;
        debug!(account = %account, es_gs = %es_amount, bn_gs = %bn_amount, "compounded");
        Ok(())
    }

    fn compound_bonus(&mut self, rctx: &CallContext, account: Address) -> Result<Amount> {
        let amount = self
            .core
            .bonus_tracker
            .claim_for_account(rctx, &mut self.ledger, account, account)?;
        if !amount.is_zero() {
            let bn_gs = self.bn_gs;
            self.core
                .fee_tracker
                .stake_for_account(rctx, &mut self.ledger, account, account, bn_gs, amount)?;
        }
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Core vesting
    // -----------------------------------------------------------------------

    /// Deposit esGS into the core vester, locking fee-tier shares as the pair.
    pub fn vest_es_gs(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            let core = &mut router.core;
            core.vester.deposit_for_account(
                &rctx,
                &mut router.ledger,
                Some(&core.reward_tracker),
                ctx.caller,
                amount,
            )
        })
    }

    pub fn withdraw_es_gs(&mut self, caller: Address) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            router
                .core
                .vester
                .withdraw_for_account(&rctx, &mut router.ledger, ctx.caller)
        })
    }

    pub fn claim_vested_gs(&mut self, caller: Address) -> Result<Amount> {
        self.atomically(caller, |router, ctx| {
            let rctx = router.as_router(ctx);
            let core = &mut router.core;
            core.vester.claim_for_account(
                &rctx,
                &mut router.ledger,
                Some(&core.reward_tracker),
                ctx.caller,
                ctx.caller,
            )
        })
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    pub fn set_manager(&mut self, caller: Address, manager: Address, active: bool) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            if active {
                router.managers.insert(manager);
            } else {
                router.managers.remove(&manager);
            }
            info!(manager = %manager, active, "manager updated");
            Ok(())
        })
    }

    pub fn set_tokens_per_interval(&mut self, caller: Address, id: TrackerId, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            let (tier, ledger) = router.tier_mut(id)?;
            tier.set_tokens_per_interval(&rctx, ledger, amount)
        })
    }

    pub fn set_bonus_multiplier(&mut self, caller: Address, basis_points: BasisPoints) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            router
                .core
                .bonus_tracker
                .set_bonus_multiplier(&rctx, &mut router.ledger, basis_points)
        })
    }

    pub fn set_distributor_paused(&mut self, caller: Address, id: TrackerId, paused: bool) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            let (tier, ledger) = router.tier_mut(id)?;
            tier.set_distributor_paused(&rctx, ledger, paused)
        })
    }

    pub fn set_bn_rate_cap(&mut self, caller: Address, bn_rate_cap: BasisPoints) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            router
                .core
                .fee_tracker
                .set_bn_rate_cap(&rctx, &mut router.ledger, bn_rate_cap)
        })
    }

    pub fn set_bonus_rewards(&mut self, caller: Address, id: TrackerId, account: Address, amount: Amount) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            router.vester_mut(id)?.set_bonus_rewards(&rctx, account, amount)
        })
    }

    pub fn set_cumulative_reward_deductions(
        &mut self,
        caller: Address,
        id: TrackerId,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            router
                .vester_mut(id)?
                .set_cumulative_reward_deductions(&rctx, account, amount)
        })
    }

    pub fn withdraw_distributor_token(
        &mut self,
        caller: Address,
        id: TrackerId,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            let (tier, ledger) = router.tier_mut(id)?;
            tier.withdraw_distributor_token(&rctx, ledger, token, receiver, amount)
        })
    }

    pub fn withdraw_vester_token(
        &mut self,
        caller: Address,
        id: TrackerId,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<()> {
        self.atomically(caller, |router, ctx| {
            router.only_gov(ctx)?;
            let rctx = router.as_router(ctx);
            let (vester, ledger) = router.vester_and_ledger(id)?;
            vester.withdraw_token(&rctx, ledger, token, receiver, amount)
        })
    }

    fn tier_mut(&mut self, id: TrackerId) -> Result<(&mut dyn TierAdmin, &mut TokenLedger)> {
        let ledger = &mut self.ledger;
        let tier: &mut dyn TierAdmin = match id {
            TrackerId::Reward => &mut self.core.reward_tracker,
            TrackerId::Bonus => &mut self.core.bonus_tracker,
            TrackerId::Fee => &mut self.core.fee_tracker,
            TrackerId::Pool { pool, es_token } => {
                &mut crate::pools::pool_entry(&mut self.pools, pool, es_token, StakeError::TrackerNotFound)?.tracker
            }
        };
        Ok((tier, ledger))
    }

    fn vester_mut(&mut self, id: TrackerId) -> Result<&mut Vester> {
        Ok(self.vester_and_ledger(id)?.0)
    }

    fn vester_and_ledger(&mut self, id: TrackerId) -> Result<(&mut Vester, &mut TokenLedger)> {
        let ledger = &mut self.ledger;
        let vester = match id {
            TrackerId::Reward => &mut self.core.vester,
            TrackerId::Pool { pool, es_token } => {
                &mut crate::pools::pool_entry(&mut self.pools, pool, es_token, StakeError::VesterNotFound)?.vester
            }
            other => return Err(StakeError::VesterNotFound(format!("{:?}", other))),
        };
        Ok((vester, ledger))
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Rewards `account` could claim right now from each core tier.
    pub fn claimable(&self, account: &Address) -> Result<RewardBreakdown> {
        let now = self.now();
        Ok(RewardBreakdown {
            es_gs: self.core.reward_tracker.claimable(&self.ledger, account, now)?,
            bn_gs: self.core.bonus_tracker.claimable(&self.ledger, account, now)?,
            weth: self.core.fee_tracker.claimable(&self.ledger, account, now)?,
        })
    }

    /// Distributor feeding the given tracker.
    pub fn distributor_address(&self, id: TrackerId) -> Result<Address> {
        let address = match id {
            TrackerId::Reward => self.core.reward_tracker.distributor_address(),
            TrackerId::Bonus => self.core.bonus_tracker.distributor_address(),
            TrackerId::Fee => self.core.fee_tracker.distributor_address(),
            TrackerId::Pool { pool, es_token } => self
                .pool_staking(pool, es_token, StakeError::TrackerNotFound)?
                .tracker
                .distributor_address(),
        };
        address.ok_or_else(|| StakeError::NotInitialized(format!("{:?}", id)))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn gov(&self) -> Address {
        self.gov
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn is_manager(&self, account: &Address) -> bool {
        self.managers.contains(account)
    }

    pub fn gs(&self) -> Address {
        self.gs
    }

    pub fn es_gs(&self) -> Address {
        self.es_gs
    }

    pub fn bn_gs(&self) -> Address {
        self.bn_gs
    }

    pub fn weth(&self) -> Address {
        self.weth
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Direct ledger access for token holders and gov: approvals, minting
    /// reward reserves, registering pool tokens. Not rolled back.
    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    pub fn core(&self) -> &CoreTracker {
        &self.core
    }

    /// Drain events recorded by committed operations, oldest first.
    pub fn take_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Full router state as pretty-printed JSON.
    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
