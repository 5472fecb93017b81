// crates/gammastake-rewards/src/tracker.rs
//
// Reward tracker: a share ledger with a cumulative reward-per-token index.
//
// Each tracker accepts one or more deposit tokens, mints one share per unit
// deposited, and accrues a single reward token from the distributor it owns.
// Accrual follows the standard index scheme:
//
//   index   += block_reward * PRECISION / reward_supply
//   reward   = weight(account) * (index - index_at_last_touch) / PRECISION
//
// and every operation touching an account settles that account first, on
// its pre-change stake. How much of an account's stake earns (its weight)
// and the matching supply are delegated to a StakeWeighting policy: the
// plain RewardTracker counts everything, the FeeTracker caps bonus points
// (see fee_tracker.rs).
//
// Validation happens before any mutation, so a failed call leaves both the
// tracker and the ledger unchanged.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gammastake_core::{
    math, Address, Amount, BasisPoints, CallContext, ProtocolEvent, Result, StakeError,
    StakeableLedger, Timestamp, TokenInfo, TokenLedger, TrackerView, PRECISION, U256,
};

use crate::distributor::RewardDistributor;

/// Policy deciding how much of each account's stake earns rewards.
pub trait StakeWeighting: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Portion of `staked` that earns rewards for `account`.
    fn reward_weight(&self, account: &Address, staked: Amount) -> Amount;

    /// Supply that shares each distribution, given the share total supply.
    fn reward_supply(&self, total_supply: Amount) -> Amount;

    /// Re-derive internal state after `account`'s deposits changed.
    fn rebalance(&mut self, account: &Address, deposits: &HashMap<Address, Amount>) -> Result<()>;
}

/// Every staked unit earns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullWeight;

impl StakeWeighting for FullWeight {
    fn reward_weight(&self, _account: &Address, staked: Amount) -> Amount {
        staked
    }

    fn reward_supply(&self, total_supply: Amount) -> Amount {
        total_supply
    }

    fn rebalance(&mut self, _account: &Address, _deposits: &HashMap<Address, Amount>) -> Result<()> {
        Ok(())
    }
}

/// A tracker with plain, uncapped accrual.
pub type RewardTracker = Tracker<FullWeight>;

/// Reward accrual ledger for one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker<W> {
    address: Address,
    gov: Address,
    info: TokenInfo,
    weighting: W,
    distributor: Option<RewardDistributor>,
    is_deposit_token: HashSet<Address>,
    handlers: HashSet<Address>,
    in_private_transfer_mode: bool,
    in_private_staking_mode: bool,
    in_private_claiming_mode: bool,
    cumulative_reward_per_token: U256,
    staked_amounts: HashMap<Address, Amount>,
    /// account -> deposit token -> balance
    deposit_balances: HashMap<Address, HashMap<Address, Amount>>,
    total_deposit_supply: HashMap<Address, Amount>,
    previous_cumulated_reward_per_token: HashMap<Address, U256>,
    claimable_reward: HashMap<Address, Amount>,
    cumulative_rewards: HashMap<Address, Amount>,
    average_staked_amounts: HashMap<Address, Amount>,
    events: Vec<ProtocolEvent>,
}

fn get(map: &HashMap<Address, Amount>, account: &Address) -> Amount {
    map.get(account).copied().unwrap_or_default()
}

impl<W: StakeWeighting> Tracker<W> {
    /// Create an uninitialized tracker. `address` doubles as the id of its
    /// share token in the ledger.
    pub fn new(address: Address, gov: Address, info: TokenInfo, weighting: W) -> Self {
        Self {
            address,
            gov,
            info,
            weighting,
            distributor: None,
            is_deposit_token: HashSet::new(),
            handlers: HashSet::new(),
            in_private_transfer_mode: false,
            in_private_staking_mode: false,
            in_private_claiming_mode: false,
            cumulative_reward_per_token: U256::ZERO,
            staked_amounts: HashMap::new(),
            deposit_balances: HashMap::new(),
            total_deposit_supply: HashMap::new(),
            previous_cumulated_reward_per_token: HashMap::new(),
            claimable_reward: HashMap::new(),
            cumulative_rewards: HashMap::new(),
            average_staked_amounts: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// One-time setup: accept `deposit_tokens`, take ownership of the
    /// distributor, and register the share token in the ledger.
    ///
    /// # Errors
    /// - `StakeError::Forbidden` if the caller is not gov.
    /// - `StakeError::AlreadyInitialized` on a second call.
    /// - `StakeError::Config` if the distributor feeds a different tracker.
    pub fn initialize(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        deposit_tokens: &[Address],
        distributor: RewardDistributor,
    ) -> Result<()> {
        self.only_gov(ctx)?;
        if self.distributor.is_some() {
            return Err(StakeError::AlreadyInitialized(format!(
                "tracker {} ({})",
                self.info.symbol, self.address
            )));
        }
        if distributor.reward_tracker() != self.address {
            return Err(StakeError::Config(format!(
                "distributor {} feeds {}, not {}",
                distributor.address(),
                distributor.reward_tracker(),
                self.address
            )));
        }
        ledger.register_token(self.address, self.address, self.info.clone())?;
        ledger.set_minter(&self.address, self.address, self.address, true)?;
        self.is_deposit_token.extend(deposit_tokens.iter().copied());
        info!(
            tracker = %self.address,
            symbol = %self.info.symbol,
            distributor = %distributor.address(),
            "tracker initialized"
        );
        self.distributor = Some(distributor);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    pub fn set_deposit_token(&mut self, ctx: &CallContext, token: Address, active: bool) -> Result<()> {
        self.only_gov(ctx)?;
        if active {
            self.is_deposit_token.insert(token);
        } else {
            self.is_deposit_token.remove(&token);
        }
        Ok(())
    }

    /// Grant or revoke handler rights, on the tracker and on its share token.
    pub fn set_handler(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        handler: Address,
        active: bool,
    ) -> Result<()> {
        self.only_gov(ctx)?;
        self.ensure_initialized()?;
        ledger.set_handler(&self.address, self.address, handler, active)?;
        if active {
            self.handlers.insert(handler);
        } else {
            self.handlers.remove(&handler);
        }
        Ok(())
    }

    pub fn set_in_private_transfer_mode(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        mode: bool,
    ) -> Result<()> {
        self.only_gov(ctx)?;
        self.ensure_initialized()?;
        ledger.set_in_private_transfer_mode(&self.address, self.address, mode)?;
        self.in_private_transfer_mode = mode;
        Ok(())
    }

    pub fn set_in_private_staking_mode(&mut self, ctx: &CallContext, mode: bool) -> Result<()> {
        self.only_gov(ctx)?;
        self.in_private_staking_mode = mode;
        Ok(())
    }

    pub fn set_in_private_claiming_mode(&mut self, ctx: &CallContext, mode: bool) -> Result<()> {
        self.only_gov(ctx)?;
        self.in_private_claiming_mode = mode;
        Ok(())
    }

    /// Change the flat emission rate after settling at the old rate.
    pub fn set_tokens_per_interval(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        amount: Amount,
    ) -> Result<()> {
        self.initialized_distributor()?.check_tokens_per_interval(ctx)?;
        self.update_rewards(ledger, None, ctx.now)?;
        self.initialized_distributor_mut()?
            .set_tokens_per_interval(ctx, amount)
    }

    /// Change the bonus multiplier after settling at the old multiplier.
    pub fn set_bonus_multiplier(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        basis_points: BasisPoints,
    ) -> Result<()> {
        self.initialized_distributor()?
            .check_bonus_multiplier(ctx, basis_points)?;
        self.update_rewards(ledger, None, ctx.now)?;
        self.initialized_distributor_mut()?
            .set_bonus_multiplier(ctx, basis_points)
    }

    /// Pause or resume emission. Pausing settles everything accrued up to
    /// `ctx.now` first, so stakers keep what they earned before the pause.
    pub fn set_distributor_paused(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        paused: bool,
    ) -> Result<()> {
        self.initialized_distributor()?.only_gov(ctx)?;
        if paused {
            self.update_rewards(ledger, None, ctx.now)?;
        }
        self.initialized_distributor_mut()?.set_paused(ctx, paused)
    }

    pub fn update_last_distribution_time(&mut self, ctx: &CallContext) -> Result<()> {
        self.initialized_distributor_mut()?
            .update_last_distribution_time(ctx)
    }

    /// Gov withdrawal from the distributor, capped so owed rewards stay put.
    pub fn withdraw_distributor_token(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<()> {
        let supply = self.reward_supply(ledger);
        self.initialized_distributor_mut()?
            .withdraw_token(ctx, ledger, token, receiver, amount, supply)
    }

    pub fn max_withdrawable_distributor_amount(
        &self,
        ledger: &TokenLedger,
        now: Timestamp,
    ) -> Result<Amount> {
        self.initialized_distributor()?
            .max_withdrawable_amount(ledger, self.reward_supply(ledger), now)
    }

    // -----------------------------------------------------------------------
    // Staking
    // -----------------------------------------------------------------------

    /// Stake the caller's own tokens. Disabled in private staking mode.
    pub fn stake(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        deposit_token: Address,
        amount: Amount,
    ) -> Result<()> {
        if self.in_private_staking_mode {
            return Err(StakeError::Forbidden(format!(
                "{}: staking is private",
                self.info.symbol
            )));
        }
        self.stake_inner(ledger, ctx.caller, ctx.caller, deposit_token, amount, ctx.now)
    }

    /// Handler-only stake funded by `funding_account` and credited to `account`.
    pub fn stake_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        funding_account: Address,
        account: Address,
        deposit_token: Address,
        amount: Amount,
    ) -> Result<()> {
        self.only_handler(ctx)?;
        self.stake_inner(ledger, funding_account, account, deposit_token, amount, ctx.now)
    }

    /// Unstake the caller's own deposit. Disabled in private staking mode.
    pub fn unstake(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        deposit_token: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<()> {
        if self.in_private_staking_mode {
            return Err(StakeError::Forbidden(format!(
                "{}: staking is private",
                self.info.symbol
            )));
        }
        self.unstake_inner(ledger, ctx.caller, deposit_token, amount, receiver, ctx.now)
    }

    pub fn unstake_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
        deposit_token: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<()> {
        self.only_handler(ctx)?;
        self.unstake_inner(ledger, account, deposit_token, amount, receiver, ctx.now)
    }

    /// Claim the caller's rewards. Disabled in private claiming mode.
    pub fn claim(&mut self, ctx: &CallContext, ledger: &mut TokenLedger, receiver: Address) -> Result<Amount> {
        if self.in_private_claiming_mode {
            return Err(StakeError::Forbidden(format!(
                "{}: claiming is private",
                self.info.symbol
            )));
        }
        self.claim_inner(ledger, ctx.caller, receiver, ctx.now)
    }

    pub fn claim_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
        receiver: Address,
    ) -> Result<Amount> {
        self.only_handler(ctx)?;
        self.claim_inner(ledger, account, receiver, ctx.now)
    }

    /// Settle the global index and, if given, one account.
    pub fn update_rewards(
        &mut self,
        ledger: &mut TokenLedger,
        account: Option<Address>,
        now: Timestamp,
    ) -> Result<()> {
        let supply = self.reward_supply(ledger);
        let distributor = self.initialized_distributor_mut()?;
        let block_reward = distributor.distribute(ledger, supply, now)?;

        let mut cumulative = self.cumulative_reward_per_token;
        if !supply.is_zero() && !block_reward.is_zero() {
            let delta = math::mul_div(block_reward, PRECISION, supply)?;
            cumulative = math::add(cumulative, delta, "cumulative reward per token")?;
            self.cumulative_reward_per_token = cumulative;
        }

        if cumulative.is_zero() {
            return Ok(());
        }
        if let Some(account) = account {
            self.settle_account(&account, cumulative)?;
        }
        Ok(())
    }

    fn settle_account(&mut self, account: &Address, cumulative: U256) -> Result<()> {
        let staked = get(&self.staked_amounts, account);
        let weight = self.weighting.reward_weight(account, staked);
        let previous = get(&self.previous_cumulated_reward_per_token, account);
        let index_delta = math::sub(cumulative, previous, "reward index delta")?;
        let account_reward = math::mul_div(weight, index_delta, PRECISION)?;

        let claimable = math::add(
            get(&self.claimable_reward, account),
            account_reward,
            "claimable reward",
        )?;
        self.claimable_reward.insert(*account, claimable);
        self.previous_cumulated_reward_per_token
            .insert(*account, cumulative);

        if !account_reward.is_zero() {
            let cumulative_reward = get(&self.cumulative_rewards, account);
            let next_cumulative_reward =
                math::add(cumulative_reward, account_reward, "cumulative rewards")?;
            let average = get(&self.average_staked_amounts, account);
            let next_average = math::add(
                math::mul_div(average, cumulative_reward, next_cumulative_reward)?,
                math::mul_div(staked, account_reward, next_cumulative_reward)?,
                "average staked amount",
            )?;
            self.average_staked_amounts.insert(*account, next_average);
            self.cumulative_rewards
                .insert(*account, next_cumulative_reward);
        }
        Ok(())
    }

    fn stake_inner(
        &mut self,
        ledger: &mut TokenLedger,
        funding_account: Address,
        account: Address,
        deposit_token: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        self.ensure_initialized()?;
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount(format!(
                "{}: cannot stake zero",
                self.info.symbol
            )));
        }
        if !self.is_deposit_token.contains(&deposit_token) {
            return Err(StakeError::InvalidDepositToken(format!(
                "{} does not accept {}",
                self.info.symbol, deposit_token
            )));
        }

        ledger.transfer_from(&deposit_token, self.address, funding_account, self.address, amount)?;
        self.update_rewards(ledger, Some(account), now)?;

        let staked = math::add(get(&self.staked_amounts, &account), amount, "staked amount")?;
        let deposits = self.deposit_balances.entry(account).or_default();
        let deposit = math::add(get(deposits, &deposit_token), amount, "deposit balance")?;
        let total = math::add(
            get(&self.total_deposit_supply, &deposit_token),
            amount,
            "total deposit supply",
        )?;
        deposits.insert(deposit_token, deposit);
        self.staked_amounts.insert(account, staked);
        self.total_deposit_supply.insert(deposit_token, total);
        self.rebalance(&account)?;

        ledger.mint(&self.address, self.address, account, amount)?;
        debug!(
            tracker = %self.address,
            account = %account,
            token = %deposit_token,
            amount = %amount,
            "staked"
        );
        Ok(())
    }

    fn unstake_inner(
        &mut self,
        ledger: &mut TokenLedger,
        account: Address,
        deposit_token: Address,
        amount: Amount,
        receiver: Address,
        now: Timestamp,
    ) -> Result<()> {
        self.ensure_initialized()?;
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount(format!(
                "{}: cannot unstake zero",
                self.info.symbol
            )));
        }
        let staked = get(&self.staked_amounts, &account);
        if staked < amount {
            return Err(StakeError::ExceedsStakedAmount(format!(
                "{}: requested {} but {} has {} staked",
                self.info.symbol, amount, account, staked
            )));
        }
        let deposit = self.deposit_balance(&account, &deposit_token);
        if deposit < amount {
            return Err(StakeError::ExceedsDepositBalance(format!(
                "{}: requested {} but {} has deposited {} of {}",
                self.info.symbol, amount, account, deposit, deposit_token
            )));
        }
        ledger.check_burn(&self.address, self.address, &account, amount)?;
        ledger.check_transfer(&deposit_token, self.address, amount)?;

        self.update_rewards(ledger, Some(account), now)?;

        let total = math::sub(
            get(&self.total_deposit_supply, &deposit_token),
            amount,
            "total deposit supply",
        )?;
        self.staked_amounts
            .insert(account, math::sub(staked, amount, "staked amount")?);
        self.deposit_balances
            .entry(account)
            .or_default()
            .insert(deposit_token, math::sub(deposit, amount, "deposit balance")?);
        self.total_deposit_supply.insert(deposit_token, total);
        self.rebalance(&account)?;

        ledger.burn(&self.address, self.address, account, amount)?;
        ledger.transfer(&deposit_token, self.address, receiver, amount)?;
        debug!(
            tracker = %self.address,
            account = %account,
            token = %deposit_token,
            amount = %amount,
            "unstaked"
        );
        Ok(())
    }

    fn claim_inner(
        &mut self,
        ledger: &mut TokenLedger,
        account: Address,
        receiver: Address,
        now: Timestamp,
    ) -> Result<Amount> {
        let reward_token = self.initialized_distributor()?.reward_token();
        self.update_rewards(ledger, Some(account), now)?;

        let amount = get(&self.claimable_reward, &account);
        if amount.is_zero() {
            return Ok(amount);
        }
        ledger.transfer(&reward_token, self.address, receiver, amount)?;
        self.claimable_reward.insert(account, Amount::ZERO);
        debug!(tracker = %self.address, account = %account, amount = %amount, "claimed");
        self.events.push(ProtocolEvent::Claim {
            tracker: self.address,
            account,
            receiver,
            amount,
        });
        Ok(amount)
    }

    fn rebalance(&mut self, account: &Address) -> Result<()> {
        let empty = HashMap::new();
        let deposits = self.deposit_balances.get(account).unwrap_or(&empty);
        self.weighting.rebalance(account, deposits)
    }

    // -----------------------------------------------------------------------
    // Share token
    // -----------------------------------------------------------------------

    /// Move the caller's shares. Staked amounts do not follow the shares.
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        recipient: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_initialized()?;
        ledger.transfer(&self.address, ctx.caller, recipient, amount)
    }

    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        from: Address,
        recipient: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_initialized()?;
        ledger.transfer_from(&self.address, ctx.caller, from, recipient, amount)
    }

    pub fn approve(
        &self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_initialized()?;
        ledger.approve(&self.address, ctx.caller, spender, amount)
    }

    pub fn balance_of(&self, ledger: &TokenLedger, account: &Address) -> Amount {
        ledger.balance_of(&self.address, account)
    }

    pub fn total_supply(&self, ledger: &TokenLedger) -> Amount {
        ledger.total_supply(&self.address)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Rewards `account` would hold after an `update_rewards` at `now`.
    pub fn claimable(&self, ledger: &TokenLedger, account: &Address, now: Timestamp) -> Result<Amount> {
        let stored = get(&self.claimable_reward, account);
        let staked = get(&self.staked_amounts, account);
        let weight = self.weighting.reward_weight(account, staked);
        let supply = self.reward_supply(ledger);
        let Some(distributor) = &self.distributor else {
            return Ok(stored);
        };
        if weight.is_zero() || supply.is_zero() {
            return Ok(stored);
        }
        let pending = distributor.pending_rewards(ledger, supply, now)?;
        let next_cumulative = math::add(
            self.cumulative_reward_per_token,
            math::mul_div(pending, PRECISION, supply)?,
            "cumulative reward per token",
        )?;
        let previous = get(&self.previous_cumulated_reward_per_token, account);
        let unsettled = math::mul_div(
            weight,
            math::sub(next_cumulative, previous, "reward index delta")?,
            PRECISION,
        )?;
        math::add(stored, unsettled, "claimable reward")
    }

    /// Supply that shares each distribution.
    pub fn reward_supply(&self, ledger: &TokenLedger) -> Amount {
        self.weighting
            .reward_supply(ledger.total_supply(&self.address))
    }

    /// Current per-second emission into this tracker.
    pub fn tokens_per_interval(&self, ledger: &TokenLedger) -> Result<Amount> {
        self.initialized_distributor()?
            .tokens_per_interval(self.reward_supply(ledger))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn gov(&self) -> Address {
        self.gov
    }

    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    pub fn weighting(&self) -> &W {
        &self.weighting
    }

    pub(crate) fn weighting_mut(&mut self) -> &mut W {
        &mut self.weighting
    }

    pub fn distributor(&self) -> Option<&RewardDistributor> {
        self.distributor.as_ref()
    }

    pub fn reward_token(&self) -> Option<Address> {
        self.distributor.as_ref().map(|d| d.reward_token())
    }

    pub fn is_initialized(&self) -> bool {
        self.distributor.is_some()
    }

    pub fn is_deposit_token(&self, token: &Address) -> bool {
        self.is_deposit_token.contains(token)
    }

    pub fn is_handler(&self, account: &Address) -> bool {
        self.handlers.contains(account)
    }

    pub fn in_private_transfer_mode(&self) -> bool {
        self.in_private_transfer_mode
    }

    pub fn in_private_staking_mode(&self) -> bool {
        self.in_private_staking_mode
    }

    pub fn in_private_claiming_mode(&self) -> bool {
        self.in_private_claiming_mode
    }

    pub fn cumulative_reward_per_token(&self) -> U256 {
        self.cumulative_reward_per_token
    }

    pub fn previous_cumulated_reward_per_token(&self, account: &Address) -> U256 {
        get(&self.previous_cumulated_reward_per_token, account)
    }

    pub fn staked_amount(&self, account: &Address) -> Amount {
        get(&self.staked_amounts, account)
    }

    pub fn deposit_balance(&self, account: &Address, deposit_token: &Address) -> Amount {
        self.deposit_balances
            .get(account)
            .map(|deposits| get(deposits, deposit_token))
            .unwrap_or_default()
    }

    pub fn total_deposit_supply(&self, deposit_token: &Address) -> Amount {
        get(&self.total_deposit_supply, deposit_token)
    }

    pub fn cumulative_rewards(&self, account: &Address) -> Amount {
        get(&self.cumulative_rewards, account)
    }

    pub fn average_staked_amount(&self, account: &Address) -> Amount {
        get(&self.average_staked_amounts, account)
    }

    /// Every account with a recorded stake, in no particular order.
    pub fn stakers(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.staked_amounts.iter()
    }

    /// Every (account, token, balance) deposit entry, in no particular order.
    pub fn deposits(&self) -> impl Iterator<Item = (&Address, &Address, &Amount)> {
        self.deposit_balances.iter().flat_map(|(account, deposits)| {
            deposits
                .iter()
                .map(move |(token, balance)| (account, token, balance))
        })
    }

    /// Drain buffered events, the distributor's included.
    pub fn take_events(&mut self) -> Vec<ProtocolEvent> {
        let mut events = self
            .distributor
            .as_mut()
            .map(|d| d.take_events())
            .unwrap_or_default();
        events.append(&mut self.events);
        events
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    fn only_gov(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.gov {
            return Err(StakeError::Forbidden(format!(
                "{}: caller {} is not gov",
                self.info.symbol, ctx.caller
            )));
        }
        Ok(())
    }

    fn only_handler(&self, ctx: &CallContext) -> Result<()> {
        if !self.handlers.contains(&ctx.caller) {
            return Err(StakeError::Forbidden(format!(
                "{}: caller {} is not a handler",
                self.info.symbol, ctx.caller
            )));
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<()> {
        self.initialized_distributor().map(|_| ())
    }

    fn initialized_distributor(&self) -> Result<&RewardDistributor> {
        self.distributor.as_ref().ok_or_else(|| {
            StakeError::NotInitialized(format!("tracker {} ({})", self.info.symbol, self.address))
        })
    }

    fn initialized_distributor_mut(&mut self) -> Result<&mut RewardDistributor> {
        let (symbol, address) = (&self.info.symbol, self.address);
        self.distributor.as_mut().ok_or_else(|| {
            StakeError::NotInitialized(format!("tracker {} ({})", symbol, address))
        })
    }
}

impl<W: StakeWeighting> TrackerView for Tracker<W> {
    fn address(&self) -> Address {
        self.address
    }

    fn cumulative_rewards(&self, account: &Address) -> Amount {
        Tracker::cumulative_rewards(self, account)
    }

    fn average_staked_amount(&self, account: &Address) -> Amount {
        Tracker::average_staked_amount(self, account)
    }
}

impl<W: StakeWeighting> StakeableLedger for Tracker<W> {
    fn stake_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        funding_account: Address,
        account: Address,
        deposit_token: Address,
        amount: Amount,
    ) -> Result<()> {
        Tracker::stake_for_account(self, ctx, ledger, funding_account, account, deposit_token, amount)
    }

    fn unstake_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
        deposit_token: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<()> {
        Tracker::unstake_for_account(self, ctx, ledger, account, deposit_token, amount, receiver)
    }

    fn claim_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
        receiver: Address,
    ) -> Result<Amount> {
        Tracker::claim_for_account(self, ctx, ledger, account, receiver)
    }

    fn staked_amount(&self, account: &Address) -> Amount {
        Tracker::staked_amount(self, account)
    }

    fn deposit_balance(&self, account: &Address, deposit_token: &Address) -> Amount {
        Tracker::deposit_balance(self, account, deposit_token)
    }
}
