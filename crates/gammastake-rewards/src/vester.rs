// crates/gammastake-rewards/src/vester.rs
//
// Linear vesting of escrowed reward tokens into the claimable token.
//
// An account deposits escrow tokens; from then on the principal vests
// linearly over `vesting_duration`, at a rate set by the account's total
// vested amount (outstanding balance plus everything already vested).
// Vested escrow is burned and becomes claimable 1:1 in the claimable token.
//
// Two optional constraints tie vesting to staking:
//   - A cap (VestingCap) on how much an account may ever vest, usually the
//     rewards it earned on a reference tracker.
//   - A paired stake: while vesting, an account locks
//     `balance * average_staked / max_vestable` of the pair token in the
//     vester, so it cannot vest rewards and also sell the stake that earned
//     them.
//
// The reference tracker is passed in by the caller on each operation and
// must match the configured `reward_tracker`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gammastake_core::{
    math, Address, Amount, CallContext, ProtocolEvent, Result, StakeError, Timestamp, TokenLedger,
    TrackerView, U256,
};

/// Ceiling on how much an account may vest over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VestingCap {
    /// No ceiling.
    Unlimited,
    /// `bonus_rewards - deductions`, both set by handlers.
    BonusRewards,
    /// `tracker.cumulative_rewards + bonus_rewards - deductions`.
    RewardTracker,
}

/// Construction parameters for a [`Vester`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesterConfig {
    pub address: Address,
    pub gov: Address,
    pub name: String,
    pub symbol: String,
    /// Seconds for a deposit to vest in full.
    pub vesting_duration: u64,
    pub es_token: Address,
    pub claimable_token: Address,
    pub pair_token: Option<Address>,
    pub reward_tracker: Option<Address>,
    pub cap: VestingCap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vester {
    address: Address,
    gov: Address,
    name: String,
    symbol: String,
    vesting_duration: u64,
    es_token: Address,
    claimable_token: Address,
    pair_token: Option<Address>,
    reward_tracker: Option<Address>,
    cap: VestingCap,
    handlers: HashSet<Address>,
    total_supply: Amount,
    pair_supply: Amount,
    balances: HashMap<Address, Amount>,
    cumulative_claim_amounts: HashMap<Address, Amount>,
    claimed_amounts: HashMap<Address, Amount>,
    pair_amounts: HashMap<Address, Amount>,
    last_vesting_times: HashMap<Address, Timestamp>,
    bonus_rewards: HashMap<Address, Amount>,
    cumulative_reward_deductions: HashMap<Address, Amount>,
    events: Vec<ProtocolEvent>,
}

fn get(map: &HashMap<Address, Amount>, account: &Address) -> Amount {
    map.get(account).copied().unwrap_or_default()
}

impl Vester {
    /// Build a vester from its configuration.
    ///
    /// # Errors
    /// Returns `StakeError::Config` for a zero vesting duration, or for a
    /// `VestingCap::RewardTracker` cap without a reward tracker.
    pub fn new(config: VesterConfig) -> Result<Self> {
        if config.vesting_duration == 0 {
            return Err(StakeError::Config(format!(
                "vester {}: vesting duration must be positive",
                config.symbol
            )));
        }
        if config.cap == VestingCap::RewardTracker && config.reward_tracker.is_none() {
            return Err(StakeError::Config(format!(
                "vester {}: reward tracker cap needs a reward tracker",
                config.symbol
            )));
        }
        Ok(Self {
            address: config.address,
            gov: config.gov,
            name: config.name,
            symbol: config.symbol,
            vesting_duration: config.vesting_duration,
            es_token: config.es_token,
            claimable_token: config.claimable_token,
            pair_token: config.pair_token,
            reward_tracker: config.reward_tracker,
            cap: config.cap,
            handlers: HashSet::new(),
            total_supply: Amount::ZERO,
            pair_supply: Amount::ZERO,
            balances: HashMap::new(),
            cumulative_claim_amounts: HashMap::new(),
            claimed_amounts: HashMap::new(),
            pair_amounts: HashMap::new(),
            last_vesting_times: HashMap::new(),
            bonus_rewards: HashMap::new(),
            cumulative_reward_deductions: HashMap::new(),
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    pub fn set_handler(&mut self, ctx: &CallContext, handler: Address, active: bool) -> Result<()> {
        self.only_gov(ctx)?;
        if active {
            self.handlers.insert(handler);
        } else {
            self.handlers.remove(&handler);
        }
        Ok(())
    }

    pub fn set_bonus_rewards(&mut self, ctx: &CallContext, account: Address, amount: Amount) -> Result<()> {
        self.only_handler(ctx)?;
        self.bonus_rewards.insert(account, amount);
        info!(vester = %self.address, account = %account, amount = %amount, "bonus rewards set");
        Ok(())
    }

    pub fn set_cumulative_reward_deductions(
        &mut self,
        ctx: &CallContext,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        self.only_handler(ctx)?;
        self.cumulative_reward_deductions.insert(account, amount);
        info!(vester = %self.address, account = %account, amount = %amount, "reward deductions set");
        Ok(())
    }

    /// Claimable-token balance not committed to current or future payouts.
    ///
    /// # Errors
    /// Returns `StakeError::InsufficientFunds` if the vester holds less than
    /// it has committed.
    pub fn max_withdrawable_amount(&self, ledger: &TokenLedger) -> Result<Amount> {
        let mut committed = self.total_supply;
        for (account, cumulative) in &self.cumulative_claim_amounts {
            let unclaimed = math::sub(*cumulative, get(&self.claimed_amounts, account), "unclaimed amount")?;
            committed = math::add(committed, unclaimed, "committed amount")?;
        }
        let held = ledger.balance_of(&self.claimable_token, &self.address);
        held.checked_sub(committed).ok_or_else(|| {
            StakeError::InsufficientFunds(format!(
                "vester {} holds {} but has committed {}",
                self.symbol, held, committed
            ))
        })
    }

    /// Gov withdrawal of stray tokens. Custody tokens cannot be withdrawn
    /// and the claimable token is capped by `max_withdrawable_amount`.
    pub fn withdraw_token(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        token: Address,
        receiver: Address,
        amount: Amount,
    ) -> Result<()> {
        self.only_gov(ctx)?;
        if token == self.es_token || Some(token) == self.pair_token {
            return Err(StakeError::Forbidden(format!(
                "vester {}: {} is held in custody",
                self.symbol, token
            )));
        }
        if token == self.claimable_token {
            let available = self.max_withdrawable_amount(ledger)?;
            if amount > available {
                return Err(StakeError::InsufficientFunds(format!(
                    "requested {} but only {} is withdrawable",
                    amount, available
                )));
            }
        }
        ledger.transfer(&token, self.address, receiver, amount)?;
        info!(vester = %self.address, token = %token, amount = %amount, "withdrew token");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Vesting
    // -----------------------------------------------------------------------

    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        reference: Option<&dyn TrackerView>,
        amount: Amount,
    ) -> Result<()> {
        self.deposit_inner(ledger, reference, ctx.caller, amount, ctx.now)
    }

    /// Handler-only deposit of `account`'s escrow tokens.
    pub fn deposit_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        reference: Option<&dyn TrackerView>,
        account: Address,
        amount: Amount,
    ) -> Result<()> {
        self.only_handler(ctx)?;
        self.deposit_inner(ledger, reference, account, amount, ctx.now)
    }

    pub fn claim(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        reference: Option<&dyn TrackerView>,
        receiver: Address,
    ) -> Result<Amount> {
        self.claim_inner(ledger, reference, ctx.caller, receiver, ctx.now)
    }

    pub fn claim_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        reference: Option<&dyn TrackerView>,
        account: Address,
        receiver: Address,
    ) -> Result<Amount> {
        self.only_handler(ctx)?;
        self.claim_inner(ledger, reference, account, receiver, ctx.now)
    }

    /// Leave the vester: pay out what has vested, refund the remaining
    /// escrow and the whole paired stake, and forget the account.
    pub fn withdraw(&mut self, ctx: &CallContext, ledger: &mut TokenLedger) -> Result<()> {
        self.withdraw_inner(ledger, ctx.caller, ctx.now)
    }

    pub fn withdraw_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
    ) -> Result<()> {
        self.only_handler(ctx)?;
        self.withdraw_inner(ledger, account, ctx.now)
    }

    fn deposit_inner(
        &mut self,
        ledger: &mut TokenLedger,
        reference: Option<&dyn TrackerView>,
        account: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(StakeError::InvalidAmount(format!(
                "vester {}: cannot deposit zero",
                self.symbol
            )));
        }
        let reference = self.resolve(reference)?;

        let vested = self.vested_since_last(&account, now)?;
        let balance = math::sub(self.balance_of(&account), vested, "vester balance")?;
        let next_balance = math::add(balance, amount, "vester balance")?;
        let next_pair = match self.pair_token {
            Some(_) => self.pair_amount_for(reference, &account, next_balance)?,
            None => Amount::ZERO,
        };
        if let Some(pair_token) = self.pair_token {
            let current = self.pair_amount(&account);
            if next_pair > current {
                ledger.check_transfer_from(&pair_token, self.address, &account, next_pair - current)?;
            }
        }

        if self.cap != VestingCap::Unlimited {
            let next_total = math::add(self.total_vested(&account), amount, "total vested")?;
            let max = self.max_vestable_for(reference, &account);
            if next_total > max {
                return Err(StakeError::MaxVestableExceeded(format!(
                    "vester {}: {} would vest {} of at most {}",
                    self.symbol, account, next_total, max
                )));
            }
        }

        ledger.transfer_from(&self.es_token, self.address, account, self.address, amount)?;
        self.update_vesting(ledger, &account, now)?;
        self.balances.insert(account, next_balance);
        self.total_supply = math::add(self.total_supply, amount, "vester supply")?;
        self.sync_pair(ledger, &account, next_pair)?;

        debug!(vester = %self.address, account = %account, amount = %amount, "deposited");
        self.events.push(ProtocolEvent::VesterDeposit {
            vester: self.address,
            account,
            amount,
        });
        Ok(())
    }

    fn claim_inner(
        &mut self,
        ledger: &mut TokenLedger,
        reference: Option<&dyn TrackerView>,
        account: Address,
        receiver: Address,
        now: Timestamp,
    ) -> Result<Amount> {
        let reference = self.resolve(reference)?;
        let amount = self.claimable(&account, now)?;
        ledger.check_transfer(&self.claimable_token, self.address, amount)?;

        let vested = self.vested_since_last(&account, now)?;
        let next_balance = math::sub(self.balance_of(&account), vested, "vester balance")?;
        let next_pair = self.pair_amount_for(reference, &account, next_balance)?;

        self.update_vesting(ledger, &account, now)?;
        let claimed = math::add(self.claimed_amount(&account), amount, "claimed amount")?;
        self.claimed_amounts.insert(account, claimed);
        ledger.transfer(&self.claimable_token, self.address, receiver, amount)?;
        if next_pair < self.pair_amount(&account) {
            self.sync_pair(ledger, &account, next_pair)?;
        }

        if !amount.is_zero() {
            debug!(vester = %self.address, account = %account, amount = %amount, "claimed");
            self.events.push(ProtocolEvent::VesterClaim {
                vester: self.address,
                receiver,
                amount,
            });
        }
        Ok(amount)
    }

    fn withdraw_inner(&mut self, ledger: &mut TokenLedger, account: Address, now: Timestamp) -> Result<()> {
        if self.total_vested(&account).is_zero() {
            return Err(StakeError::InvalidAmount(format!(
                "vester {}: nothing vesting for {}",
                self.symbol, account
            )));
        }
        let claim_amount = self.claimable(&account, now)?;
        ledger.check_transfer(&self.claimable_token, self.address, claim_amount)?;

        self.update_vesting(ledger, &account, now)?;
        let balance = self.balance_of(&account);
        let pair = self.pair_amount(&account);

        ledger.transfer(&self.claimable_token, self.address, account, claim_amount)?;
        ledger.transfer(&self.es_token, self.address, account, balance)?;
        if let Some(pair_token) = self.pair_token {
            if !pair.is_zero() {
                ledger.transfer(&pair_token, self.address, account, pair)?;
                self.pair_supply = math::sub(self.pair_supply, pair, "pair supply")?;
                self.events.push(ProtocolEvent::PairTransfer {
                    vester: self.address,
                    from: self.address,
                    to: account,
                    amount: pair,
                });
            }
        }
        self.total_supply = math::sub(self.total_supply, balance, "vester supply")?;

        let claimed = math::add(self.claimed_amount(&account), claim_amount, "claimed amount")?;
        self.balances.remove(&account);
        self.cumulative_claim_amounts.remove(&account);
        self.claimed_amounts.remove(&account);
        self.pair_amounts.remove(&account);
        self.last_vesting_times.remove(&account);

        info!(
            vester = %self.address,
            account = %account,
            claimed = %claimed,
            refunded = %balance,
            "withdrew from vesting"
        );
        if !claim_amount.is_zero() {
            self.events.push(ProtocolEvent::VesterClaim {
                vester: self.address,
                receiver: account,
                amount: claim_amount,
            });
        }
        self.events.push(ProtocolEvent::VesterWithdraw {
            vester: self.address,
            account,
            claimed_amount: claimed,
            balance,
        });
        Ok(())
    }

    /// Move vested escrow out of the balance and burn it.
    fn update_vesting(&mut self, ledger: &mut TokenLedger, account: &Address, now: Timestamp) -> Result<()> {
        let amount = self.vested_since_last(account, now)?;
        self.last_vesting_times.insert(*account, now);
        if amount.is_zero() {
            return Ok(());
        }
        let balance = math::sub(self.balance_of(account), amount, "vester balance")?;
        let cumulative = math::add(self.cumulative_claim_amount(account), amount, "cumulative claim")?;
        self.balances.insert(*account, balance);
        self.total_supply = math::sub(self.total_supply, amount, "vester supply")?;
        self.cumulative_claim_amounts.insert(*account, cumulative);
        ledger.burn(&self.es_token, self.address, self.address, amount)?;
        debug!(vester = %self.address, account = %account, amount = %amount, "vested");
        Ok(())
    }

    fn vested_since_last(&self, account: &Address, now: Timestamp) -> Result<Amount> {
        let balance = self.balance_of(account);
        if balance.is_zero() {
            return Ok(Amount::ZERO);
        }
        let last = self
            .last_vesting_times
            .get(account)
            .copied()
            .unwrap_or(now);
        let elapsed = now.saturating_sub(last);
        let vested = math::mul_div(
            self.total_vested(account),
            U256::from(elapsed),
            U256::from(self.vesting_duration),
        )?;
        Ok(vested.min(balance))
    }

    /// Pull the pair shortfall from `account` or return the excess.
    fn sync_pair(&mut self, ledger: &mut TokenLedger, account: &Address, next_pair: Amount) -> Result<()> {
        let Some(pair_token) = self.pair_token else {
            return Ok(());
        };
        let current = self.pair_amount(account);
        if next_pair > current {
            let diff = next_pair - current;
            ledger.transfer_from(&pair_token, self.address, *account, self.address, diff)?;
            self.pair_supply = math::add(self.pair_supply, diff, "pair supply")?;
            self.events.push(ProtocolEvent::PairTransfer {
                vester: self.address,
                from: *account,
                to: self.address,
                amount: diff,
            });
        } else if next_pair < current {
            let diff = current - next_pair;
            ledger.transfer(&pair_token, self.address, *account, diff)?;
            self.pair_supply = math::sub(self.pair_supply, diff, "pair supply")?;
            self.events.push(ProtocolEvent::PairTransfer {
                vester: self.address,
                from: self.address,
                to: *account,
                amount: diff,
            });
        } else {
            return Ok(());
        }
        if next_pair.is_zero() {
            self.pair_amounts.remove(account);
        } else {
            self.pair_amounts.insert(*account, next_pair);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Everything `account` could claim at `now`.
    pub fn claimable(&self, account: &Address, now: Timestamp) -> Result<Amount> {
        let unclaimed = math::sub(
            self.cumulative_claim_amount(account),
            self.claimed_amount(account),
            "unclaimed amount",
        )?;
        math::add(unclaimed, self.vested_since_last(account, now)?, "claimable amount")
    }

    /// Outstanding balance plus everything already vested.
    pub fn total_vested(&self, account: &Address) -> Amount {
        self.balance_of(account)
            .saturating_add(self.cumulative_claim_amount(account))
    }

    pub fn get_max_vestable_amount(
        &self,
        reference: Option<&dyn TrackerView>,
        account: &Address,
    ) -> Result<Amount> {
        let reference = self.resolve(reference)?;
        Ok(self.max_vestable_for(reference, account))
    }

    /// Pair tokens required to vest `es_amount` for `account`.
    pub fn get_pair_amount(
        &self,
        reference: Option<&dyn TrackerView>,
        account: &Address,
        es_amount: Amount,
    ) -> Result<Amount> {
        let reference = self.resolve(reference)?;
        self.pair_amount_for(reference, account, es_amount)
    }

    fn max_vestable_for(&self, reference: Option<&dyn TrackerView>, account: &Address) -> Amount {
        let mut max = get(&self.bonus_rewards, account);
        if self.cap == VestingCap::RewardTracker {
            if let Some(tracker) = reference {
                max = max.saturating_add(tracker.cumulative_rewards(account));
            }
        }
        max.saturating_sub(get(&self.cumulative_reward_deductions, account))
    }

    fn pair_amount_for(
        &self,
        reference: Option<&dyn TrackerView>,
        account: &Address,
        es_amount: Amount,
    ) -> Result<Amount> {
        let Some(tracker) = reference else {
            return Ok(Amount::ZERO);
        };
        let average = tracker.average_staked_amount(account);
        let max = self.max_vestable_for(reference, account);
        if average.is_zero() || max.is_zero() {
            return Ok(Amount::ZERO);
        }
        math::mul_div(es_amount, average, max)
    }

    fn resolve<'a>(&self, reference: Option<&'a dyn TrackerView>) -> Result<Option<&'a dyn TrackerView>> {
        match (self.reward_tracker, reference) {
            (None, _) => Ok(None),
            (Some(expected), Some(tracker)) if tracker.address() == expected => Ok(Some(tracker)),
            (Some(expected), _) => Err(StakeError::TrackerNotFound(format!(
                "vester {} expects reward tracker {}",
                self.symbol, expected
            ))),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn gov(&self) -> Address {
        self.gov
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn vesting_duration(&self) -> u64 {
        self.vesting_duration
    }

    pub fn es_token(&self) -> Address {
        self.es_token
    }

    pub fn claimable_token(&self) -> Address {
        self.claimable_token
    }

    pub fn pair_token(&self) -> Option<Address> {
        self.pair_token
    }

    pub fn reward_tracker(&self) -> Option<Address> {
        self.reward_tracker
    }

    pub fn cap(&self) -> VestingCap {
        self.cap
    }

    pub fn is_handler(&self, account: &Address) -> bool {
        self.handlers.contains(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn pair_supply(&self) -> Amount {
        self.pair_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        get(&self.balances, account)
    }

    pub fn cumulative_claim_amount(&self, account: &Address) -> Amount {
        get(&self.cumulative_claim_amounts, account)
    }

    pub fn claimed_amount(&self, account: &Address) -> Amount {
        get(&self.claimed_amounts, account)
    }

    pub fn pair_amount(&self, account: &Address) -> Amount {
        get(&self.pair_amounts, account)
    }

    pub fn last_vesting_time(&self, account: &Address) -> Timestamp {
        self.last_vesting_times
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    pub fn bonus_reward(&self, account: &Address) -> Amount {
        get(&self.bonus_rewards, account)
    }

    pub fn cumulative_reward_deduction(&self, account: &Address) -> Amount {
        get(&self.cumulative_reward_deductions, account)
    }

    pub fn take_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }

    fn only_gov(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.gov {
            return Err(StakeError::Forbidden(format!(
                "vester {}: caller {} is not gov",
                self.symbol, ctx.caller
            )));
        }
        Ok(())
    }

    fn only_handler(&self, ctx: &CallContext) -> Result<()> {
        if !self.handlers.contains(&ctx.caller) {
            return Err(StakeError::Forbidden(format!(
                "vester {}: caller {} is not a handler",
                self.symbol, ctx.caller
            )));
        }
        Ok(())
    }
}
