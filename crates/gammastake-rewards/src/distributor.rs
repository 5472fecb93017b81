// crates/gammastake-rewards/src/distributor.rs
//
// Reward emission clock feeding exactly one tracker.
//
// Two emission schedules share one state machine {Active, Paused}:
//   - Flat:  tokens_per_interval * elapsed
//   - Bonus: staked_supply * bps / 10_000 / SECONDS_PER_YEAR * elapsed
//
// Emission is always clamped to the reward tokens the distributor holds, so
// a drained distributor pays out what it has and never goes insolvent.
// While paused the clock is frozen; resuming restarts it at "now", so no
// backlog accrues for the paused interval.
//
// Rate changes and pausing go through the owning tracker, which settles
// pending rewards at the old rate first. Those setters are crate-private.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gammastake_core::{
    math, Address, Amount, BasisPoints, CallContext, ProtocolEvent, Result, StakeError, Timestamp,
    TokenLedger, U256, BASIS_POINTS_DIVISOR, MAX_BONUS_MULTIPLIER_BPS, SECONDS_PER_YEAR,
};

/// How a distributor computes its per-second rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Emission {
    /// Fixed number of reward tokens per second.
    Flat { tokens_per_interval: Amount },
    /// Annualized percentage of the tracker's staked supply.
    Bonus { bonus_multiplier_basis_points: BasisPoints },
}

impl Emission {
    /// Per-second emission given the tracker's current staked supply.
    pub fn tokens_per_interval(&self, staked_supply: Amount) -> Result<Amount> {
        match *self {
            Emission::Flat {
                tokens_per_interval,
            } => Ok(tokens_per_interval),
            Emission::Bonus {
                bonus_multiplier_basis_points,
            } => {
                let annual = math::mul_div(
                    staked_supply,
                    U256::from(bonus_multiplier_basis_points),
                    U256::from(BASIS_POINTS_DIVISOR),
                )?;
                Ok(annual / U256::from(SECONDS_PER_YEAR))
            }
        }
    }
}

/// Emits one reward token into one tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardDistributor {
    address: Address,
    gov: Address,
    reward_token: Address,
    reward_tracker: Address,
    emission: Emission,
    last_distribution_time: Timestamp,
    paused: bool,
    events: Vec<ProtocolEvent>,
}

impl RewardDistributor {
    /// Create an active distributor whose clock starts at `now`.
    pub fn new(
        address: Address,
        gov: Address,
        reward_token: Address,
        reward_tracker: Address,
        emission: Emission,
        now: Timestamp,
    ) -> Self {
        Self {
            address,
            gov,
            reward_token,
            reward_tracker,
            emission,
            last_distribution_time: now,
            paused: false,
            events: Vec::new(),
        }
    }

    /// Flat-rate distributor starting at zero tokens per second.
    pub fn flat(
        address: Address,
        gov: Address,
        reward_token: Address,
        reward_tracker: Address,
        now: Timestamp,
    ) -> Self {
        Self::new(
            address,
            gov,
            reward_token,
            reward_tracker,
            Emission::Flat {
                tokens_per_interval: Amount::ZERO,
            },
            now,
        )
    }

    /// Bonus distributor starting at a zero multiplier.
    pub fn bonus(
        address: Address,
        gov: Address,
        reward_token: Address,
        reward_tracker: Address,
        now: Timestamp,
    ) -> Self {
        Self::new(
            address,
            gov,
            reward_token,
            reward_tracker,
            Emission::Bonus {
                bonus_multiplier_basis_points: 0,
            },
            now,
        )
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn gov(&self) -> Address {
        self.gov
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn reward_tracker(&self) -> Address {
        self.reward_tracker
    }

    pub fn emission(&self) -> Emission {
        self.emission
    }

    pub fn last_distribution_time(&self) -> Timestamp {
        self.last_distribution_time
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Current per-second rate for the given staked supply.
    pub fn tokens_per_interval(&self, staked_supply: Amount) -> Result<Amount> {
        self.emission.tokens_per_interval(staked_supply)
    }

    /// Rewards owed to the tracker since the last distribution, ignoring
    /// how much the distributor actually holds. Nothing is owed to an empty
    /// tracker.
    fn owed(&self, staked_supply: Amount, now: Timestamp) -> Result<Amount> {
        if self.paused || staked_supply.is_zero() {
            return Ok(Amount::ZERO);
        }
        let elapsed = now.saturating_sub(self.last_distribution_time);
        if elapsed == 0 {
            return Ok(Amount::ZERO);
        }
        let rate = self.tokens_per_interval(staked_supply)?;
        rate.checked_mul(U256::from(elapsed)).ok_or_else(|| {
            StakeError::ArithmeticOverflow(format!(
                "pending rewards: {} per second over {} seconds",
                rate, elapsed
            ))
        })
    }

    /// What `distribute` would move right now: the owed amount, clamped to
    /// the distributor's balance of the reward token.
    pub fn pending_rewards(
        &self,
        ledger: &TokenLedger,
        staked_supply: Amount,
        now: Timestamp,
    ) -> Result<Amount> {
        let owed = self.owed(staked_supply, now)?;
        let balance = ledger.balance_of(&self.reward_token, &self.address);
        Ok(owed.min(balance))
    }

    /// Reward-token balance not yet owed to the tracker.
    ///
    /// # Errors
    /// Returns `StakeError::InsufficientFunds` if the balance has fallen below
    /// what is already owed (e.g. after an external burn).
    pub fn max_withdrawable_amount(
        &self,
        ledger: &TokenLedger,
        staked_supply: Amount,
        now: Timestamp,
    ) -> Result<Amount> {
        let owed = self.owed(staked_supply, now)?;
        let balance = ledger.balance_of(&self.reward_token, &self.address);
        balance.checked_sub(owed).ok_or_else(|| {
            StakeError::InsufficientFunds(format!(
                "distributor {} holds {} but owes {}",
                self.address, balance, owed
            ))
        })
    }

    /// Move pending rewards into the tracker and advance the clock.
    ///
    /// Returns 0 without touching the clock while paused. With zero staked
    /// supply the clock still advances but nothing is transferred, so
    /// emission for an empty tracker is forfeited rather than back-paid.
    pub(crate) fn distribute(
        &mut self,
        ledger: &mut TokenLedger,
        staked_supply: Amount,
        now: Timestamp,
    ) -> Result<Amount> {
        if self.paused {
            return Ok(Amount::ZERO);
        }
        let amount = self.pending_rewards(ledger, staked_supply, now)?;
        if !amount.is_zero() {
            ledger.transfer(&self.reward_token, self.address, self.reward_tracker, amount)?;
            debug!(distributor = %self.address, amount = %amount, "distributed rewards");
            self.events.push(ProtocolEvent::Distribute {
                reward_tracker: self.reward_tracker,
                amount,
            });
        }
        self.last_distribution_time = self.last_distribution_time.max(now);
        Ok(amount)
    }

    pub fn only_gov(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.gov {
            return Err(StakeError::Forbidden(format!(
                "distributor {}: caller {} is not gov",
                self.address, ctx.caller
            )));
        }
        Ok(())
    }

    /// Validate a `set_tokens_per_interval` call without applying it.
    pub fn check_tokens_per_interval(&self, ctx: &CallContext) -> Result<()> {
        self.only_gov(ctx)?;
        match self.emission {
            Emission::Flat { .. } => Ok(()),
            Emission::Bonus { .. } => Err(StakeError::InvalidEmission(format!(
                "distributor {} uses bonus emission",
                self.address
            ))),
        }
    }

    /// Validate a `set_bonus_multiplier` call without applying it.
    pub fn check_bonus_multiplier(&self, ctx: &CallContext, basis_points: BasisPoints) -> Result<()> {
        self.only_gov(ctx)?;
        if !matches!(self.emission, Emission::Bonus { .. }) {
            return Err(StakeError::InvalidEmission(format!(
                "distributor {} uses flat emission",
                self.address
            )));
        }
        if basis_points > MAX_BONUS_MULTIPLIER_BPS {
            return Err(StakeError::InvalidMultiplier(format!(
                "{} exceeds the maximum of {}",
                basis_points, MAX_BONUS_MULTIPLIER_BPS
            )));
        }
        Ok(())
    }

    pub(crate) fn set_tokens_per_interval(&mut self, ctx: &CallContext, amount: Amount) -> Result<()> {
        self.check_tokens_per_interval(ctx)?;
        self.emission = Emission::Flat {
            tokens_per_interval: amount,
        };
        info!(distributor = %self.address, tokens_per_interval = %amount, "emission rate changed");
        self.events.push(ProtocolEvent::TokensPerIntervalChange {
            distributor: self.address,
            tokens_per_interval: amount,
        });
        Ok(())
    }

    pub(crate) fn set_bonus_multiplier(&mut self, ctx: &CallContext, basis_points: BasisPoints) -> Result<()> {
        self.check_bonus_multiplier(ctx, basis_points)?;
        self.emission = Emission::Bonus {
            bonus_multiplier_basis_points: basis_points,
        };
        info!(distributor = %self.address, basis_points, "bonus multiplier changed");
        self.events.push(ProtocolEvent::BonusMultiplierChange {
            distributor: self.address,
            basis_points,
        });
        Ok(())
    }

    /// Pause freezes the clock; resume restarts it at `ctx.now`.
    pub(crate) fn set_paused(&mut self, ctx: &CallContext, paused: bool) -> Result<()> {
        self.only_gov(ctx)?;
        if !paused {
            self.last_distribution_time = ctx.now;
        }
        self.paused = paused;
        info!(distributor = %self.address, paused, timestamp = ctx.now, "distributor status changed");
        self.events.push(ProtocolEvent::StatusChange {
            reward_tracker: self.reward_tracker,
            timestamp: ctx.now,
            paused,
        });
        Ok(())
    }

    pub(crate) fn update_last_distribution_time(&mut self, ctx: &CallContext) -> Result<()> {
        self.only_gov(ctx)?;
        self.last_distribution_time = ctx.now;
        Ok(())
    }

    /// Gov withdrawal of any token the distributor holds.
    ///
    /// Withdrawals of the reward token are capped by
    /// [`max_withdrawable_amount`](Self::max_withdrawable_amount).
    pub(crate) fn withdraw_token(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        token: Address,
        receiver: Address,
        amount: Amount,
        staked_supply: Amount,
    ) -> Result<()> {
        self.only_gov(ctx)?;
        if token == self.reward_token {
            let available = self.max_withdrawable_amount(ledger, staked_supply, ctx.now)?;
            if amount > available {
                return Err(StakeError::InsufficientFunds(format!(
                    "requested {} but only {} is withdrawable",
                    amount, available
                )));
            }
        }
        ledger.transfer(&token, self.address, receiver, amount)?;
        info!(distributor = %self.address, token = %token, amount = %amount, "withdrew token");
        Ok(())
    }

    /// Drain buffered events.
    pub fn take_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }
}
