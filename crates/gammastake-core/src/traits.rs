// crates/gammastake-core/src/traits.rs

use crate::error::Result;
use crate::ledger::TokenLedger;
use crate::types::{Address, Amount, CallContext};

/// Read-only view of a reward tracker's per-account history.
///
/// Implemented by gammastake-rewards trackers; consumed by vesters to
/// compute vesting ceilings and paired-stake requirements.
pub trait TrackerView {
    /// Address of the tracker (also the id of its share token).
    fn address(&self) -> Address;

    /// Lifetime rewards credited to `account` (claimed + claimable).
    fn cumulative_rewards(&self, account: &Address) -> Amount;

    /// Reward-weighted average of `account`'s historical stake.
    fn average_staked_amount(&self, account: &Address) -> Amount;
}

/// A tier that accepts deposits and issues shares.
///
/// Implemented by gammastake-rewards trackers. The router sequences tiers
/// through this trait: each tier's share token is a deposit token of the
/// next tier, and no tier ever calls another directly.
pub trait StakeableLedger: TrackerView {
    /// Pull `amount` of `deposit_token` from `funding_account` and credit it
    /// to `account`.
    fn stake_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        funding_account: Address,
        account: Address,
        deposit_token: Address,
        amount: Amount,
    ) -> Result<()>;

    /// Debit `account` and send `amount` of `deposit_token` to `receiver`.
    fn unstake_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
        deposit_token: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<()>;

    /// Pay out everything `account` has accrued. Returns the amount paid.
    fn claim_for_account(
        &mut self,
        ctx: &CallContext,
        ledger: &mut TokenLedger,
        account: Address,
        receiver: Address,
    ) -> Result<Amount>;

    fn staked_amount(&self, account: &Address) -> Amount;

    fn deposit_balance(&self, account: &Address, deposit_token: &Address) -> Amount;
}
