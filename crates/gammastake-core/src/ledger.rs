// crates/gammastake-core/src/ledger.rs
//
// In-memory fungible token ledger.
//
// Every token in the system lives here: the base token (GS), escrowed
// rewards (esGS), bonus points (bnGS), fee rewards (WETH), pool LP tokens,
// and the share token of each reward tracker (keyed by the tracker's own
// address). Components hold custody by owning a balance under their address.
//
// Permission model per token:
//   - gov: the registering address; may manage minters, handlers, and the
//     private transfer flag.
//   - minters: may mint and burn.
//   - handlers: bypass allowances, and are the only callers able to move
//     tokens while the token is in private transfer mode.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StakeError};
use crate::math;
use crate::types::{Address, Amount, TOKEN_DECIMALS};

/// Descriptive metadata for a registered token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    /// Metadata with the protocol-wide default of 18 decimals.
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: TOKEN_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenState {
    info: TokenInfo,
    gov: Address,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    minters: HashSet<Address>,
    handlers: HashSet<Address>,
    in_private_transfer_mode: bool,
}

impl TokenState {
    fn balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or_default()
    }

    fn only_gov(&self, caller: &Address) -> Result<()> {
        if *caller != self.gov {
            return Err(StakeError::Forbidden(format!(
                "{}: caller {} is not gov",
                self.info.symbol, caller
            )));
        }
        Ok(())
    }

    fn only_minter(&self, caller: &Address) -> Result<()> {
        if !self.minters.contains(caller) {
            return Err(StakeError::Forbidden(format!(
                "{}: caller {} is not a minter",
                self.info.symbol, caller
            )));
        }
        Ok(())
    }

    fn check_private_mode(&self, caller: &Address) -> Result<()> {
        if self.in_private_transfer_mode && !self.handlers.contains(caller) {
            return Err(StakeError::Forbidden(format!(
                "{}: transfers are restricted to handlers",
                self.info.symbol
            )));
        }
        Ok(())
    }

    fn check_balance(&self, from: &Address, amount: Amount) -> Result<()> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(StakeError::InsufficientBalance(format!(
                "{}: amount {} exceeds balance {} of {}",
                self.info.symbol, amount, balance, from
            )));
        }
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        if from == to || amount.is_zero() {
            return Ok(());
        }
        let from_balance = math::sub(self.balance(from), amount, "sender balance")?;
        let to_balance = math::add(self.balance(to), amount, "recipient balance")?;
        self.balances.insert(*from, from_balance);
        self.balances.insert(*to, to_balance);
        Ok(())
    }
}

/// The FungibleToken capability for every token in the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    tokens: HashMap<Address, TokenState>,
}

impl TokenLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    /// Register a new token governed by `gov`.
    ///
    /// # Errors
    /// Returns `StakeError::AlreadyInitialized` if the address is taken.
    pub fn register_token(&mut self, token: Address, gov: Address, info: TokenInfo) -> Result<()> {
        if self.tokens.contains_key(&token) {
            return Err(StakeError::AlreadyInitialized(format!(
                "token {} ({}) is already registered",
                info.symbol, token
            )));
        }
        debug!(token = %token, symbol = %info.symbol, "registered token");
        self.tokens.insert(
            token,
            TokenState {
                info,
                gov,
                total_supply: Amount::ZERO,
                balances: HashMap::new(),
                allowances: HashMap::new(),
                minters: HashSet::new(),
                handlers: HashSet::new(),
                in_private_transfer_mode: false,
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    pub fn token_info(&self, token: &Address) -> Result<&TokenInfo> {
        Ok(&self.state(token)?.info)
    }

    pub fn set_minter(
        &mut self,
        token: &Address,
        caller: Address,
        minter: Address,
        active: bool,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        state.only_gov(&caller)?;
        if active {
            state.minters.insert(minter);
        } else {
            state.minters.remove(&minter);
        }
        Ok(())
    }

    pub fn set_handler(
        &mut self,
        token: &Address,
        caller: Address,
        handler: Address,
        active: bool,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        state.only_gov(&caller)?;
        if active {
            state.handlers.insert(handler);
        } else {
            state.handlers.remove(&handler);
        }
        Ok(())
    }

    pub fn set_in_private_transfer_mode(
        &mut self,
        token: &Address,
        caller: Address,
        mode: bool,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        state.only_gov(&caller)?;
        state.in_private_transfer_mode = mode;
        Ok(())
    }

    pub fn is_minter(&self, token: &Address, account: &Address) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|s| s.minters.contains(account))
    }

    pub fn is_handler(&self, token: &Address, account: &Address) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|s| s.handlers.contains(account))
    }

    pub fn in_private_transfer_mode(&self, token: &Address) -> bool {
        self.tokens
            .get(token)
            .is_some_and(|s| s.in_private_transfer_mode)
    }

    /// Balance of `account`; zero for unknown tokens or accounts.
    pub fn balance_of(&self, token: &Address, account: &Address) -> Amount {
        self.tokens
            .get(token)
            .map(|s| s.balance(account))
            .unwrap_or_default()
    }

    pub fn total_supply(&self, token: &Address) -> Amount {
        self.tokens
            .get(token)
            .map(|s| s.total_supply)
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        self.tokens
            .get(token)
            .map(|s| s.allowance(owner, spender))
            .unwrap_or_default()
    }

    /// Set `spender`'s allowance over `owner`'s balance, replacing any prior value.
    pub fn approve(
        &mut self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        let state = self.state_mut(token)?;
        state
            .allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
        Ok(())
    }

    /// Mint `amount` to `to`. Caller must be a minter.
    pub fn mint(&mut self, token: &Address, caller: Address, to: Address, amount: Amount) -> Result<()> {
        let state = self.state_mut(token)?;
        state.only_minter(&caller)?;
        let supply = math::add(state.total_supply, amount, "total supply")?;
        let balance = math::add(state.balance(&to), amount, "recipient balance")?;
        state.total_supply = supply;
        state.balances.insert(to, balance);
        Ok(())
    }

    /// Burn `amount` from `from`. Caller must be a minter.
    ///
    /// # Errors
    /// Returns `StakeError::InsufficientBalance` if `from` holds less than `amount`.
    pub fn burn(&mut self, token: &Address, caller: Address, from: Address, amount: Amount) -> Result<()> {
        self.check_burn(token, caller, &from, amount)?;
        let state = self.state_mut(token)?;
        let balance = math::sub(state.balance(&from), amount, "holder balance")?;
        let supply = math::sub(state.total_supply, amount, "total supply")?;
        state.balances.insert(from, balance);
        state.total_supply = supply;
        Ok(())
    }

    /// Validate a burn without performing it.
    pub fn check_burn(&self, token: &Address, caller: Address, from: &Address, amount: Amount) -> Result<()> {
        let state = self.state(token)?;
        state.only_minter(&caller)?;
        state.check_balance(from, amount)
    }

    /// Move `amount` from the caller's own balance to `to`.
    pub fn transfer(&mut self, token: &Address, caller: Address, to: Address, amount: Amount) -> Result<()> {
        self.check_transfer(token, caller, amount)?;
        self.state_mut(token)?.move_balance(&caller, &to, amount)
    }

    /// Validate a `transfer` without performing it.
    pub fn check_transfer(&self, token: &Address, caller: Address, amount: Amount) -> Result<()> {
        let state = self.state(token)?;
        state.check_private_mode(&caller)?;
        state.check_balance(&caller, amount)
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`.
    ///
    /// Handlers skip the allowance check; everyone else spends allowance.
    pub fn transfer_from(
        &mut self,
        token: &Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.check_transfer_from(token, spender, &from, amount)?;
        let state = self.state_mut(token)?;
        if !state.handlers.contains(&spender) {
            let remaining = math::sub(state.allowance(&from, &spender), amount, "allowance")?;
            state
                .allowances
                .entry(from)
                .or_default()
                .insert(spender, remaining);
        }
        state.move_balance(&from, &to, amount)
    }

    /// Validate a `transfer_from` without performing it.
    pub fn check_transfer_from(
        &self,
        token: &Address,
        spender: Address,
        from: &Address,
        amount: Amount,
    ) -> Result<()> {
        let state = self.state(token)?;
        state.check_private_mode(&spender)?;
        if !state.handlers.contains(&spender) {
            let allowance = state.allowance(from, &spender);
            if allowance < amount {
                return Err(StakeError::InsufficientAllowance(format!(
                    "{}: amount {} exceeds allowance {} granted by {} to {}",
                    state.info.symbol, amount, allowance, from, spender
                )));
            }
        }
        state.check_balance(from, amount)
    }

    fn state(&self, token: &Address) -> Result<&TokenState> {
        self.tokens
            .get(token)
            .ok_or_else(|| StakeError::TokenNotFound(token.to_string()))
    }

    fn state_mut(&mut self, token: &Address) -> Result<&mut TokenState> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| StakeError::TokenNotFound(token.to_string()))
    }
}
