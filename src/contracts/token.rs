//! ERC20-style token bookkeeping for one chain

use super::error::{ContractError, ContractResult};

use ethers::types::{Address, U256};
use std::collections::HashMap;

/// Balances and allowances of every token on a chain
#[derive(Debug, Clone, Default)]
pub struct TokenBook {
    /// (token, holder) -> balance
    balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender) -> allowance
    allowances: HashMap<(Address, Address, Address), U256>,
}

impl TokenBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Create `amount` new units for `to`
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> ContractResult<()> {
        let balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        self.balances.insert((token, to), balance);
        Ok(())
    }

    /// Set the allowance of `spender` over `owner`'s tokens
    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((token, owner, spender), amount);
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> ContractResult<()> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(ContractError::InsufficientTokenBalance {
                token,
                holder: from,
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        self.balances.insert((token, from), available - amount);
        self.balances.insert((token, to), credited);
        Ok(())
    }

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> ContractResult<()> {
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(ContractError::InsufficientAllowance {
                token,
                spender,
                available: allowed,
                required: amount,
            });
        }
        self.transfer(token, from, to, amount)?;
        if allowed != U256::MAX {
            self.allowances
                .insert((token, from, spender), allowed - amount);
        }
        Ok(())
    }
}
