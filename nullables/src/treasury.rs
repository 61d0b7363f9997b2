//! Nullable treasury ledger — in-memory token balances.

use agora_governance::{TreasuryError, TreasuryLedger};
use agora_types::{Identity, TokenAmount};
use std::collections::HashMap;

/// An in-memory token ledger.
///
/// Balances start at zero; `mint` credits an account out of thin air.
/// `fail_transfers` makes every subsequent transfer fail, for exercising
/// error paths.
#[derive(Debug, Default)]
pub struct NullTreasury {
    balances: HashMap<Identity, TokenAmount>,
    fail_transfers: bool,
    transfers: Vec<(Identity, Identity, TokenAmount)>,
}

impl NullTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, account: &Identity, amount: TokenAmount) {
        let balance = self.balances.entry(account.clone()).or_default();
        *balance = balance.checked_add(amount).unwrap_or(*balance);
    }

    pub fn fail_transfers(&mut self, fail: bool) {
        self.fail_transfers = fail;
    }

    /// Every successful transfer, in order.
    pub fn transfers(&self) -> &[(Identity, Identity, TokenAmount)] {
        &self.transfers
    }
}

impl TreasuryLedger for NullTreasury {
    fn balance_of(&self, account: &Identity) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: &Identity,
        to: &Identity,
        amount: TokenAmount,
    ) -> Result<(), TreasuryError> {
        if self.fail_transfers {
            return Err(TreasuryError("transfers disabled".into()));
        }
        let from_balance = self.balance_of(from);
        let remaining = from_balance.checked_sub(amount).ok_or_else(|| {
            TreasuryError(format!("{from} holds {from_balance}, cannot send {amount}"))
        })?;
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TreasuryError(format!("balance of {to} would overflow")))?;

        self.balances.insert(from.clone(), remaining);
        self.balances.insert(to.clone(), credited);
        self.transfers.push((from.clone(), to.clone(), amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_balance() {
        let (a, b) = (Identity::new("a"), Identity::new("b"));
        let mut ledger = NullTreasury::new();
        ledger.mint(&a, TokenAmount::new(100));
        ledger.transfer(&a, &b, TokenAmount::new(40)).unwrap();
        assert_eq!(ledger.balance_of(&a), TokenAmount::new(60));
        assert_eq!(ledger.balance_of(&b), TokenAmount::new(40));
        assert_eq!(ledger.transfers().len(), 1);
    }

    #[test]
    fn overdraft_and_disabled_transfers_fail() {
        let (a, b) = (Identity::new("a"), Identity::new("b"));
        let mut ledger = NullTreasury::new();
        ledger.mint(&a, TokenAmount::new(10));
        assert!(ledger.transfer(&a, &b, TokenAmount::new(11)).is_err());
        ledger.fail_transfers(true);
        assert!(ledger.transfer(&a, &b, TokenAmount::new(1)).is_err());
        assert_eq!(ledger.balance_of(&a), TokenAmount::new(10));
    }

    #[test]
    fn transfer_error_is_a_std_error() {
        let (a, b) = (Identity::new("a"), Identity::new("b"));
        let mut ledger = NullTreasury::new();
        ledger.fail_transfers(true);
        let err: Box<dyn std::error::Error> = ledger
            .transfer(&a, &b, TokenAmount::new(1))
            .unwrap_err()
            .into();
        assert_eq!(err.to_string(), "transfers disabled");
    }
}
