//! Bank adapter
//!
//! Account balances in memory, with a running total of burned tokens so
//! conservation can be checked end to end.

use crate::domain::{Address, Dec};
use crate::ports::{BankError, BankKeeper};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
struct Ledger {
    balances: BTreeMap<Address, Dec>,
    burned: Dec,
}

/// In-memory bank adapter
#[derive(Default)]
pub struct InMemoryBank {
    ledger: RwLock<Ledger>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` into `account`.
    pub fn credit(&self, account: Address, amount: Dec) -> Result<(), BankError> {
        let mut ledger = self.ledger.write();
        let balance = ledger.balances.entry(account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(BankError::Overflow(account))?;
        Ok(())
    }

    pub fn burned(&self) -> Dec {
        self.ledger.read().burned
    }

    /// Sum of every balance plus burned tokens.
    pub fn total_supply(&self) -> Option<Dec> {
        let ledger = self.ledger.read();
        ledger
            .balances
            .values()
            .try_fold(ledger.burned, |acc, b| acc.checked_add(*b))
    }
}

fn debit(ledger: &mut Ledger, account: &Address, amount: Dec) -> Result<(), BankError> {
    let available = ledger.balances.get(account).copied().unwrap_or_default();
    let remaining = available
        .checked_sub(amount)
        .ok_or(BankError::InsufficientFunds {
            account: *account,
            required: amount,
            available,
        })?;
    if remaining.is_zero() {
        ledger.balances.remove(account);
    } else {
        ledger.balances.insert(*account, remaining);
    }
    Ok(())
}

impl BankKeeper for InMemoryBank {
    fn balance(&self, account: &Address) -> Dec {
        self.ledger
            .read()
            .balances
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&self, from: &Address, to: &Address, amount: Dec) -> Result<(), BankError> {
        let mut ledger = self.ledger.write();
        if from == to {
            let available = ledger.balances.get(from).copied().unwrap_or_default();
            if available < amount {
                return Err(BankError::InsufficientFunds {
                    account: *from,
                    required: amount,
                    available,
                });
            }
            return Ok(());
        }
        let credited = ledger
            .balances
            .get(to)
            .copied()
            .unwrap_or_default()
            .checked_add(amount)
            .ok_or(BankError::Overflow(*to))?;
        debit(&mut ledger, from, amount)?;
        ledger.balances.insert(*to, credited);
        Ok(())
    }

    fn burn(&self, from: &Address, amount: Dec) -> Result<(), BankError> {
        let mut ledger = self.ledger.write();
        let burned = ledger
            .burned
            .checked_add(amount)
            .ok_or(BankError::Overflow(*from))?;
        debit(&mut ledger, from, amount)?;
        ledger.burned = burned;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(id: u8) -> Address {
        Address([id; 20])
    }

    #[test]
    fn test_transfer_moves_funds() {
        let bank = InMemoryBank::new();
        bank.credit(addr(1), Dec::from_int(10)).unwrap();

        bank.transfer(&addr(1), &addr(2), Dec::from_int(4)).unwrap();

        assert_eq!(bank.balance(&addr(1)), Dec::from_int(6));
        assert_eq!(bank.balance(&addr(2)), Dec::from_int(4));
    }

    #[test]
    fn test_transfer_rejects_overdraft() {
        let bank = InMemoryBank::new();
        bank.credit(addr(1), Dec::from_int(1)).unwrap();

        let err = bank
            .transfer(&addr(1), &addr(2), Dec::from_int(2))
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(bank.balance(&addr(1)), Dec::from_int(1));
        assert!(bank.balance(&addr(2)).is_zero());
    }

    #[test]
    fn test_burn_preserves_total_supply() {
        let bank = InMemoryBank::new();
        bank.credit(addr(1), Dec::from_int(10)).unwrap();

        bank.burn(&addr(1), Dec::from_int(3)).unwrap();

        assert_eq!(bank.balance(&addr(1)), Dec::from_int(7));
        assert_eq!(bank.burned(), Dec::from_int(3));
        assert_eq!(bank.total_supply(), Some(Dec::from_int(10)));
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let bank = InMemoryBank::new();
        bank.credit(addr(1), Dec::from_int(5)).unwrap();
        bank.transfer(&addr(1), &addr(1), Dec::from_int(5)).unwrap();
        assert_eq!(bank.balance(&addr(1)), Dec::from_int(5));
    }
}
