//! Driven ports (Outbound dependencies)

use crate::domain::{Address, Dec, StakingError};
use crate::events::StakingEvent;

/// Errors raised by the account layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("Account {account} holds {available}, needs {required}")]
    InsufficientFunds {
        account: Address,
        required: Dec,
        available: Dec,
    },

    #[error("Balance overflow for {0}")]
    Overflow(Address),
}

impl From<BankError> for StakingError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::InsufficientFunds {
                required,
                available,
                ..
            } => StakingError::InsufficientFunds {
                required,
                available,
            },
            other => StakingError::Bank(other.to_string()),
        }
    }
}

/// Spendable-balance layer holding user funds and the staking module account.
///
/// Token amounts share `Dec`'s raw units.
pub trait BankKeeper: Send + Sync {
    fn balance(&self, account: &Address) -> Dec;

    fn transfer(&self, from: &Address, to: &Address, amount: Dec) -> Result<(), BankError>;

    /// Destroy `amount` held by `from`.
    fn burn(&self, from: &Address, amount: Dec) -> Result<(), BankError>;
}

/// Event bus for committed ledger transitions
pub trait EventBus: Send + Sync {
    fn publish(&self, event: StakingEvent) -> Result<(), String>;
}

/// Errors raised by the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for StakingError {
    fn from(err: StoreError) -> Self {
        StakingError::Store(err.to_string())
    }
}

/// Persists encoded ledger snapshots by committed height.
pub trait StateStore: Send + Sync {
    fn save(&self, height: u64, snapshot: Vec<u8>) -> Result<(), StoreError>;

    fn load(&self, height: u64) -> Result<Option<Vec<u8>>, StoreError>;

    fn latest_height(&self) -> Result<Option<u64>, StoreError>;
}
