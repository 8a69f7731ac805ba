//! Error types for the staking subsystem

use super::{Address, ConsensusPubKey, Dec};

/// Classification of a staking error, used by the transaction-execution
/// layer to decide how to reject a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    StateConflict,
    InsufficientBalance,
    InsufficientShares,
    /// Ledger corruption; block production must halt.
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::StateConflict => "state_conflict",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::InsufficientShares => "insufficient_shares",
            ErrorKind::Fatal => "fatal",
        }
    }
}

/// Staking error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    #[error("Validator not found: {0}")]
    ValidatorNotFound(Address),

    #[error("Delegation not found: {delegator} -> {validator}")]
    DelegationNotFound {
        delegator: Address,
        validator: Address,
    },

    #[error("No unbonding delegation: {delegator} -> {validator}")]
    UnbondingDelegationNotFound {
        delegator: Address,
        validator: Address,
    },

    #[error("No redelegation: {delegator} {src} -> {dst}")]
    RedelegationNotFound {
        delegator: Address,
        src: Address,
        dst: Address,
    },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Invalid commission: {0}")]
    InvalidCommission(String),

    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Slash fraction out of range [0, 1]: {0}")]
    InvalidFraction(Dec),

    #[error("Self-bond {amount} below minimum {min}")]
    InsufficientSelfBond { amount: Dec, min: Dec },

    #[error("Infraction height {infraction_height} is after current height {current_height}")]
    FutureInfraction {
        infraction_height: u64,
        current_height: u64,
    },

    #[error("Height {requested} is not finalized (last committed: {last_committed:?})")]
    HeightNotFinalized {
        requested: u64,
        last_committed: Option<u64>,
    },

    #[error("Height {0} predates retained power history")]
    HeightPruned(u64),

    #[error("Invalid genesis state: {0}")]
    InvalidGenesis(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Validator already exists: {0}")]
    ValidatorAlreadyExists(Address),

    #[error("Consensus pubkey already in use: {0}")]
    PubKeyAlreadyInUse(ConsensusPubKey),

    #[error("Commission updated at {last_update}, next change allowed at {next_allowed}")]
    CommissionUpdatePeriodNotElapsed { last_update: u64, next_allowed: u64 },

    #[error("Commission rate out of bounds: {0}")]
    CommissionRateOutOfBounds(String),

    #[error("Cannot redelegate to the same validator")]
    RedelegationToSelf,

    #[error("Redelegation from {validator} is still in flight for {delegator}")]
    TransitiveRedelegation {
        delegator: Address,
        validator: Address,
    },

    #[error("Too many unbonding entries for pair (max {max})")]
    MaxUnbondingEntries { max: usize },

    #[error("Too many redelegation entries for triple (max {max})")]
    MaxRedelegationEntries { max: usize },

    #[error("Validator is not jailed: {0}")]
    ValidatorNotJailed(Address),

    #[error("Validator already jailed: {0}")]
    ValidatorAlreadyJailed(Address),

    #[error("Validator has no tokens backing its shares: {0}")]
    ValidatorInsolvent(Address),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Dec, available: Dec },

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: Dec, available: Dec },

    #[error("Invariant broken: {0}")]
    InvariantBroken(String),

    #[error("Bank error: {0}")]
    Bank(String),

    #[error("State store error: {0}")]
    Store(String),
}

impl StakingError {
    pub fn kind(&self) -> ErrorKind {
        use StakingError::*;
        match self {
            ValidatorNotFound(_)
            | DelegationNotFound { .. }
            | UnbondingDelegationNotFound { .. }
            | RedelegationNotFound { .. } => ErrorKind::NotFound,

            InvalidAmount
            | InvalidCommission(_)
            | InvalidDescription(_)
            | InvalidFraction(_)
            | InsufficientSelfBond { .. }
            | FutureInfraction { .. }
            | HeightNotFinalized { .. }
            | HeightPruned(_)
            | InvalidGenesis(_)
            | InvalidConfig(_)
            | Overflow => ErrorKind::InvalidArgument,

            ValidatorAlreadyExists(_)
            | PubKeyAlreadyInUse(_)
            | CommissionUpdatePeriodNotElapsed { .. }
            | CommissionRateOutOfBounds(_)
            | RedelegationToSelf
            | TransitiveRedelegation { .. }
            | MaxUnbondingEntries { .. }
            | MaxRedelegationEntries { .. }
            | ValidatorNotJailed(_)
            | ValidatorAlreadyJailed(_)
            | ValidatorInsolvent(_) => ErrorKind::StateConflict,

            InsufficientFunds { .. } => ErrorKind::InsufficientBalance,

            InsufficientShares { .. } => ErrorKind::InsufficientShares,

            InvariantBroken(_) | Bank(_) | Store(_) => ErrorKind::Fatal,
        }
    }

    /// Fatal errors indicate ledger corruption rather than a bad transaction.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

/// Result type for staking operations
pub type StakingResult<T> = Result<T, StakingError>;
