//! Published events (Outgoing)

use crate::domain::{Address, BondStatus, Dec};
use serde::{Deserialize, Serialize};

/// Ledger transition published to the event bus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingEvent {
    ValidatorCreated {
        operator: Address,
        self_delegator: Address,
        self_bond: Dec,
    },
    ValidatorEdited {
        operator: Address,
        commission_rate: Dec,
    },
    Delegated {
        delegator: Address,
        validator: Address,
        amount: Dec,
        shares: Dec,
    },
    UnbondingStarted {
        delegator: Address,
        validator: Address,
        amount: Dec,
        completion_time: u64,
    },
    RedelegationStarted {
        delegator: Address,
        src: Address,
        dst: Address,
        amount: Dec,
        completion_time: u64,
    },
    UnbondingCompleted {
        delegator: Address,
        validator: Address,
        amount: Dec,
    },
    RedelegationCompleted {
        delegator: Address,
        src: Address,
        dst: Address,
    },
    Slashed {
        validator: Address,
        infraction_height: u64,
        fraction: Dec,
        /// Tokens burned across the validator and its queue entries
        burned: Dec,
    },
    ValidatorJailed {
        operator: Address,
    },
    ValidatorUnjailed {
        operator: Address,
    },
    ValidatorStatusChanged {
        operator: Address,
        from: BondStatus,
        to: BondStatus,
        height: u64,
    },
}

impl StakingEvent {
    /// Stable name, used as the metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            StakingEvent::ValidatorCreated { .. } => "validator_created",
            StakingEvent::ValidatorEdited { .. } => "validator_edited",
            StakingEvent::Delegated { .. } => "delegated",
            StakingEvent::UnbondingStarted { .. } => "unbonding_started",
            StakingEvent::RedelegationStarted { .. } => "redelegation_started",
            StakingEvent::UnbondingCompleted { .. } => "unbonding_completed",
            StakingEvent::RedelegationCompleted { .. } => "redelegation_completed",
            StakingEvent::Slashed { .. } => "slashed",
            StakingEvent::ValidatorJailed { .. } => "validator_jailed",
            StakingEvent::ValidatorUnjailed { .. } => "validator_unjailed",
            StakingEvent::ValidatorStatusChanged { .. } => "validator_status_changed",
        }
    }
}
