//! Staking transaction messages
//!
//! `validate_basic` performs the stateless checks; everything that needs the
//! ledger happens in the service.

use super::{Address, CommissionRates, ConsensusPubKey, Dec, Description, StakingError, StakingResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    /// Account funding and owning the self-bond.
    pub delegator: Address,
    pub operator: Address,
    pub pubkey: ConsensusPubKey,
    pub self_bond: Dec,
    pub description: Description,
    pub commission: CommissionRates,
}

impl MsgCreateValidator {
    pub fn new(
        operator: Address,
        pubkey: ConsensusPubKey,
        self_bond: Dec,
        description: Description,
        commission: CommissionRates,
    ) -> Self {
        Self {
            delegator: operator,
            operator,
            pubkey,
            self_bond,
            description,
            commission,
        }
    }

    /// Self-bond funded by `delegator` rather than the operator.
    pub fn on_behalf_of(mut self, delegator: Address) -> Self {
        self.delegator = delegator;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEditValidator {
    pub operator: Address,
    pub description: Option<Description>,
    pub commission_rate: Option<Dec>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingMsg {
    CreateValidator(MsgCreateValidator),
    EditValidator(MsgEditValidator),
    Delegate {
        delegator: Address,
        validator: Address,
        amount: Dec,
    },
    Undelegate {
        delegator: Address,
        validator: Address,
        shares: Dec,
    },
    BeginRedelegate {
        delegator: Address,
        src: Address,
        dst: Address,
        shares: Dec,
    },
    CompleteUnbonding {
        delegator: Address,
        validator: Address,
    },
    CompleteRedelegation {
        delegator: Address,
        src: Address,
        dst: Address,
    },
    Unjail {
        operator: Address,
    },
}

impl StakingMsg {
    pub fn type_name(&self) -> &'static str {
        match self {
            StakingMsg::CreateValidator(_) => "create_validator",
            StakingMsg::EditValidator(_) => "edit_validator",
            StakingMsg::Delegate { .. } => "delegate",
            StakingMsg::Undelegate { .. } => "undelegate",
            StakingMsg::BeginRedelegate { .. } => "begin_redelegate",
            StakingMsg::CompleteUnbonding { .. } => "complete_unbonding",
            StakingMsg::CompleteRedelegation { .. } => "complete_redelegation",
            StakingMsg::Unjail { .. } => "unjail",
        }
    }

    /// Checks that need no ledger access.
    pub fn validate_basic(&self) -> StakingResult<()> {
        match self {
            StakingMsg::CreateValidator(msg) => {
                if !msg.self_bond.is_positive() {
                    return Err(StakingError::InsufficientSelfBond {
                        amount: msg.self_bond,
                        min: Dec::zero(),
                    });
                }
                msg.description
                    .validate()
                    .map_err(StakingError::InvalidDescription)?;
                msg.commission
                    .validate()
                    .map_err(StakingError::InvalidCommission)
            }
            StakingMsg::EditValidator(msg) => {
                if let Some(description) = &msg.description {
                    description
                        .validate()
                        .map_err(StakingError::InvalidDescription)?;
                }
                Ok(())
            }
            StakingMsg::Delegate { amount, .. } => positive(*amount),
            StakingMsg::Undelegate { shares, .. } => positive(*shares),
            StakingMsg::BeginRedelegate {
                src, dst, shares, ..
            } => {
                if src == dst {
                    return Err(StakingError::RedelegationToSelf);
                }
                positive(*shares)
            }
            StakingMsg::CompleteRedelegation { src, dst, .. } if src == dst => {
                Err(StakingError::RedelegationToSelf)
            }
            StakingMsg::CompleteUnbonding { .. }
            | StakingMsg::CompleteRedelegation { .. }
            | StakingMsg::Unjail { .. } => Ok(()),
        }
    }
}

fn positive(amount: Dec) -> StakingResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(StakingError::InvalidAmount)
    }
}

/// Outcome of a delivered message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgResult {
    ValidatorCreated { operator: Address, shares: Dec },
    ValidatorEdited,
    Delegated { shares: Dec },
    UnbondingStarted { amount: Dec, completion_time: u64 },
    RedelegationStarted { amount: Dec, completion_time: u64 },
    UnbondingCompleted { amount: Dec },
    RedelegationCompleted { entries: usize },
    Unjailed,
}
