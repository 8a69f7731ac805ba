//! Genesis ledger contents.

use super::{Address, Dec, Delegation, StakingError, StakingResult, Validator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Initial validators and delegations. Their tokens are expected to already
/// sit in the staking module account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub validators: Vec<Validator>,
    pub delegations: Vec<Delegation>,
}

impl GenesisState {
    /// Structural checks: unique operators and pubkeys, valid metadata,
    /// delegations pointing at known validators and summing to their shares.
    pub fn validate(&self) -> StakingResult<()> {
        let mut operators = BTreeSet::new();
        let mut pubkeys = BTreeSet::new();
        for v in &self.validators {
            if !operators.insert(v.operator) {
                return Err(StakingError::InvalidGenesis(format!(
                    "duplicate validator {}",
                    v.operator
                )));
            }
            if !pubkeys.insert(v.consensus_pubkey) {
                return Err(StakingError::InvalidGenesis(format!(
                    "duplicate consensus pubkey {}",
                    v.consensus_pubkey
                )));
            }
            v.description
                .validate()
                .map_err(|e| StakingError::InvalidGenesis(format!("{}: {e}", v.operator)))?;
            if v.tokens.is_zero() != v.delegator_shares.is_zero() {
                return Err(StakingError::InvalidGenesis(format!(
                    "validator {} has tokens {} against shares {}",
                    v.operator, v.tokens, v.delegator_shares
                )));
            }
        }

        let mut sums: BTreeMap<Address, Dec> = BTreeMap::new();
        let mut pairs = BTreeSet::new();
        for d in &self.delegations {
            if !operators.contains(&d.validator) {
                return Err(StakingError::InvalidGenesis(format!(
                    "delegation to unknown validator {}",
                    d.validator
                )));
            }
            if d.shares.is_zero() {
                return Err(StakingError::InvalidGenesis(format!(
                    "zero-share delegation {} -> {}",
                    d.delegator, d.validator
                )));
            }
            if !pairs.insert((d.delegator, d.validator)) {
                return Err(StakingError::InvalidGenesis(format!(
                    "duplicate delegation {} -> {}",
                    d.delegator, d.validator
                )));
            }
            let sum = sums.entry(d.validator).or_default();
            *sum = sum.checked_add(d.shares).ok_or(StakingError::Overflow)?;
        }

        for v in &self.validators {
            let sum = sums.get(&v.operator).copied().unwrap_or_default();
            if sum != v.delegator_shares {
                return Err(StakingError::InvalidGenesis(format!(
                    "validator {} shares {} but delegations sum to {}",
                    v.operator, v.delegator_shares, sum
                )));
            }
        }
        Ok(())
    }

    /// Tokens the module account must hold for this genesis.
    pub fn total_tokens(&self) -> StakingResult<Dec> {
        self.validators
            .iter()
            .try_fold(Dec::zero(), |acc, v| acc.checked_add(v.tokens))
            .ok_or(StakingError::Overflow)
    }
}
