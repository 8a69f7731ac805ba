//! Ledger invariants.
//!
//! Every check is a pure read over `StakingState`. `check_all_invariants`
//! runs the whole registry and reports the first violation; a violation is
//! ledger corruption, never a user error.

use super::{Address, Dec, StakingState};
use std::collections::BTreeMap;

/// Invariant violation found by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    BondedPoolMismatch { pool: Dec, sum: Dec },
    NotBondedPoolMismatch { pool: Dec, sum: Dec },
    ModuleBalanceMismatch { balance: Dec, pool: Dec },
    DelegatorSharesMismatch { validator: Address, validator_shares: Dec, delegation_sum: Dec },
    OrphanDelegation { delegator: Address, validator: Address },
    ZeroShareDelegation { delegator: Address, validator: Address },
    EmptyQueueRecord { delegator: Address, validator: Address },
    TooManyBonded { bonded: usize, max: usize },
    Overflow,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BondedPoolMismatch { pool, sum } => {
                write!(f, "bonded pool {pool} != bonded validator tokens {sum}")
            }
            Self::NotBondedPoolMismatch { pool, sum } => {
                write!(f, "not-bonded pool {pool} != non-bonded tokens + unbonding balances {sum}")
            }
            Self::ModuleBalanceMismatch { balance, pool } => {
                write!(f, "module account balance {balance} != pool total {pool}")
            }
            Self::DelegatorSharesMismatch {
                validator,
                validator_shares,
                delegation_sum,
            } => write!(
                f,
                "validator {validator} has {validator_shares} shares, delegations sum to {delegation_sum}"
            ),
            Self::OrphanDelegation {
                delegator,
                validator,
            } => write!(f, "delegation {delegator} -> {validator} has no validator"),
            Self::ZeroShareDelegation {
                delegator,
                validator,
            } => write!(f, "delegation {delegator} -> {validator} has zero shares"),
            Self::EmptyQueueRecord {
                delegator,
                validator,
            } => write!(f, "queue record {delegator} -> {validator} has no live entries"),
            Self::TooManyBonded { bonded, max } => {
                write!(f, "{bonded} bonded validators exceeds max {max}")
            }
            Self::Overflow => write!(f, "overflow while summing ledger"),
        }
    }
}

fn sum<I: IntoIterator<Item = Dec>>(items: I) -> Result<Dec, InvariantViolation> {
    items
        .into_iter()
        .try_fold(Dec::zero(), |acc, d| acc.checked_add(d))
        .ok_or(InvariantViolation::Overflow)
}

/// Bonded pool equals the tokens of all `Bonded` validators.
pub fn invariant_bonded_pool(state: &StakingState) -> Result<(), InvariantViolation> {
    let sum = sum(state.bonded_validators().map(|v| v.tokens))?;
    if sum != state.pool.bonded_tokens {
        return Err(InvariantViolation::BondedPoolMismatch {
            pool: state.pool.bonded_tokens,
            sum,
        });
    }
    Ok(())
}

/// Not-bonded pool equals non-bonded validator tokens plus pending unbonding balances.
pub fn invariant_not_bonded_pool(state: &StakingState) -> Result<(), InvariantViolation> {
    let validator_tokens = sum(state
        .validators()
        .filter(|v| !v.is_bonded())
        .map(|v| v.tokens))?;
    let unbonding = sum(state
        .unbonding_delegations()
        .flat_map(|ubd| ubd.entries.iter().map(|e| e.balance)))?;
    let total = validator_tokens
        .checked_add(unbonding)
        .ok_or(InvariantViolation::Overflow)?;
    if total != state.pool.not_bonded_tokens {
        return Err(InvariantViolation::NotBondedPoolMismatch {
            pool: state.pool.not_bonded_tokens,
            sum: total,
        });
    }
    Ok(())
}

/// Module account holds exactly the pool total.
pub fn invariant_module_balance(
    state: &StakingState,
    module_balance: Dec,
) -> Result<(), InvariantViolation> {
    let pool = state.pool.total().ok_or(InvariantViolation::Overflow)?;
    if pool != module_balance {
        return Err(InvariantViolation::ModuleBalanceMismatch {
            balance: module_balance,
            pool,
        });
    }
    Ok(())
}

/// Delegations are non-zero, point at live validators, and sum to each
/// validator's outstanding shares.
pub fn invariant_delegator_shares(state: &StakingState) -> Result<(), InvariantViolation> {
    let mut sums: BTreeMap<Address, Dec> = BTreeMap::new();
    for delegation in state.delegations() {
        if delegation.shares.is_zero() {
            return Err(InvariantViolation::ZeroShareDelegation {
                delegator: delegation.delegator,
                validator: delegation.validator,
            });
        }
        if state.validator(&delegation.validator).is_none() {
            return Err(InvariantViolation::OrphanDelegation {
                delegator: delegation.delegator,
                validator: delegation.validator,
            });
        }
        let entry = sums.entry(delegation.validator).or_default();
        *entry = entry
            .checked_add(delegation.shares)
            .ok_or(InvariantViolation::Overflow)?;
    }

    for validator in state.validators() {
        let delegation_sum = sums.get(&validator.operator).copied().unwrap_or_default();
        if delegation_sum != validator.delegator_shares {
            return Err(InvariantViolation::DelegatorSharesMismatch {
                validator: validator.operator,
                validator_shares: validator.delegator_shares,
                delegation_sum,
            });
        }
    }
    Ok(())
}

/// Queue records only exist while they carry a live entry.
pub fn invariant_no_empty_records(state: &StakingState) -> Result<(), InvariantViolation> {
    for ubd in state.unbonding_delegations() {
        if ubd.entries.is_empty() || ubd.entries.iter().any(|e| e.balance.is_zero()) {
            return Err(InvariantViolation::EmptyQueueRecord {
                delegator: ubd.delegator,
                validator: ubd.validator,
            });
        }
    }
    for red in state.redelegations() {
        if red.entries.is_empty() {
            return Err(InvariantViolation::EmptyQueueRecord {
                delegator: red.delegator,
                validator: red.validator_src,
            });
        }
    }
    Ok(())
}

/// Bonded set never exceeds `max_validators`.
pub fn invariant_bonded_count(
    state: &StakingState,
    max_validators: usize,
) -> Result<(), InvariantViolation> {
    let bonded = state.bonded_validators().count();
    if bonded > max_validators {
        return Err(InvariantViolation::TooManyBonded {
            bonded,
            max: max_validators,
        });
    }
    Ok(())
}

/// Run the full registry.
pub fn check_all_invariants(
    state: &StakingState,
    module_balance: Dec,
    max_validators: usize,
) -> Result<(), InvariantViolation> {
    invariant_bonded_pool(state)?;
    invariant_not_bonded_pool(state)?;
    invariant_module_balance(state, module_balance)?;
    invariant_delegator_shares(state)?;
    invariant_no_empty_records(state)?;
    invariant_bonded_count(state, max_validators)?;
    Ok(())
}
