//! Read-only queries

use super::StakingService;
use crate::domain::{
    Address, Dec, Delegation, Pool, Redelegation, StakingError, StakingResult, StakingState,
    UnbondingDelegation, Validator,
};
use crate::ports::{BankKeeper, EventBus, GovernanceQuery, StateStore};

impl<B, E, S> StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    pub fn validator(&self, operator: &Address) -> Option<Validator> {
        self.state.read().validator(operator).cloned()
    }

    /// Validators by tokens descending, operator ascending.
    pub fn validators(&self) -> Vec<Validator> {
        self.state.read().validators_by_power().cloned().collect()
    }

    pub fn bonded_validators(&self) -> Vec<Validator> {
        self.state.read().bonded_validators().cloned().collect()
    }

    pub fn delegation(&self, delegator: &Address, validator: &Address) -> Option<Delegation> {
        self.state.read().delegation(delegator, validator).cloned()
    }

    pub fn delegations_of(&self, delegator: &Address) -> Vec<Delegation> {
        self.state.read().delegations_of(delegator).cloned().collect()
    }

    pub fn unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Option<UnbondingDelegation> {
        self.state
            .read()
            .unbonding_delegation(delegator, validator)
            .cloned()
    }

    pub fn redelegation(
        &self,
        delegator: &Address,
        src: &Address,
        dst: &Address,
    ) -> Option<Redelegation> {
        self.state.read().redelegation(delegator, src, dst).cloned()
    }

    pub fn pool(&self) -> Pool {
        self.state.read().pool.clone()
    }

    /// Current token value of a delegation.
    pub fn delegation_tokens(&self, delegator: &Address, validator: &Address) -> StakingResult<Dec> {
        let state = self.state.read();
        let delegation = state
            .delegation(delegator, validator)
            .ok_or(StakingError::DelegationNotFound {
                delegator: *delegator,
                validator: *validator,
            })?;
        state
            .get_validator(validator)?
            .tokens_from_shares(delegation.shares)
    }
}

fn ensure_finalized(state: &StakingState, at_height: u64) -> StakingResult<()> {
    match state.last_committed_height() {
        Some(last) if at_height <= last => Ok(()),
        last_committed => Err(StakingError::HeightNotFinalized {
            requested: at_height,
            last_committed,
        }),
    }
}

impl<B, E, S> GovernanceQuery for StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    /// Bonded tokens of `validator` at the end of `at_height`; zero if it was
    /// not bonded then.
    fn voting_power(&self, validator: &Address, at_height: u64) -> StakingResult<Dec> {
        let state = self.state.read();
        ensure_finalized(&state, at_height)?;
        let snapshot = state
            .history
            .snapshot_at(validator, at_height)
            .ok_or(StakingError::HeightPruned(at_height))?;
        Ok(if snapshot.bonded {
            snapshot.tokens
        } else {
            Dec::zero()
        })
    }

    fn total_bonded_tokens(&self, at_height: u64) -> StakingResult<Dec> {
        let state = self.state.read();
        ensure_finalized(&state, at_height)?;
        state
            .history
            .total_bonded_at(at_height)
            .ok_or(StakingError::HeightPruned(at_height))
    }
}
