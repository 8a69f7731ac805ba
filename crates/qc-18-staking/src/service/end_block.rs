//! Validator-set update, queue maturation and genesis

use super::{StakingService, TxEffects};
use crate::domain::{
    check_all_invariants, Address, BlockContext, BondStatus, Dec, GenesisState, StakingError,
    StakingResult, StakingState, ValidatorUpdate, STAKING_MODULE_ACCOUNT,
};
use crate::events::StakingEvent;
use crate::metrics;
use crate::ports::{BankKeeper, EventBus, StateStore};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info};

impl<B, E, S> StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    pub(super) fn apply_end_block(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
    ) -> StakingResult<Vec<ValidatorUpdate>> {
        self.mature_unbonding_validators(state, fx, ctx)?;
        let updates = self.update_validator_set(state, fx, ctx)?;
        self.mature_queues(state, fx, ctx)?;
        reconcile_bonded_pool(state)?;

        for validator in state.validators().cloned().collect::<Vec<_>>() {
            state.history.record(
                validator.operator,
                ctx.height,
                validator.tokens,
                validator.is_bonded(),
            );
        }
        let bonded_tokens = state.pool.bonded_tokens;
        state.history.record_total_bonded(ctx.height, bonded_tokens);
        state.history.prune(
            ctx.height
                .saturating_sub(self.config.unbonding_period_blocks),
        );
        state.set_last_committed_height(ctx.height);

        let bonded = state.last_validator_powers().len();
        metrics::record_end_block(bonded_tokens.truncate_int(), bonded, updates.len());
        info!(
            height = ctx.height,
            bonded_validators = bonded,
            bonded_tokens = %bonded_tokens,
            updates = updates.len(),
            "End block"
        );
        Ok(updates)
    }

    /// Release validators whose unbonding period has elapsed.
    fn mature_unbonding_validators(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
    ) -> StakingResult<()> {
        for operator in state.validator_queue.drain_mature(ctx.time) {
            let Some(mut validator) = state.validator(&operator).cloned() else {
                continue;
            };
            // A validator that re-bonded and left again is queued at its new time.
            if validator.status != BondStatus::Unbonding
                || validator.unbonding_completion_time > ctx.time
            {
                continue;
            }

            validator.status = BondStatus::Unbonded;
            fx.emit(StakingEvent::ValidatorStatusChanged {
                operator,
                from: BondStatus::Unbonding,
                to: BondStatus::Unbonded,
                height: ctx.height,
            });

            if validator.delegator_shares.is_zero() {
                state.remove_validator(&operator);
                state
                    .history
                    .record(operator, ctx.height, Dec::zero(), false);
                info!(operator = %operator, "Unbonded validator removed");
            } else {
                debug!(operator = %operator, "Validator unbonded");
                state.set_validator(validator);
            }
        }
        Ok(())
    }

    /// Re-rank, move validators in and out of the bonded set, and return the
    /// power diff for consensus.
    fn update_validator_set(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
    ) -> StakingResult<Vec<ValidatorUpdate>> {
        let selected: Vec<Address> = state
            .validators_by_power()
            .filter(|v| v.status != BondStatus::Unbonding && !v.jailed && v.power() > 0)
            .take(self.config.max_validators)
            .map(|v| v.operator)
            .collect();
        let selected_set: BTreeSet<Address> = selected.iter().copied().collect();

        let leaving: Vec<Address> = state
            .validators()
            .filter(|v| v.is_bonded() && !selected_set.contains(&v.operator))
            .map(|v| v.operator)
            .collect();
        for operator in leaving {
            let validator = state.get_validator(&operator)?.clone();
            self.begin_unbonding_validator(state, fx, ctx, validator)?;
        }

        let mut updates = Vec::new();
        let mut powers = BTreeMap::new();
        for operator in &selected {
            let mut validator = state.get_validator(operator)?.clone();
            if !validator.is_bonded() {
                let from = validator.status;
                state.move_pool(from, BondStatus::Bonded, validator.tokens)?;
                validator.status = BondStatus::Bonded;
                validator.unbonding_height = 0;
                validator.unbonding_completion_time = 0;
                fx.emit(StakingEvent::ValidatorStatusChanged {
                    operator: *operator,
                    from,
                    to: BondStatus::Bonded,
                    height: ctx.height,
                });
                info!(operator = %operator, power = validator.power(), "Validator bonded");
            }

            let power = validator.power();
            if state.last_validator_power(operator) != Some(power) {
                updates.push(ValidatorUpdate {
                    pubkey: validator.consensus_pubkey,
                    power,
                });
            }
            powers.insert(*operator, power);
            state.set_validator(validator);
        }

        let removed: Vec<Address> = state
            .last_validator_powers()
            .keys()
            .filter(|operator| !powers.contains_key(*operator))
            .copied()
            .collect();
        for operator in removed {
            let validator = state.validator(&operator).ok_or_else(|| {
                StakingError::InvariantBroken(format!(
                    "previously bonded validator {operator} vanished"
                ))
            })?;
            updates.push(ValidatorUpdate {
                pubkey: validator.consensus_pubkey,
                power: 0,
            });
        }

        state.set_last_validator_powers(powers);
        Ok(updates)
    }

    /// Pay out matured unbondings and drop matured redelegations.
    fn mature_queues(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
    ) -> StakingResult<()> {
        for (delegator, validator) in state.unbonding_queue.drain_mature(ctx.time) {
            match self.complete_unbonding(state, fx, ctx, delegator, validator) {
                Ok(_) | Err(StakingError::UnbondingDelegationNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        for (delegator, src, dst) in state.redelegation_queue.drain_mature(ctx.time) {
            match self.complete_redelegation(state, fx, ctx, delegator, src, dst) {
                Ok(_) | Err(StakingError::RedelegationNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub(super) fn apply_genesis(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        genesis: GenesisState,
    ) -> StakingResult<Vec<ValidatorUpdate>> {
        if state.validator_count() > 0 || state.last_committed_height().is_some() {
            return Err(StakingError::InvalidGenesis(
                "ledger already initialised".into(),
            ));
        }
        genesis.validate()?;

        let required = genesis.total_tokens()?;
        let held = self.bank.balance(&STAKING_MODULE_ACCOUNT);
        if held != required {
            return Err(StakingError::InvalidGenesis(format!(
                "module account holds {held}, validators need {required}"
            )));
        }

        for mut validator in genesis.validators {
            // The bonded set is derived below, not taken from the input.
            validator.status = BondStatus::Unbonded;
            validator.unbonding_height = 0;
            validator.unbonding_completion_time = 0;
            state.add_to_pool(BondStatus::Unbonded, validator.tokens)?;
            state.set_validator(validator);
        }
        for delegation in genesis.delegations {
            state.set_delegation(delegation);
        }

        let updates = self.apply_end_block(state, fx, ctx)?;
        info!(
            validators = state.validator_count(),
            bonded = updates.len(),
            "Genesis loaded"
        );
        Ok(updates)
    }

    /// Post-commit checks and persistence for block-level operations.
    pub(super) fn after_commit(&self, ctx: BlockContext) -> StakingResult<()> {
        let state = self.state.read();
        if self.config.check_invariants {
            let module_balance = self.bank.balance(&STAKING_MODULE_ACCOUNT);
            if let Err(violation) =
                check_all_invariants(&state, module_balance, self.config.max_validators)
            {
                error!(height = ctx.height, violation = %violation, "Staking invariant broken");
                return Err(StakingError::InvariantBroken(violation.to_string()));
            }
        }
        self.store.save(ctx.height, state.encode()?)?;
        Ok(())
    }
}

/// Bonded pool must equal the tokens of the bonded set exactly.
fn reconcile_bonded_pool(state: &StakingState) -> StakingResult<()> {
    let sum = state
        .bonded_validators()
        .try_fold(Dec::zero(), |acc, v| acc.checked_add(v.tokens))
        .ok_or(StakingError::Overflow)?;
    if sum != state.pool.bonded_tokens {
        error!(
            pool = %state.pool.bonded_tokens,
            sum = %sum,
            "Bonded pool drifted from bonded set"
        );
        return Err(StakingError::InvariantBroken(format!(
            "bonded pool {} != bonded set tokens {}",
            state.pool.bonded_tokens, sum
        )));
    }
    Ok(())
}
