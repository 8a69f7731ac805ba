//! Delegation ledger operations

use super::{StakingService, TxEffects};
use crate::domain::{
    Address, BlockContext, BondStatus, Dec, Delegation, MsgResult, Redelegation, StakingError,
    StakingResult, StakingState, UnbondingDelegation, STAKING_MODULE_ACCOUNT,
};
use crate::events::StakingEvent;
use crate::ports::{BankKeeper, EventBus, StateStore};
use tracing::{debug, info};

impl<B, E, S> StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    /// Bond `amount` tokens from `delegator` to `validator`. Returns shares issued.
    pub(super) fn delegate(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        delegator: Address,
        validator: Address,
        amount: Dec,
    ) -> StakingResult<Dec> {
        if !amount.is_positive() {
            return Err(StakingError::InvalidAmount);
        }
        let mut val = state.get_validator(&validator)?.clone();
        self.ensure_funds(&delegator, amount)?;

        let shares = val.add_tokens_from_del(amount)?;
        state.add_to_pool(val.status, amount)?;
        state.set_validator(val);
        add_delegation_shares(state, delegator, validator, shares)?;

        fx.transfer(delegator, STAKING_MODULE_ACCOUNT, amount);
        fx.emit(StakingEvent::Delegated {
            delegator,
            validator,
            amount,
            shares,
        });
        debug!(
            delegator = %delegator,
            validator = %validator,
            amount = %amount,
            shares = %shares,
            "Delegated"
        );
        Ok(shares)
    }

    /// Start withdrawing `shares` from `validator`.
    pub(super) fn undelegate(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        delegator: Address,
        validator: Address,
        shares: Dec,
    ) -> StakingResult<MsgResult> {
        let completion_time = self.completion_time(ctx)?;
        let mut ubd = state
            .unbonding_delegation(&delegator, &validator)
            .cloned()
            .unwrap_or_else(|| UnbondingDelegation::new(delegator, validator));

        let amount = self.unbond(state, fx, ctx, delegator, validator, shares)?;
        if amount.is_zero() {
            // Worthless shares are burned outright; there is nothing to pay out.
            debug!(
                delegator = %delegator,
                validator = %validator,
                shares = %shares,
                "Worthless shares removed"
            );
            return Ok(MsgResult::UnbondingStarted {
                amount,
                completion_time,
            });
        }
        if !ubd.can_add(completion_time, self.config.max_entries) {
            return Err(StakingError::MaxUnbondingEntries {
                max: self.config.max_entries,
            });
        }

        let id = state.next_entry_id();
        if !ubd.add_entry(id, ctx.height, completion_time, amount) {
            return Err(StakingError::Overflow);
        }
        state.add_to_pool(BondStatus::Unbonded, amount)?;
        state.set_unbonding_delegation(ubd);
        state
            .unbonding_queue
            .insert(completion_time, (delegator, validator));

        fx.emit(StakingEvent::UnbondingStarted {
            delegator,
            validator,
            amount,
            completion_time,
        });
        info!(
            delegator = %delegator,
            validator = %validator,
            amount = %amount,
            completion_time,
            "Unbonding started"
        );

        Ok(MsgResult::UnbondingStarted {
            amount,
            completion_time,
        })
    }

    /// Move `shares` from `src` to `dst` without waiting out the unbonding period.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn begin_redelegate(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        delegator: Address,
        src: Address,
        dst: Address,
        shares: Dec,
    ) -> StakingResult<MsgResult> {
        if src == dst {
            return Err(StakingError::RedelegationToSelf);
        }
        state.get_validator(&src)?;
        state.get_validator(&dst)?;
        if state.has_receiving_redelegation(&delegator, &src) {
            return Err(StakingError::TransitiveRedelegation {
                delegator,
                validator: src,
            });
        }

        let completion_time = self.completion_time(ctx)?;
        let mut red = state
            .redelegation(&delegator, &src, &dst)
            .cloned()
            .unwrap_or_else(|| Redelegation::new(delegator, src, dst));
        if !red.can_add(completion_time, self.config.max_entries) {
            return Err(StakingError::MaxRedelegationEntries {
                max: self.config.max_entries,
            });
        }

        let amount = self.unbond(state, fx, ctx, delegator, src, shares)?;
        if amount.is_zero() {
            return Err(StakingError::InvalidAmount);
        }

        let mut dst_val = state.get_validator(&dst)?.clone();
        let shares_dst = dst_val.add_tokens_from_del(amount)?;
        state.add_to_pool(dst_val.status, amount)?;
        state.set_validator(dst_val);
        add_delegation_shares(state, delegator, dst, shares_dst)?;

        let id = state.next_entry_id();
        if !red.add_entry(id, ctx.height, completion_time, amount, shares_dst) {
            return Err(StakingError::Overflow);
        }
        state.set_redelegation(red);
        state
            .redelegation_queue
            .insert(completion_time, (delegator, src, dst));

        fx.emit(StakingEvent::RedelegationStarted {
            delegator,
            src,
            dst,
            amount,
            completion_time,
        });
        info!(
            delegator = %delegator,
            src = %src,
            dst = %dst,
            amount = %amount,
            completion_time,
            "Redelegation started"
        );

        Ok(MsgResult::RedelegationStarted {
            amount,
            completion_time,
        })
    }

    /// Pay out every matured unbonding entry of the pair. Returns the amount paid.
    pub(super) fn complete_unbonding(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        delegator: Address,
        validator: Address,
    ) -> StakingResult<Dec> {
        let mut ubd = state
            .unbonding_delegation(&delegator, &validator)
            .cloned()
            .ok_or(StakingError::UnbondingDelegationNotFound {
                delegator,
                validator,
            })?;

        let (mature, pending): (Vec<_>, Vec<_>) = ubd
            .entries
            .into_iter()
            .partition(|entry| entry.is_mature(ctx.time));
        ubd.entries = pending;

        let mut paid = Dec::zero();
        for entry in &mature {
            state
                .unbonding_queue
                .remove(entry.completion_time, &(delegator, validator));
            paid = paid.checked_add(entry.balance).ok_or(StakingError::Overflow)?;
        }
        state.set_unbonding_delegation(ubd);

        if mature.is_empty() {
            return Ok(paid);
        }
        state.remove_from_pool(BondStatus::Unbonded, paid)?;
        fx.transfer(STAKING_MODULE_ACCOUNT, delegator, paid);
        fx.emit(StakingEvent::UnbondingCompleted {
            delegator,
            validator,
            amount: paid,
        });
        info!(
            delegator = %delegator,
            validator = %validator,
            amount = %paid,
            "Unbonding completed"
        );
        Ok(paid)
    }

    /// Drop every matured entry of the triple. Returns the number dropped.
    pub(super) fn complete_redelegation(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        delegator: Address,
        src: Address,
        dst: Address,
    ) -> StakingResult<usize> {
        let mut red = state
            .redelegation(&delegator, &src, &dst)
            .cloned()
            .ok_or(StakingError::RedelegationNotFound {
                delegator,
                src,
                dst,
            })?;

        let before = red.entries.len();
        for entry in red.entries.iter().filter(|e| e.is_mature(ctx.time)) {
            state
                .redelegation_queue
                .remove(entry.completion_time, &(delegator, src, dst));
        }
        red.entries.retain(|entry| !entry.is_mature(ctx.time));
        let completed = before - red.entries.len();
        state.set_redelegation(red);

        if completed > 0 {
            fx.emit(StakingEvent::RedelegationCompleted {
                delegator,
                src,
                dst,
            });
            debug!(delegator = %delegator, src = %src, dst = %dst, "Redelegation completed");
        }
        Ok(completed)
    }

    fn completion_time(&self, ctx: BlockContext) -> StakingResult<u64> {
        ctx.time
            .checked_add(self.config.unbonding_time_secs)
            .ok_or(StakingError::Overflow)
    }

    /// Burn `shares` of `delegator` at `validator` and return the tokens
    /// released, already taken out of the validator's pool bucket. The
    /// release is zero when the shares are worth less than one unit.
    ///
    /// A self-delegation falling below the minimum jails the validator and,
    /// if bonded, starts its unbonding immediately.
    fn unbond(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        delegator: Address,
        validator: Address,
        shares: Dec,
    ) -> StakingResult<Dec> {
        if !shares.is_positive() {
            return Err(StakingError::InvalidAmount);
        }
        let mut delegation = state
            .delegation(&delegator, &validator)
            .cloned()
            .ok_or(StakingError::DelegationNotFound {
                delegator,
                validator,
            })?;
        delegation.shares = delegation.shares.checked_sub(shares).ok_or(
            StakingError::InsufficientShares {
                requested: shares,
                available: delegation.shares,
            },
        )?;

        let mut val = state.get_validator(&validator)?.clone();
        let amount = val.remove_del_shares(shares)?;
        state.remove_from_pool(val.status, amount)?;
        state.set_delegation(delegation);

        if delegator == val.self_delegator
            && self.enforce_min_self_bond(state, fx, ctx, &mut val)?
        {
            return Ok(amount);
        }

        if val.is_unbonded() && val.delegator_shares.is_zero() {
            state.remove_validator(&validator);
            state
                .history
                .record(validator, ctx.height, Dec::zero(), false);
            info!(operator = %validator, "Empty validator removed");
        } else {
            state.set_validator(val);
        }
        Ok(amount)
    }
}

fn add_delegation_shares(
    state: &mut StakingState,
    delegator: Address,
    validator: Address,
    shares: Dec,
) -> StakingResult<()> {
    let mut delegation = state
        .delegation(&delegator, &validator)
        .cloned()
        .unwrap_or(Delegation {
            delegator,
            validator,
            shares: Dec::zero(),
        });
    delegation.shares = delegation
        .shares
        .checked_add(shares)
        .ok_or(StakingError::Overflow)?;
    state.set_delegation(delegation);
    Ok(())
}
