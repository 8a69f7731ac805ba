//! Slashing engine

use super::{StakingService, TxEffects};
use crate::domain::{
    entry_loss, in_slash_window, order_slash_targets, slash_base_tokens, validate_fraction,
    Address, BlockContext, BondStatus, Dec, PairKey, SlashRecord, SlashTarget, StakingError,
    StakingResult, StakingState, TripleKey,
};
use crate::events::StakingEvent;
use crate::metrics;
use crate::ports::{BankKeeper, EventBus, StateStore};
use tracing::{debug, warn};

impl<B, E, S> StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    /// Slash `validator` and its exposed queue entries. Returns tokens burned.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn apply_slash(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        validator: Address,
        infraction_height: u64,
        infraction_power: u64,
        fraction: Dec,
    ) -> StakingResult<Dec> {
        validate_fraction(fraction)?;
        let mut val = state.get_validator(&validator)?.clone();

        let base = slash_base_tokens(
            infraction_height,
            ctx.height,
            val.tokens,
            state.history.tokens_at(&validator, infraction_height),
            infraction_power,
        )?;
        let slash_amount = base.mul_truncate(fraction).ok_or(StakingError::Overflow)?;

        let removed = val.remove_tokens(slash_amount);
        state.remove_from_pool(val.status, removed)?;
        state.set_validator(val);
        let mut burned = removed;

        let targets = self.exposed_entries(state, &validator, infraction_height);
        for target in targets {
            let lost = match target.record {
                SlashRecord::Unbonding(key) => slash_unbonding_entry(state, key, target, fraction)?,
                SlashRecord::Redelegation(key) => {
                    self.slash_redelegation_entry(state, fx, ctx, key, target, fraction)?
                }
            };
            burned = burned.checked_add(lost).ok_or(StakingError::Overflow)?;
        }

        fx.burn(burned);
        fx.emit(StakingEvent::Slashed {
            validator,
            infraction_height,
            fraction,
            burned,
        });
        metrics::record_slash(burned.truncate_int());
        warn!(
            validator = %validator,
            infraction_height,
            fraction = %fraction,
            base = %base,
            burned = %burned,
            "Validator slashed"
        );
        Ok(burned)
    }

    /// Queue entries of `validator` created inside the lookback window, in walk order.
    fn exposed_entries(
        &self,
        state: &StakingState,
        validator: &Address,
        infraction_height: u64,
    ) -> Vec<SlashTarget> {
        let period = self.config.unbonding_period_blocks;
        let mut targets = Vec::new();

        for ubd in state.unbonding_delegations_from(validator) {
            for entry in &ubd.entries {
                if in_slash_window(entry.creation_height, infraction_height, period) {
                    targets.push(SlashTarget {
                        creation_height: entry.creation_height,
                        id: entry.id,
                        completion_time: entry.completion_time,
                        record: SlashRecord::Unbonding((ubd.delegator, ubd.validator)),
                    });
                }
            }
        }
        for red in state.redelegations_from(validator) {
            for entry in &red.entries {
                if in_slash_window(entry.creation_height, infraction_height, period) {
                    targets.push(SlashTarget {
                        creation_height: entry.creation_height,
                        id: entry.id,
                        completion_time: entry.completion_time,
                        record: SlashRecord::Redelegation((
                            red.delegator,
                            red.validator_src,
                            red.validator_dst,
                        )),
                    });
                }
            }
        }

        order_slash_targets(&mut targets);
        targets
    }

    /// Reduce one redelegation entry by unbonding the matching share of its
    /// destination stake. Returns the destination tokens burned.
    fn slash_redelegation_entry(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        key: TripleKey,
        target: SlashTarget,
        fraction: Dec,
    ) -> StakingResult<Dec> {
        let (delegator, src, dst) = key;
        let Some(mut red) = state.redelegation(&delegator, &src, &dst).cloned() else {
            return Ok(Dec::zero());
        };
        let Some(idx) = red.entries.iter().position(|e| e.id == target.id) else {
            return Ok(Dec::zero());
        };

        let entry = &mut red.entries[idx];
        let loss = entry_loss(entry.initial_balance, entry.balance, fraction)?;
        let wanted = entry
            .shares_dst
            .mul_truncate(fraction)
            .ok_or(StakingError::Overflow)?;
        entry.balance = entry.balance.saturating_sub(loss);
        entry.shares_dst = entry.shares_dst.saturating_sub(wanted);
        let emptied = entry.balance.is_zero();
        if emptied {
            red.entries.remove(idx);
            state.redelegation_queue.remove(target.completion_time, &key);
        }
        state.set_redelegation(red);

        // The delegator may have moved the stake on since; only what is still
        // delegated to dst can be unbonded.
        let Some(mut delegation) = state.delegation(&delegator, &dst).cloned() else {
            return Ok(Dec::zero());
        };
        let shares = wanted.min(delegation.shares);
        if shares.is_zero() {
            return Ok(Dec::zero());
        }
        let mut dst_val = state.get_validator(&dst)?.clone();
        let burned = dst_val.remove_del_shares(shares)?;
        state.remove_from_pool(dst_val.status, burned)?;
        delegation.shares = delegation.shares.saturating_sub(shares);
        state.set_delegation(delegation);

        let unbonding_started = delegator == dst_val.self_delegator
            && self.enforce_min_self_bond(state, fx, ctx, &mut dst_val)?;
        if !unbonding_started {
            if dst_val.is_unbonded() && dst_val.delegator_shares.is_zero() {
                state.remove_validator(&dst);
                state.history.record(dst, ctx.height, Dec::zero(), false);
            } else {
                state.set_validator(dst_val);
            }
        }

        debug!(
            delegator = %delegator,
            src = %src,
            dst = %dst,
            loss = %loss,
            burned = %burned,
            "Redelegation entry slashed"
        );
        Ok(burned)
    }
}

/// Reduce one unbonding entry; an emptied entry is dropped without payout.
fn slash_unbonding_entry(
    state: &mut StakingState,
    key: PairKey,
    target: SlashTarget,
    fraction: Dec,
) -> StakingResult<Dec> {
    let Some(mut ubd) = state.unbonding_delegation(&key.0, &key.1).cloned() else {
        return Ok(Dec::zero());
    };
    let Some(idx) = ubd.entries.iter().position(|e| e.id == target.id) else {
        return Ok(Dec::zero());
    };

    let entry = &mut ubd.entries[idx];
    let loss = entry_loss(entry.initial_balance, entry.balance, fraction)?;
    entry.balance = entry.balance.saturating_sub(loss);
    if entry.balance.is_zero() {
        ubd.entries.remove(idx);
        state.unbonding_queue.remove(target.completion_time, &key);
    }
    state.set_unbonding_delegation(ubd);
    state.remove_from_pool(BondStatus::Unbonded, loss)?;

    debug!(delegator = %key.0, validator = %key.1, loss = %loss, "Unbonding entry slashed");
    Ok(loss)
}
