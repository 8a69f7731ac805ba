//! Validator registry operations

use super::{StakingService, TxEffects};
use crate::domain::{
    Address, BlockContext, BondStatus, Dec, Delegation, MsgCreateValidator, MsgEditValidator,
    MsgResult, StakingError, StakingResult, StakingState, Validator, STAKING_MODULE_ACCOUNT,
};
use crate::events::StakingEvent;
use crate::ports::{BankKeeper, EventBus, StateStore};
use tracing::{info, warn};

impl<B, E, S> StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    pub(super) fn create_validator(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        msg: MsgCreateValidator,
    ) -> StakingResult<MsgResult> {
        if state.validator(&msg.operator).is_some() {
            return Err(StakingError::ValidatorAlreadyExists(msg.operator));
        }
        if state.validator_by_pubkey(&msg.pubkey).is_some() {
            return Err(StakingError::PubKeyAlreadyInUse(msg.pubkey));
        }
        if msg.self_bond < self.config.min_self_delegation {
            return Err(StakingError::InsufficientSelfBond {
                amount: msg.self_bond,
                min: self.config.min_self_delegation,
            });
        }
        self.ensure_funds(&msg.delegator, msg.self_bond)?;

        let mut validator = Validator::new(
            msg.operator,
            msg.pubkey,
            msg.delegator,
            msg.description,
            msg.commission,
            ctx.time,
        );
        let shares = validator.add_tokens_from_del(msg.self_bond)?;

        state.add_to_pool(validator.status, msg.self_bond)?;
        state.set_validator(validator);
        state.set_delegation(Delegation {
            delegator: msg.delegator,
            validator: msg.operator,
            shares,
        });

        fx.transfer(msg.delegator, STAKING_MODULE_ACCOUNT, msg.self_bond);
        fx.emit(StakingEvent::ValidatorCreated {
            operator: msg.operator,
            self_delegator: msg.delegator,
            self_bond: msg.self_bond,
        });

        info!(
            operator = %msg.operator,
            self_delegator = %msg.delegator,
            self_bond = %msg.self_bond,
            height = ctx.height,
            "Validator created"
        );

        Ok(MsgResult::ValidatorCreated {
            operator: msg.operator,
            shares,
        })
    }

    pub(super) fn edit_validator(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        msg: MsgEditValidator,
    ) -> StakingResult<MsgResult> {
        let mut validator = state.get_validator(&msg.operator)?.clone();

        if let Some(description) = msg.description {
            validator.description = description;
        }
        if let Some(rate) = msg.commission_rate {
            validator.check_commission_change(
                rate,
                ctx.time,
                self.config.commission_update_interval_secs,
            )?;
            validator.commission.rate = rate;
            validator.commission.update_time = ctx.time;
        }

        let commission_rate = validator.commission.rate;
        state.set_validator(validator);

        fx.emit(StakingEvent::ValidatorEdited {
            operator: msg.operator,
            commission_rate,
        });
        info!(operator = %msg.operator, commission_rate = %commission_rate, "Validator edited");

        Ok(MsgResult::ValidatorEdited)
    }

    pub(super) fn apply_jail(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        operator: Address,
    ) -> StakingResult<()> {
        let mut validator = state.get_validator(&operator)?.clone();
        if validator.jailed {
            return Err(StakingError::ValidatorAlreadyJailed(operator));
        }
        validator.jailed = true;
        state.set_validator(validator);

        fx.emit(StakingEvent::ValidatorJailed { operator });
        warn!(operator = %operator, "Validator jailed");
        Ok(())
    }

    pub(super) fn unjail(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        operator: Address,
    ) -> StakingResult<()> {
        let mut validator = state.get_validator(&operator)?.clone();
        if !validator.jailed {
            return Err(StakingError::ValidatorNotJailed(operator));
        }
        let self_bond = self_bond_tokens(state, &validator)?;
        if self_bond < self.config.min_self_delegation {
            return Err(StakingError::InsufficientSelfBond {
                amount: self_bond,
                min: self.config.min_self_delegation,
            });
        }
        validator.jailed = false;
        state.set_validator(validator);

        fx.emit(StakingEvent::ValidatorUnjailed { operator });
        info!(operator = %operator, "Validator unjailed");
        Ok(())
    }

    /// Move a validator out of the bonded set, starting its unbonding clock.
    pub(super) fn begin_unbonding_validator(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        mut validator: Validator,
    ) -> StakingResult<()> {
        let completion_time = ctx
            .time
            .checked_add(self.config.unbonding_time_secs)
            .ok_or(StakingError::Overflow)?;

        state.move_pool(BondStatus::Bonded, BondStatus::Unbonding, validator.tokens)?;
        validator.status = BondStatus::Unbonding;
        validator.unbonding_height = ctx.height;
        validator.unbonding_completion_time = completion_time;
        state
            .validator_queue
            .insert(completion_time, validator.operator);

        fx.emit(StakingEvent::ValidatorStatusChanged {
            operator: validator.operator,
            from: BondStatus::Bonded,
            to: BondStatus::Unbonding,
            height: ctx.height,
        });
        info!(
            operator = %validator.operator,
            completion_time,
            "Validator left the bonded set"
        );
        state.set_validator(validator);
        Ok(())
    }

    /// Jail `val` once its self-delegation is worth less than the minimum.
    /// A bonded validator also starts unbonding, which stores it; returns
    /// true in that case so the caller does not overwrite it.
    pub(super) fn enforce_min_self_bond(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        val: &mut Validator,
    ) -> StakingResult<bool> {
        if val.jailed {
            return Ok(false);
        }
        let remaining = self_bond_tokens(state, val)?;
        if remaining >= self.config.min_self_delegation {
            return Ok(false);
        }

        val.jailed = true;
        fx.emit(StakingEvent::ValidatorJailed {
            operator: val.operator,
        });
        warn!(
            operator = %val.operator,
            self_bond = %remaining,
            min = %self.config.min_self_delegation,
            "Self-bond below minimum, validator jailed"
        );
        if val.is_bonded() {
            self.begin_unbonding_validator(state, fx, ctx, val.clone())?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Token value of the validator's self-delegation.
fn self_bond_tokens(state: &StakingState, validator: &Validator) -> StakingResult<Dec> {
    match state.delegation(&validator.self_delegator, &validator.operator) {
        Some(delegation) => validator.tokens_from_shares(delegation.shares),
        None => Ok(Dec::zero()),
    }
}
