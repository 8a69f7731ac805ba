//! Staking Service - Core business logic
//!
//! # Architecture
//! - Every operation runs inside `transact`: the ledger is snapshotted first
//!   and restored if the operation fails, so a rejected message leaves no
//!   trace.
//! - Bank movements and events are buffered in `TxEffects` while the ledger
//!   is mutated and only released once the operation has succeeded.
//! - Status transitions happen in `end_block`, with one exception: a
//!   self-delegation dropping below the minimum forces the validator out of
//!   the bonded set immediately.

mod delegation;
mod end_block;
mod queries;
mod slashing;
mod validators;

use crate::config::StakingConfig;
use crate::domain::{
    Address, BlockContext, Dec, GenesisState, MsgResult, StakingError, StakingMsg,
    StakingResult, StakingState, ValidatorUpdate, STAKING_MODULE_ACCOUNT,
};
use crate::events::StakingEvent;
use crate::metrics;
use crate::ports::{BankKeeper, EventBus, StakingApi, StateStore};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Staking Service
pub struct StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    bank: Arc<B>,
    event_bus: Arc<E>,
    store: Arc<S>,
    state: RwLock<StakingState>,
    config: StakingConfig,
}

/// Dependencies for StakingService
pub struct StakingDependencies<B, E, S> {
    pub bank: Arc<B>,
    pub event_bus: Arc<E>,
    pub store: Arc<S>,
    pub config: StakingConfig,
}

/// Bank movement deferred until the operation commits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BankOp {
    Transfer {
        from: Address,
        to: Address,
        amount: Dec,
    },
    Burn {
        amount: Dec,
    },
}

/// Side effects collected while an operation mutates the ledger.
#[derive(Debug, Default)]
pub(crate) struct TxEffects {
    bank: Vec<BankOp>,
    events: Vec<StakingEvent>,
}

impl TxEffects {
    fn transfer(&mut self, from: Address, to: Address, amount: Dec) {
        if amount.is_positive() {
            self.bank.push(BankOp::Transfer { from, to, amount });
        }
    }

    fn burn(&mut self, amount: Dec) {
        if amount.is_positive() {
            self.bank.push(BankOp::Burn { amount });
        }
    }

    fn emit(&mut self, event: StakingEvent) {
        self.events.push(event);
    }
}

impl<B, E, S> StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    /// Create a service over an empty ledger
    pub fn new(deps: StakingDependencies<B, E, S>) -> StakingResult<Self> {
        Self::with_state(deps, StakingState::new())
    }

    /// Create a service over an existing ledger
    pub fn with_state(
        deps: StakingDependencies<B, E, S>,
        state: StakingState,
    ) -> StakingResult<Self> {
        deps.config.validate()?;
        Ok(Self {
            bank: deps.bank,
            event_bus: deps.event_bus,
            store: deps.store,
            state: RwLock::new(state),
            config: deps.config,
        })
    }

    /// Resume from the latest snapshot in the store, or start empty.
    pub fn restore(deps: StakingDependencies<B, E, S>) -> StakingResult<Self> {
        let state = match deps.store.latest_height()? {
            Some(height) => {
                let bytes = deps.store.load(height)?.ok_or_else(|| {
                    StakingError::Store(format!("snapshot at height {height} vanished"))
                })?;
                let state = StakingState::decode(&bytes)?;
                info!(height, validators = state.validator_count(), "Restored staking ledger");
                state
            }
            None => StakingState::new(),
        };
        Self::with_state(deps, state)
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    /// Copy of the current ledger
    pub fn snapshot(&self) -> StakingState {
        self.state.read().clone()
    }

    /// Run `op` against the ledger with all-or-nothing semantics.
    fn transact<T>(
        &self,
        op_name: &'static str,
        op: impl FnOnce(&mut StakingState, &mut TxEffects) -> StakingResult<T>,
    ) -> StakingResult<T> {
        let mut state = self.state.write();
        let checkpoint = state.clone();
        let mut effects = TxEffects::default();

        let result = op(&mut state, &mut effects).and_then(|value| {
            self.apply_bank_ops(&effects.bank)?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                drop(state);
                self.publish(effects.events);
                Ok(value)
            }
            Err(err) => {
                *state = checkpoint;
                metrics::record_rollback(err.kind().as_str());
                if err.is_fatal() {
                    error!(op = op_name, error = %err, "Staking ledger corruption");
                } else {
                    debug!(op = op_name, error = %err, "Staking operation rejected");
                }
                Err(err)
            }
        }
    }

    fn apply_bank_ops(&self, ops: &[BankOp]) -> StakingResult<()> {
        for op in ops {
            match op {
                BankOp::Transfer { from, to, amount } => {
                    self.bank.transfer(from, to, *amount)?;
                }
                BankOp::Burn { amount } => {
                    self.bank.burn(&STAKING_MODULE_ACCOUNT, *amount)?;
                }
            }
        }
        Ok(())
    }

    fn publish(&self, events: Vec<StakingEvent>) {
        for event in events {
            let name = event.name();
            match self.event_bus.publish(event) {
                Ok(()) => metrics::record_event_published(name),
                Err(e) => warn!(event = name, error = %e, "Failed to publish staking event"),
            }
        }
    }

    /// Fail unless `account` can cover `amount`.
    fn ensure_funds(&self, account: &Address, amount: Dec) -> StakingResult<()> {
        let available = self.bank.balance(account);
        if available < amount {
            return Err(StakingError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    fn dispatch(
        &self,
        state: &mut StakingState,
        fx: &mut TxEffects,
        ctx: BlockContext,
        msg: StakingMsg,
    ) -> StakingResult<MsgResult> {
        match msg {
            StakingMsg::CreateValidator(msg) => self.create_validator(state, fx, ctx, msg),
            StakingMsg::EditValidator(msg) => self.edit_validator(state, fx, ctx, msg),
            StakingMsg::Delegate {
                delegator,
                validator,
                amount,
            } => self
                .delegate(state, fx, delegator, validator, amount)
                .map(|shares| MsgResult::Delegated { shares }),
            StakingMsg::Undelegate {
                delegator,
                validator,
                shares,
            } => self.undelegate(state, fx, ctx, delegator, validator, shares),
            StakingMsg::BeginRedelegate {
                delegator,
                src,
                dst,
                shares,
            } => self.begin_redelegate(state, fx, ctx, delegator, src, dst, shares),
            StakingMsg::CompleteUnbonding {
                delegator,
                validator,
            } => {
                let amount = self.complete_unbonding(state, fx, ctx, delegator, validator)?;
                Ok(MsgResult::UnbondingCompleted { amount })
            }
            StakingMsg::CompleteRedelegation {
                delegator,
                src,
                dst,
            } => {
                let entries = self.complete_redelegation(state, fx, ctx, delegator, src, dst)?;
                Ok(MsgResult::RedelegationCompleted { entries })
            }
            StakingMsg::Unjail { operator } => {
                self.unjail(state, fx, operator)?;
                Ok(MsgResult::Unjailed)
            }
        }
    }
}

impl<B, E, S> StakingApi for StakingService<B, E, S>
where
    B: BankKeeper,
    E: EventBus,
    S: StateStore,
{
    fn deliver(&self, ctx: BlockContext, msg: StakingMsg) -> StakingResult<MsgResult> {
        let msg_type = msg.type_name();
        let result = msg
            .validate_basic()
            .and_then(|()| self.transact(msg_type, |state, fx| self.dispatch(state, fx, ctx, msg)));
        metrics::record_message(msg_type, result.is_ok());
        result
    }

    fn slash(
        &self,
        ctx: BlockContext,
        validator: Address,
        infraction_height: u64,
        infraction_power: u64,
        fraction: Dec,
    ) -> StakingResult<Dec> {
        self.transact("slash", |state, fx| {
            self.apply_slash(
                state,
                fx,
                ctx,
                validator,
                infraction_height,
                infraction_power,
                fraction,
            )
        })
    }

    fn jail(&self, _ctx: BlockContext, operator: Address) -> StakingResult<()> {
        self.transact("jail", |state, fx| self.apply_jail(state, fx, operator))
    }

    fn end_block(&self, ctx: BlockContext) -> StakingResult<Vec<ValidatorUpdate>> {
        let updates = self.transact("end_block", |state, fx| {
            self.apply_end_block(state, fx, ctx)
        })?;
        self.after_commit(ctx)?;
        Ok(updates)
    }

    fn init_genesis(
        &self,
        ctx: BlockContext,
        genesis: GenesisState,
    ) -> StakingResult<Vec<ValidatorUpdate>> {
        let updates = self.transact("init_genesis", |state, fx| {
            self.apply_genesis(state, fx, ctx, genesis)
        })?;
        self.after_commit(ctx)?;
        Ok(updates)
    }
}
