//! # qc-18-staking
//!
//! Validator staking subsystem for Quantum-Chain.
//!
//! ## Architecture
//!
//! This subsystem owns the staking ledger: which accounts are validators,
//! how much stake is delegated to each, how stake bonds, unbonds and
//! redelegates, and how slashing propagates through in-flight withdrawals.
//! The consensus engine drives it once per block:
//!
//! ```text
//! Consensus ──deliver(msg)*──→ StakingService ──StakingEvent──→ [Event Bus]
//!           ──end_block────→                 ──transfer/burn──→ [Bank]
//!           ←─ValidatorUpdate[]─              ──snapshot──────→ [State Store]
//! Evidence  ──slash / jail──→
//! ```
//!
//! ### Determinism
//!
//! All arithmetic is fixed-point (`Dec`, 8 decimals) and every iteration
//! order is a total order over ordered maps, so independent replicas stay
//! bit-identical.
//!
//! ### Transactional Isolation
//!
//! Each operation either commits fully or leaves ledger, bank and event bus
//! untouched.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qc_18_staking::{StakingService, StakingDependencies, StakingConfig};
//! use qc_18_staking::ports::StakingApi;
//!
//! let service = StakingService::new(StakingDependencies {
//!     bank,
//!     event_bus,
//!     store,
//!     config: StakingConfig::default(),
//! })?;
//!
//! service.deliver(ctx, StakingMsg::Delegate { delegator, validator, amount })?;
//! let updates = service.end_block(ctx)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{InMemoryBank, InMemoryEventBus, InMemoryStateStore};
pub use config::StakingConfig;
pub use domain::{
    Address, BlockContext, BondStatus, CommissionRates, ConsensusPubKey, Dec, Delegation,
    Description, ErrorKind, GenesisState, MsgCreateValidator, MsgEditValidator, MsgResult, Pool,
    Redelegation, StakingError, StakingMsg, StakingResult, StakingState, UnbondingDelegation,
    Validator, ValidatorUpdate, STAKING_MODULE_ACCOUNT,
};
pub use events::StakingEvent;
pub use ports::{BankKeeper, EventBus, GovernanceQuery, StakingApi, StateStore};
pub use service::{StakingDependencies, StakingService};
