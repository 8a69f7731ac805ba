//! Domain layer for the Staking subsystem
//!
//! Pure state-machine types; nothing here touches the bank or the event bus.
//!
//! - decimal: fixed-precision token arithmetic
//! - entities: validators, delegations, queue records, pool
//! - validator: share accounting and commission rules
//! - queue: time-ordered maturity queues
//! - history: height-indexed power snapshots
//! - slashing: lookback window and entry loss rules
//! - state: the ledger and its indexes
//! - invariants: ledger consistency checks

mod decimal;
mod entities;
mod errors;
mod genesis;
mod history;
mod invariants;
mod msgs;
mod queue;
mod slashing;
mod state;
mod validator;

pub use decimal::*;
pub use entities::*;
pub use errors::*;
pub use genesis::*;
pub use history::*;
pub use invariants::*;
pub use msgs::*;
pub use queue::*;
pub use slashing::*;
pub use state::*;
pub use validator::*;
