//! Events layer
//!
//! Staking publishes one event per ledger transition. Events produced while
//! executing a message are buffered and only reach the bus once the message
//! has committed.

mod published;

pub use published::*;
