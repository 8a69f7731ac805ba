//! Cross-block staking scenarios

pub mod ledger_properties;
pub mod staking_flows;
