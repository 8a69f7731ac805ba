//! Driving ports (Inbound API)

use crate::domain::{
    Address, BlockContext, Dec, GenesisState, MsgResult, StakingMsg, StakingResult,
    ValidatorUpdate,
};

/// Primary Staking API, driven by the consensus engine and the evidence handler.
pub trait StakingApi: Send + Sync {
    /// Execute one transaction message. Either every effect commits or none do.
    fn deliver(&self, ctx: BlockContext, msg: StakingMsg) -> StakingResult<MsgResult>;

    /// Penalize `validator` for an infraction at `infraction_height`.
    /// Returns the tokens burned.
    fn slash(
        &self,
        ctx: BlockContext,
        validator: Address,
        infraction_height: u64,
        infraction_power: u64,
        fraction: Dec,
    ) -> StakingResult<Dec>;

    /// Suspend a validator from the bonded set without touching its tokens.
    fn jail(&self, ctx: BlockContext, operator: Address) -> StakingResult<()>;

    /// Run the end-of-block validator-set update. Never returns `None`-like
    /// output: an unchanged set yields an empty list.
    fn end_block(&self, ctx: BlockContext) -> StakingResult<Vec<ValidatorUpdate>>;

    /// Load the genesis ledger and return the initial validator set.
    fn init_genesis(
        &self,
        ctx: BlockContext,
        genesis: GenesisState,
    ) -> StakingResult<Vec<ValidatorUpdate>>;
}

/// Read-only stake queries for governance tallying.
///
/// Only finalized heights are answerable.
pub trait GovernanceQuery: Send + Sync {
    fn voting_power(&self, validator: &Address, at_height: u64) -> StakingResult<Dec>;

    fn total_bonded_tokens(&self, at_height: u64) -> StakingResult<Dec>;
}
