//! # Slashing Rules
//!
//! Pure pieces of the slashing algorithm; the service applies them to the
//! ledger and the bank.
//!
//! ## Lookback Window
//!
//! Stake that began leaving a validator at or after
//! `infraction_height - unbonding_period_blocks` was still exposed when the
//! infraction happened, so unbonding and redelegation entries created in
//! that window are slashed alongside the validator.
//!
//! ## Walk Order
//!
//! Entries are visited by ascending creation height, ties broken by the
//! ledger-wide insertion id.

use super::{Dec, PairKey, StakingError, StakingResult, TripleKey};

/// First creation height still exposed to an infraction at `infraction_height`.
pub fn slash_window_start(infraction_height: u64, unbonding_period_blocks: u64) -> u64 {
    infraction_height.saturating_sub(unbonding_period_blocks)
}

/// Whether an entry created at `creation_height` is slashable.
pub fn in_slash_window(
    creation_height: u64,
    infraction_height: u64,
    unbonding_period_blocks: u64,
) -> bool {
    creation_height >= slash_window_start(infraction_height, unbonding_period_blocks)
}

/// `fraction` must lie in `[0, 1]`.
pub fn validate_fraction(fraction: Dec) -> StakingResult<()> {
    if fraction > Dec::one() {
        return Err(StakingError::InvalidFraction(fraction));
    }
    Ok(())
}

/// Loss of one queue entry: `min(fraction * initial_balance, balance)`.
pub fn entry_loss(initial_balance: Dec, balance: Dec, fraction: Dec) -> StakingResult<Dec> {
    let loss = initial_balance
        .mul_truncate(fraction)
        .ok_or(StakingError::Overflow)?;
    Ok(loss.min(balance))
}

/// Queue entry visited by the slash walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlashTarget {
    pub creation_height: u64,
    pub id: u64,
    pub completion_time: u64,
    pub record: SlashRecord,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlashRecord {
    Unbonding(PairKey),
    Redelegation(TripleKey),
}

/// Sort into walk order.
pub fn order_slash_targets(targets: &mut [SlashTarget]) {
    targets.sort_by_key(|t| (t.creation_height, t.id));
}

/// Tokens a slash is priced on.
///
/// An infraction in the current block uses live tokens. An older one uses
/// the historical snapshot, falling back to the power reported by the
/// evidence when history no longer reaches that height.
pub fn slash_base_tokens(
    infraction_height: u64,
    current_height: u64,
    live_tokens: Dec,
    historical_tokens: Option<Dec>,
    infraction_power: u64,
) -> StakingResult<Dec> {
    if infraction_height > current_height {
        return Err(StakingError::FutureInfraction {
            infraction_height,
            current_height,
        });
    }
    if infraction_height == current_height {
        return Ok(live_tokens);
    }
    Ok(historical_tokens.unwrap_or_else(|| Dec::from_int(infraction_power)))
}
