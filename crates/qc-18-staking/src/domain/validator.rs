//! Validator share accounting
//!
//! Shares are a claim on the validator's token pool. Conversions in both
//! directions floor, so delegating and undelegating can only ever leave the
//! exchange rate where it was or nudge it upward; slashing is the only way
//! the rate drops.

use super::{
    Address, BondStatus, Commission, CommissionRates, ConsensusPubKey, Dec, Description,
    StakingError, StakingResult,
};
use super::entities::Validator;

/// Ordering key of the power index: tokens descending, operator ascending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PowerRank {
    pub tokens: std::cmp::Reverse<Dec>,
    pub operator: Address,
}

impl Validator {
    /// A new `Unbonded` validator with no tokens.
    pub fn new(
        operator: Address,
        consensus_pubkey: ConsensusPubKey,
        self_delegator: Address,
        description: Description,
        commission: CommissionRates,
        now: u64,
    ) -> Self {
        Self {
            operator,
            consensus_pubkey,
            self_delegator,
            jailed: false,
            status: BondStatus::Unbonded,
            tokens: Dec::zero(),
            delegator_shares: Dec::zero(),
            description,
            commission: commission.into_commission(now),
            unbonding_height: 0,
            unbonding_completion_time: 0,
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    pub fn is_unbonded(&self) -> bool {
        self.status == BondStatus::Unbonded
    }

    /// Consensus voting power: whole tokens.
    pub fn power(&self) -> u64 {
        u64::try_from(self.tokens.truncate_int()).unwrap_or(u64::MAX)
    }

    /// Power reported to consensus; zero unless bonded.
    pub fn bonded_power(&self) -> u64 {
        if self.is_bonded() {
            self.power()
        } else {
            0
        }
    }

    pub fn power_rank(&self) -> PowerRank {
        PowerRank {
            tokens: std::cmp::Reverse(self.tokens),
            operator: self.operator,
        }
    }

    /// `tokens / delegator_shares`; `1` when no shares are outstanding.
    pub fn exchange_rate(&self) -> Dec {
        if self.delegator_shares.is_zero() {
            return Dec::one();
        }
        self.tokens
            .quo_truncate(self.delegator_shares)
            .unwrap_or_else(Dec::zero)
    }

    /// Shares that `amount` tokens would buy at the current rate.
    pub fn shares_from_tokens(&self, amount: Dec) -> StakingResult<Dec> {
        if self.delegator_shares.is_zero() {
            return Ok(amount);
        }
        if self.tokens.is_zero() {
            return Err(StakingError::ValidatorInsolvent(self.operator));
        }
        amount
            .mul_div_floor(self.delegator_shares, self.tokens)
            .ok_or(StakingError::Overflow)
    }

    /// Tokens that `shares` are worth at the current rate.
    pub fn tokens_from_shares(&self, shares: Dec) -> StakingResult<Dec> {
        if shares >= self.delegator_shares {
            return Ok(self.tokens);
        }
        shares
            .mul_div_floor(self.tokens, self.delegator_shares)
            .ok_or(StakingError::Overflow)
    }

    /// Add delegated tokens, issuing shares. Returns the shares issued.
    pub fn add_tokens_from_del(&mut self, amount: Dec) -> StakingResult<Dec> {
        let issued = self.shares_from_tokens(amount)?;
        let tokens = self.tokens.checked_add(amount).ok_or(StakingError::Overflow)?;
        let shares = self
            .delegator_shares
            .checked_add(issued)
            .ok_or(StakingError::Overflow)?;
        self.tokens = tokens;
        self.delegator_shares = shares;
        Ok(issued)
    }

    /// Burn `shares`, releasing their tokens. Returns the tokens released.
    ///
    /// Removing the last outstanding shares releases every remaining token
    /// so no dust is stranded on an empty validator.
    pub fn remove_del_shares(&mut self, shares: Dec) -> StakingResult<Dec> {
        let remaining = self.delegator_shares.checked_sub(shares).ok_or(
            StakingError::InsufficientShares {
                requested: shares,
                available: self.delegator_shares,
            },
        )?;
        let released = if remaining.is_zero() {
            self.tokens
        } else {
            self.tokens_from_shares(shares)?
        };
        self.tokens = self.tokens.saturating_sub(released);
        self.delegator_shares = remaining;
        Ok(released)
    }

    /// Remove up to `amount` tokens without touching shares (slashing).
    /// Returns the tokens actually removed.
    pub fn remove_tokens(&mut self, amount: Dec) -> Dec {
        let removed = amount.min(self.tokens);
        self.tokens = self.tokens.saturating_sub(removed);
        removed
    }

    /// Validate a commission rate change at block time `now`.
    pub fn check_commission_change(
        &self,
        new_rate: Dec,
        now: u64,
        update_interval_secs: u64,
    ) -> StakingResult<()> {
        let Commission {
            rate,
            max_rate,
            max_change_rate,
            update_time,
        } = &self.commission;

        let next_allowed = update_time.saturating_add(update_interval_secs);
        if now < next_allowed {
            return Err(StakingError::CommissionUpdatePeriodNotElapsed {
                last_update: *update_time,
                next_allowed,
            });
        }
        if new_rate > *max_rate {
            return Err(StakingError::CommissionRateOutOfBounds(format!(
                "rate {} exceeds max rate {}",
                new_rate, max_rate
            )));
        }
        let change = if new_rate > *rate {
            new_rate.saturating_sub(*rate)
        } else {
            rate.saturating_sub(new_rate)
        };
        if change > *max_change_rate {
            return Err(StakingError::CommissionRateOutOfBounds(format!(
                "change {} exceeds max change rate {}",
                change, max_change_rate
            )));
        }
        Ok(())
    }
}
