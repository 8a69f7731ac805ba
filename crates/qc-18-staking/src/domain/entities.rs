//! Staking ledger entities.

use super::decimal::Dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account or validator-operator identity.
///
/// Operator and account addresses share one representation; a validator's
/// operator address is also the account that owns its self-bond unless the
/// validator was created on behalf of another account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Account holding every token owned by the staking subsystem
/// (bonded, not-bonded and pending unbonding balances).
pub const STAKING_MODULE_ACCOUNT: Address = Address(*b"qc-18-staking-module");

/// Consensus (block-signing) public key of a validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConsensusPubKey(pub [u8; 32]);

impl fmt::Display for ConsensusPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Validator participation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

impl fmt::Display for BondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BondStatus::Unbonded => "unbonded",
            BondStatus::Unbonding => "unbonding",
            BondStatus::Bonded => "bonded",
        };
        f.write_str(name)
    }
}

/// Free-form validator metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub moniker: String,
    pub identity: String,
    pub website: String,
    pub details: String,
}

pub const MAX_MONIKER_LENGTH: usize = 70;
pub const MAX_IDENTITY_LENGTH: usize = 3000;
pub const MAX_WEBSITE_LENGTH: usize = 140;
pub const MAX_DETAILS_LENGTH: usize = 280;

impl Description {
    pub fn new(moniker: &str, identity: &str, website: &str, details: &str) -> Self {
        Self {
            moniker: moniker.to_string(),
            identity: identity.to_string(),
            website: website.to_string(),
            details: details.to_string(),
        }
    }

    /// Check field lengths; returns the offending field on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.moniker.is_empty() {
            return Err("moniker must not be empty".to_string());
        }
        let limits = [
            ("moniker", self.moniker.len(), MAX_MONIKER_LENGTH),
            ("identity", self.identity.len(), MAX_IDENTITY_LENGTH),
            ("website", self.website.len(), MAX_WEBSITE_LENGTH),
            ("details", self.details.len(), MAX_DETAILS_LENGTH),
        ];
        for (field, len, max) in limits {
            if len > max {
                return Err(format!("{field} too long: {len} > {max}"));
            }
        }
        Ok(())
    }
}

/// Commission terms of a validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub rate: Dec,
    pub max_rate: Dec,
    pub max_change_rate: Dec,
    /// Block time (unix seconds) of the last rate change.
    pub update_time: u64,
}

/// Commission terms supplied on validator creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate: Dec,
    pub max_rate: Dec,
    pub max_change_rate: Dec,
}

impl CommissionRates {
    pub fn new(rate: Dec, max_rate: Dec, max_change_rate: Dec) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    /// `0 <= rate <= max_rate <= 1` and `max_change_rate <= max_rate`.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_rate > Dec::one() {
            return Err(format!("max rate {} exceeds 1", self.max_rate));
        }
        if self.rate > self.max_rate {
            return Err(format!(
                "rate {} exceeds max rate {}",
                self.rate, self.max_rate
            ));
        }
        if self.max_change_rate > self.max_rate {
            return Err(format!(
                "max change rate {} exceeds max rate {}",
                self.max_change_rate, self.max_rate
            ));
        }
        Ok(())
    }

    pub fn into_commission(self, now: u64) -> Commission {
        Commission {
            rate: self.rate,
            max_rate: self.max_rate,
            max_change_rate: self.max_change_rate,
            update_time: now,
        }
    }
}

/// Canonical validator record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: Address,
    pub consensus_pubkey: ConsensusPubKey,
    /// Account owning the self-delegation.
    pub self_delegator: Address,
    pub jailed: bool,
    pub status: BondStatus,
    pub tokens: Dec,
    pub delegator_shares: Dec,
    pub description: Description,
    pub commission: Commission,
    pub unbonding_height: u64,
    pub unbonding_completion_time: u64,
}

/// `(delegator, validator) -> shares`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: Address,
    pub shares: Dec,
}

/// One pending withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingEntry {
    /// Ledger-wide insertion sequence, used as the slash-walk tie-break.
    pub id: u64,
    pub creation_height: u64,
    pub completion_time: u64,
    pub initial_balance: Dec,
    pub balance: Dec,
}

impl UnbondingEntry {
    pub fn is_mature(&self, now: u64) -> bool {
        self.completion_time <= now
    }
}

/// All pending withdrawals of a `(delegator, validator)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    pub delegator: Address,
    pub validator: Address,
    pub entries: Vec<UnbondingEntry>,
}

impl UnbondingDelegation {
    pub fn new(delegator: Address, validator: Address) -> Self {
        Self {
            delegator,
            validator,
            entries: Vec::new(),
        }
    }

    /// Whether an entry maturing at `completion_time` can be recorded
    /// without exceeding `max_entries` distinct completion times.
    pub fn can_add(&self, completion_time: u64, max_entries: usize) -> bool {
        self.entries
            .iter()
            .any(|e| e.completion_time == completion_time)
            || self.entries.len() < max_entries
    }

    /// Merge into the entry with the same completion time, or append.
    ///
    /// Callers check `can_add` first. Returns `false` on balance overflow.
    pub fn add_entry(
        &mut self,
        id: u64,
        creation_height: u64,
        completion_time: u64,
        balance: Dec,
    ) -> bool {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.completion_time == completion_time)
        {
            match (
                entry.initial_balance.checked_add(balance),
                entry.balance.checked_add(balance),
            ) {
                (Some(initial), Some(current)) => {
                    entry.initial_balance = initial;
                    entry.balance = current;
                    entry.creation_height = entry.creation_height.min(creation_height);
                    true
                }
                _ => false,
            }
        } else {
            self.entries.push(UnbondingEntry {
                id,
                creation_height,
                completion_time,
                initial_balance: balance,
                balance,
            });
            true
        }
    }

    pub fn total_balance(&self) -> Option<Dec> {
        self.entries
            .iter()
            .try_fold(Dec::zero(), |acc, e| acc.checked_add(e.balance))
    }
}

/// One in-flight redelegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    pub id: u64,
    pub creation_height: u64,
    pub completion_time: u64,
    pub initial_balance: Dec,
    pub balance: Dec,
    /// Shares issued at the destination validator.
    pub shares_dst: Dec,
}

impl RedelegationEntry {
    pub fn is_mature(&self, now: u64) -> bool {
        self.completion_time <= now
    }
}

/// Slashing exposure of a `(delegator, src, dst)` triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    pub delegator: Address,
    pub validator_src: Address,
    pub validator_dst: Address,
    pub entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    pub fn new(delegator: Address, validator_src: Address, validator_dst: Address) -> Self {
        Self {
            delegator,
            validator_src,
            validator_dst,
            entries: Vec::new(),
        }
    }

    pub fn can_add(&self, completion_time: u64, max_entries: usize) -> bool {
        self.entries
            .iter()
            .any(|e| e.completion_time == completion_time)
            || self.entries.len() < max_entries
    }

    /// Merge into the entry with the same completion time, or append.
    /// Returns `false` on overflow.
    pub fn add_entry(
        &mut self,
        id: u64,
        creation_height: u64,
        completion_time: u64,
        balance: Dec,
        shares_dst: Dec,
    ) -> bool {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.completion_time == completion_time)
        {
            match (
                entry.initial_balance.checked_add(balance),
                entry.balance.checked_add(balance),
                entry.shares_dst.checked_add(shares_dst),
            ) {
                (Some(initial), Some(current), Some(shares)) => {
                    entry.initial_balance = initial;
                    entry.balance = current;
                    entry.shares_dst = shares;
                    entry.creation_height = entry.creation_height.min(creation_height);
                    true
                }
                _ => false,
            }
        } else {
            self.entries.push(RedelegationEntry {
                id,
                creation_height,
                completion_time,
                initial_balance: balance,
                balance,
                shares_dst,
            });
            true
        }
    }
}

/// Aggregate token buckets of the staking module account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Tokens of `Bonded` validators.
    pub bonded_tokens: Dec,
    /// Tokens of non-bonded validators plus pending unbonding balances.
    pub not_bonded_tokens: Dec,
}

impl Pool {
    pub fn total(&self) -> Option<Dec> {
        self.bonded_tokens.checked_add(self.not_bonded_tokens)
    }
}

/// Voting-power change reported to the consensus engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub pubkey: ConsensusPubKey,
    /// Whole bonded tokens; `0` removes the validator from the active set.
    pub power: u64,
}

/// Height and time of the block being executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    /// Unix seconds.
    pub time: u64,
}

impl BlockContext {
    pub fn new(height: u64, time: u64) -> Self {
        Self { height, time }
    }
}
