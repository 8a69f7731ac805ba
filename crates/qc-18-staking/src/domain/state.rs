//! The staking ledger
//!
//! `StakingState` owns every record of the subsystem. Primary records live
//! in ordered maps so that every iteration is a total order independent of
//! hashing. Secondary indexes (power ranking, per-validator unbonding and
//! redelegation lookups) are derived data: they are not serialized and are
//! rebuilt by `decode`.

use super::{
    Address, BondStatus, ConsensusPubKey, Dec, Delegation, MaturityQueue, Pool, PowerHistory,
    PowerRank, Redelegation, StakingError, StakingResult, UnbondingDelegation, Validator,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `(delegator, validator)`
pub type PairKey = (Address, Address);

/// `(delegator, validator_src, validator_dst)`
pub type TripleKey = (Address, Address, Address);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingState {
    validators: BTreeMap<Address, Validator>,
    pubkeys: BTreeMap<ConsensusPubKey, Address>,
    delegations: BTreeMap<PairKey, Delegation>,
    unbonding_delegations: BTreeMap<PairKey, UnbondingDelegation>,
    redelegations: BTreeMap<TripleKey, Redelegation>,

    #[serde(skip)]
    power_index: BTreeSet<PowerRank>,
    /// `(validator, delegator)`
    #[serde(skip)]
    unbonding_by_validator: BTreeSet<(Address, Address)>,
    /// `(validator_src, delegator, validator_dst)`
    #[serde(skip)]
    redelegations_by_src: BTreeSet<TripleKey>,
    /// `(delegator, validator_dst, validator_src)`
    #[serde(skip)]
    redelegations_by_dst: BTreeSet<TripleKey>,

    pub unbonding_queue: MaturityQueue<PairKey>,
    pub redelegation_queue: MaturityQueue<TripleKey>,
    pub validator_queue: MaturityQueue<Address>,
    pub pool: Pool,
    pub history: PowerHistory,

    /// Bonded power reported to consensus at the last end-block.
    last_validator_powers: BTreeMap<Address, u64>,
    next_entry_id: u64,
    last_committed_height: Option<u64>,
}

impl StakingState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- validators ----

    pub fn validator(&self, operator: &Address) -> Option<&Validator> {
        self.validators.get(operator)
    }

    pub fn get_validator(&self, operator: &Address) -> StakingResult<&Validator> {
        self.validators
            .get(operator)
            .ok_or(StakingError::ValidatorNotFound(*operator))
    }

    pub fn validator_by_pubkey(&self, pubkey: &ConsensusPubKey) -> Option<&Validator> {
        self.pubkeys
            .get(pubkey)
            .and_then(|operator| self.validators.get(operator))
    }

    /// Insert or replace a validator, keeping the power index in step.
    pub fn set_validator(&mut self, validator: Validator) {
        if let Some(old) = self.validators.get(&validator.operator) {
            self.power_index.remove(&old.power_rank());
        }
        self.power_index.insert(validator.power_rank());
        self.pubkeys
            .insert(validator.consensus_pubkey, validator.operator);
        self.validators.insert(validator.operator, validator);
    }

    pub fn remove_validator(&mut self, operator: &Address) -> Option<Validator> {
        let validator = self.validators.remove(operator)?;
        self.power_index.remove(&validator.power_rank());
        self.pubkeys.remove(&validator.consensus_pubkey);
        self.last_validator_powers.remove(operator);
        Some(validator)
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Validators by tokens descending, operator ascending.
    pub fn validators_by_power(&self) -> impl Iterator<Item = &Validator> {
        self.power_index
            .iter()
            .filter_map(|rank| self.validators.get(&rank.operator))
    }

    pub fn bonded_validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators_by_power().filter(|v| v.is_bonded())
    }

    // ---- delegations ----

    pub fn delegation(&self, delegator: &Address, validator: &Address) -> Option<&Delegation> {
        self.delegations.get(&(*delegator, *validator))
    }

    /// Insert or replace a delegation; a zero-share delegation is deleted.
    pub fn set_delegation(&mut self, delegation: Delegation) {
        let key = (delegation.delegator, delegation.validator);
        if delegation.shares.is_zero() {
            self.delegations.remove(&key);
        } else {
            self.delegations.insert(key, delegation);
        }
    }

    pub fn remove_delegation(&mut self, delegator: &Address, validator: &Address) {
        self.delegations.remove(&(*delegator, *validator));
    }

    pub fn delegations(&self) -> impl Iterator<Item = &Delegation> {
        self.delegations.values()
    }

    pub fn delegations_of(&self, delegator: &Address) -> impl Iterator<Item = &Delegation> {
        let delegator = *delegator;
        self.delegations
            .range((delegator, Address::default())..)
            .take_while(move |((d, _), _)| *d == delegator)
            .map(|(_, delegation)| delegation)
    }

    pub fn delegations_to<'a>(
        &'a self,
        validator: &'a Address,
    ) -> impl Iterator<Item = &'a Delegation> + 'a {
        self.delegations
            .values()
            .filter(move |d| d.validator == *validator)
    }

    // ---- unbonding delegations ----

    pub fn unbonding_delegation(
        &self,
        delegator: &Address,
        validator: &Address,
    ) -> Option<&UnbondingDelegation> {
        self.unbonding_delegations.get(&(*delegator, *validator))
    }

    /// Insert or replace an unbonding record; a record without entries is deleted.
    pub fn set_unbonding_delegation(&mut self, ubd: UnbondingDelegation) {
        let key = (ubd.delegator, ubd.validator);
        if ubd.entries.is_empty() {
            self.unbonding_delegations.remove(&key);
            self.unbonding_by_validator.remove(&(key.1, key.0));
        } else {
            self.unbonding_by_validator.insert((key.1, key.0));
            self.unbonding_delegations.insert(key, ubd);
        }
    }

    pub fn unbonding_delegations(&self) -> impl Iterator<Item = &UnbondingDelegation> {
        self.unbonding_delegations.values()
    }

    /// Unbonding records draining out of `validator`, ordered by delegator.
    pub fn unbonding_delegations_from(&self, validator: &Address) -> Vec<&UnbondingDelegation> {
        let validator = *validator;
        self.unbonding_by_validator
            .range((validator, Address::default())..)
            .take_while(|(v, _)| *v == validator)
            .filter_map(|(v, d)| self.unbonding_delegations.get(&(*d, *v)))
            .collect()
    }

    // ---- redelegations ----

    pub fn redelegation(
        &self,
        delegator: &Address,
        src: &Address,
        dst: &Address,
    ) -> Option<&Redelegation> {
        self.redelegations.get(&(*delegator, *src, *dst))
    }

    /// Insert or replace a redelegation; a record without entries is deleted.
    pub fn set_redelegation(&mut self, red: Redelegation) {
        let (d, s, t) = (red.delegator, red.validator_src, red.validator_dst);
        if red.entries.is_empty() {
            self.redelegations.remove(&(d, s, t));
            self.redelegations_by_src.remove(&(s, d, t));
            self.redelegations_by_dst.remove(&(d, t, s));
        } else {
            self.redelegations_by_src.insert((s, d, t));
            self.redelegations_by_dst.insert((d, t, s));
            self.redelegations.insert((d, s, t), red);
        }
    }

    pub fn redelegations(&self) -> impl Iterator<Item = &Redelegation> {
        self.redelegations.values()
    }

    /// Redelegations whose source is `src`.
    pub fn redelegations_from(&self, src: &Address) -> Vec<&Redelegation> {
        let src = *src;
        self.redelegations_by_src
            .range((src, Address::default(), Address::default())..)
            .take_while(|(s, _, _)| *s == src)
            .filter_map(|(s, d, t)| self.redelegations.get(&(*d, *s, *t)))
            .collect()
    }

    /// Whether `delegator` has an in-flight redelegation into `dst`.
    pub fn has_receiving_redelegation(&self, delegator: &Address, dst: &Address) -> bool {
        let (delegator, dst) = (*delegator, *dst);
        self.redelegations_by_dst
            .range((delegator, dst, Address::default())..)
            .next()
            .map(|(d, t, _)| *d == delegator && *t == dst)
            .unwrap_or(false)
    }

    // ---- pool ----

    /// Credit `amount` to the bucket matching `status`.
    pub fn add_to_pool(&mut self, status: BondStatus, amount: Dec) -> StakingResult<()> {
        let bucket = self.pool_bucket(status);
        *bucket = bucket.checked_add(amount).ok_or(StakingError::Overflow)?;
        Ok(())
    }

    /// Debit `amount` from the bucket matching `status`.
    ///
    /// Underflow means the pool no longer matches the ledger.
    pub fn remove_from_pool(&mut self, status: BondStatus, amount: Dec) -> StakingResult<()> {
        let bucket = self.pool_bucket(status);
        let current = *bucket;
        *bucket = current.checked_sub(amount).ok_or_else(|| {
            StakingError::InvariantBroken(format!(
                "{status} pool bucket {current} cannot cover {amount}"
            ))
        })?;
        Ok(())
    }

    /// Move `amount` between buckets on a status change.
    pub fn move_pool(&mut self, from: BondStatus, to: BondStatus, amount: Dec) -> StakingResult<()> {
        if from.is_bonded_bucket() == to.is_bonded_bucket() {
            return Ok(());
        }
        self.remove_from_pool(from, amount)?;
        self.add_to_pool(to, amount)
    }

    fn pool_bucket(&mut self, status: BondStatus) -> &mut Dec {
        if status.is_bonded_bucket() {
            &mut self.pool.bonded_tokens
        } else {
            &mut self.pool.not_bonded_tokens
        }
    }

    // ---- end-block bookkeeping ----

    pub fn last_validator_power(&self, operator: &Address) -> Option<u64> {
        self.last_validator_powers.get(operator).copied()
    }

    pub fn last_validator_powers(&self) -> &BTreeMap<Address, u64> {
        &self.last_validator_powers
    }

    pub fn set_last_validator_powers(&mut self, powers: BTreeMap<Address, u64>) {
        self.last_validator_powers = powers;
    }

    /// Ledger-wide monotonic id for new queue entries.
    pub fn next_entry_id(&mut self) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id = self.next_entry_id.wrapping_add(1);
        id
    }

    pub fn last_committed_height(&self) -> Option<u64> {
        self.last_committed_height
    }

    pub fn set_last_committed_height(&mut self, height: u64) {
        self.last_committed_height = Some(height);
    }

    // ---- persistence ----

    pub fn encode(&self) -> StakingResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StakingError::Store(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> StakingResult<Self> {
        let mut state: Self =
            bincode::deserialize(bytes).map_err(|e| StakingError::Store(e.to_string()))?;
        state.rebuild_indexes();
        Ok(state)
    }

    fn rebuild_indexes(&mut self) {
        self.power_index = self.validators.values().map(Validator::power_rank).collect();
        self.unbonding_by_validator = self
            .unbonding_delegations
            .keys()
            .map(|(d, v)| (*v, *d))
            .collect();
        self.redelegations_by_src = self
            .redelegations
            .keys()
            .map(|(d, s, t)| (*s, *d, *t))
            .collect();
        self.redelegations_by_dst = self
            .redelegations
            .keys()
            .map(|(d, s, t)| (*d, *t, *s))
            .collect();
    }
}

impl BondStatus {
    /// Whether tokens of a validator in this status count as bonded.
    pub fn is_bonded_bucket(self) -> bool {
        self == BondStatus::Bonded
    }
}
