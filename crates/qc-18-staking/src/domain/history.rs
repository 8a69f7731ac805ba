//! Height-indexed power history
//!
//! Append-only log of each validator's tokens and bonded flag as of the end
//! of every height at which they changed, plus the total bonded tokens per
//! height. Slashing reads it to price an infraction at the stake that existed
//! when it was committed; governance reads it for finalized heights.
//!
//! Entries older than the lookback window are pruned, keeping the latest
//! snapshot at or below the cutoff so every height inside the window still
//! resolves.

use super::{Address, Dec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSnapshot {
    pub height: u64,
    pub tokens: Dec,
    pub bonded: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerHistory {
    validators: BTreeMap<Address, Vec<PowerSnapshot>>,
    total_bonded: Vec<(u64, Dec)>,
    /// Lowest height for which lookups are answerable.
    retained_from: u64,
}

/// Last element whose height is `<= height`.
fn last_at_or_below<T>(items: &[T], height: u64, key: impl Fn(&T) -> u64) -> Option<&T> {
    let idx = items.partition_point(|item| key(item) <= height);
    idx.checked_sub(1).map(|i| &items[i])
}

impl PowerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validator's state at `height`, skipping unchanged values.
    pub fn record(&mut self, operator: Address, height: u64, tokens: Dec, bonded: bool) {
        let log = self.validators.entry(operator).or_default();
        match log.last_mut() {
            Some(last) if last.tokens == tokens && last.bonded == bonded => {}
            Some(last) if last.height == height => {
                last.tokens = tokens;
                last.bonded = bonded;
            }
            _ => log.push(PowerSnapshot {
                height,
                tokens,
                bonded,
            }),
        }
    }

    pub fn record_total_bonded(&mut self, height: u64, total: Dec) {
        match self.total_bonded.last_mut() {
            Some((_, last)) if *last == total => {}
            Some((h, last)) if *h == height => *last = total,
            _ => self.total_bonded.push((height, total)),
        }
    }

    /// Snapshot in effect at `height`.
    ///
    /// `None` when `height` predates retained history. A validator with no
    /// snapshot at or below a retained height had no stake then.
    pub fn snapshot_at(&self, operator: &Address, height: u64) -> Option<PowerSnapshot> {
        if height < self.retained_from {
            return None;
        }
        let empty = PowerSnapshot {
            height,
            tokens: Dec::zero(),
            bonded: false,
        };
        let snapshot = self
            .validators
            .get(operator)
            .and_then(|log| last_at_or_below(log, height, |s| s.height))
            .copied()
            .unwrap_or(empty);
        Some(snapshot)
    }

    pub fn tokens_at(&self, operator: &Address, height: u64) -> Option<Dec> {
        self.snapshot_at(operator, height).map(|s| s.tokens)
    }

    pub fn total_bonded_at(&self, height: u64) -> Option<Dec> {
        if height < self.retained_from {
            return None;
        }
        Some(
            last_at_or_below(&self.total_bonded, height, |(h, _)| *h)
                .map(|(_, total)| *total)
                .unwrap_or_else(Dec::zero),
        )
    }

    /// Drop snapshots that can no longer answer a lookup at `cutoff` or later.
    pub fn prune(&mut self, cutoff: u64) {
        if cutoff <= self.retained_from {
            return;
        }
        self.validators.retain(|_, log| {
            prune_log(log, cutoff, |s| s.height);
            !matches!(log.as_slice(), [only] if only.height <= cutoff && only.tokens.is_zero())
        });
        prune_log(&mut self.total_bonded, cutoff, |(h, _)| *h);
        self.retained_from = cutoff;
    }

    #[cfg(test)]
    fn tracked_validators(&self) -> usize {
        self.validators.len()
    }
}

/// Keep the newest item at or below `cutoff` and everything after it.
fn prune_log<T>(log: &mut Vec<T>, cutoff: u64, key: impl Fn(&T) -> u64) {
    let at_or_below = log.partition_point(|item| key(item) <= cutoff);
    if at_or_below > 1 {
        log.drain(..at_or_below - 1);
    }
}
