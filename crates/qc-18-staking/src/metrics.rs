//! # Staking Metrics
//!
//! Prometheus metrics for monitoring the staking ledger.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-18-staking = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `staking_messages_total` - Counter of delivered messages (by type and outcome)
//! - `staking_rollbacks_total` - Counter of rolled-back operations (by error kind)
//! - `staking_slashes_total` - Counter of slashes applied
//! - `staking_tokens_burned` - Counter of burned tokens (whole units)
//! - `staking_bonded_tokens` - Gauge of bonded tokens after end-block
//! - `staking_bonded_validators` - Gauge of bonded set size
//! - `staking_validator_updates_total` - Counter of power updates sent to consensus
//! - `staking_events_published_total` - Counter of published events (by name)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter, register_gauge, register_int_counter, register_int_counter_vec,
    register_int_gauge, Counter, Gauge, IntCounter, IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Delivered messages, labeled by message type and outcome
    pub static ref MESSAGES: IntCounterVec = register_int_counter_vec!(
        "staking_messages_total",
        "Total number of staking messages delivered",
        &["type", "outcome"]
    )
    .expect("Failed to create MESSAGES metric");

    /// Operations rolled back, labeled by error kind
    pub static ref ROLLBACKS: IntCounterVec = register_int_counter_vec!(
        "staking_rollbacks_total",
        "Total number of staking operations rolled back",
        &["kind"]
    )
    .expect("Failed to create ROLLBACKS metric");

    pub static ref SLASHES: IntCounter = register_int_counter!(
        "staking_slashes_total",
        "Total number of slashes applied"
    )
    .expect("Failed to create SLASHES metric");

    pub static ref TOKENS_BURNED: Counter = register_counter!(
        "staking_tokens_burned",
        "Total tokens burned by slashing"
    )
    .expect("Failed to create TOKENS_BURNED metric");

    pub static ref BONDED_TOKENS: Gauge = register_gauge!(
        "staking_bonded_tokens",
        "Bonded tokens after the last end-block"
    )
    .expect("Failed to create BONDED_TOKENS metric");

    pub static ref BONDED_VALIDATORS: IntGauge = register_int_gauge!(
        "staking_bonded_validators",
        "Size of the bonded validator set"
    )
    .expect("Failed to create BONDED_VALIDATORS metric");

    pub static ref VALIDATOR_UPDATES: IntCounter = register_int_counter!(
        "staking_validator_updates_total",
        "Total number of validator power updates reported to consensus"
    )
    .expect("Failed to create VALIDATOR_UPDATES metric");

    pub static ref EVENTS_PUBLISHED: IntCounterVec = register_int_counter_vec!(
        "staking_events_published_total",
        "Total number of staking events published",
        &["event"]
    )
    .expect("Failed to create EVENTS_PUBLISHED metric");
}

/// Record a delivered message and whether it committed
#[cfg(feature = "metrics")]
pub fn record_message(msg_type: &str, committed: bool) {
    let outcome = if committed { "committed" } else { "rejected" };
    MESSAGES.with_label_values(&[msg_type, outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_rollback(kind: &str) {
    ROLLBACKS.with_label_values(&[kind]).inc();
}

/// Record a slash and the whole tokens it burned
#[cfg(feature = "metrics")]
pub fn record_slash(burned_tokens: u128) {
    SLASHES.inc();
    TOKENS_BURNED.inc_by(burned_tokens as f64);
}

#[cfg(feature = "metrics")]
pub fn record_end_block(bonded_tokens: u128, bonded_validators: usize, updates: usize) {
    BONDED_TOKENS.set(bonded_tokens as f64);
    BONDED_VALIDATORS.set(bonded_validators as i64);
    VALIDATOR_UPDATES.inc_by(updates as u64);
}

#[cfg(feature = "metrics")]
pub fn record_event_published(event: &str) {
    EVENTS_PUBLISHED.with_label_values(&[event]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_message(_msg_type: &str, _committed: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn record_rollback(_kind: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_slash(_burned_tokens: u128) {}

#[cfg(not(feature = "metrics"))]
pub fn record_end_block(_bonded_tokens: u128, _bonded_validators: usize, _updates: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_event_published(_event: &str) {}
