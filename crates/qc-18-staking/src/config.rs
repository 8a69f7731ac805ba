//! Configuration for the Staking subsystem

use crate::domain::{Dec, StakingError, StakingResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Staking parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Delay between undelegating and payout (seconds)
    pub unbonding_time_secs: u64,
    /// Slashing lookback window (blocks)
    pub unbonding_period_blocks: u64,
    /// Maximum size of the bonded set
    pub max_validators: usize,
    /// Maximum unbonding / redelegation entries per pair
    pub max_entries: usize,
    /// Self-bond below which a validator is jailed
    pub min_self_delegation: Dec,
    /// Minimum spacing between commission rate changes (seconds)
    pub commission_update_interval_secs: u64,
    /// Run the full invariant registry at every end-block
    pub check_invariants: bool,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            unbonding_time_secs: 21 * 24 * 60 * 60,
            unbonding_period_blocks: 120_960,
            max_validators: 21,
            max_entries: 7,
            min_self_delegation: Dec::one(),
            commission_update_interval_secs: 86_400,
            check_invariants: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl StakingConfig {
    /// Defaults overlaid with `QC_STAKING_*` environment variables.
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            unbonding_time_secs: env_parse("QC_STAKING_UNBONDING_TIME_SECS")
                .unwrap_or(defaults.unbonding_time_secs),

            unbonding_period_blocks: env_parse("QC_STAKING_UNBONDING_PERIOD_BLOCKS")
                .unwrap_or(defaults.unbonding_period_blocks),

            max_validators: env_parse("QC_STAKING_MAX_VALIDATORS")
                .unwrap_or(defaults.max_validators),

            max_entries: env_parse("QC_STAKING_MAX_ENTRIES").unwrap_or(defaults.max_entries),

            min_self_delegation: env_parse("QC_STAKING_MIN_SELF_DELEGATION")
                .unwrap_or(defaults.min_self_delegation),

            commission_update_interval_secs: env_parse("QC_STAKING_COMMISSION_UPDATE_SECS")
                .unwrap_or(defaults.commission_update_interval_secs),

            check_invariants: env::var("QC_STAKING_CHECK_INVARIANTS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.check_invariants),
        }
    }

    pub fn validate(&self) -> StakingResult<()> {
        if self.max_validators == 0 {
            return Err(StakingError::InvalidConfig("max_validators is zero".into()));
        }
        if self.max_entries == 0 {
            return Err(StakingError::InvalidConfig("max_entries is zero".into()));
        }
        if self.unbonding_time_secs == 0 {
            return Err(StakingError::InvalidConfig(
                "unbonding_time_secs is zero".into(),
            ));
        }
        if self.unbonding_period_blocks == 0 {
            return Err(StakingError::InvalidConfig(
                "unbonding_period_blocks is zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StakingConfig::default();
        assert_eq!(config.unbonding_time_secs, 1_814_400);
        assert_eq!(config.unbonding_period_blocks, 120_960);
        assert_eq!(config.max_validators, 21);
        assert_eq!(config.max_entries, 7);
        assert_eq!(config.min_self_delegation, Dec::one());
        assert!(!config.check_invariants);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_caps() {
        let config = StakingConfig {
            max_validators: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StakingError::InvalidConfig(_))
        ));

        let config = StakingConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StakingConfig {
            unbonding_time_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_overrides() {
        env::set_var("QC_STAKING_MAX_VALIDATORS", "4");
        env::set_var("QC_STAKING_MIN_SELF_DELEGATION", "2.5");
        env::set_var("QC_STAKING_CHECK_INVARIANTS", "true");

        let config = StakingConfig::from_env();
        assert_eq!(config.max_validators, 4);
        assert_eq!(config.min_self_delegation, "2.5".parse().unwrap());
        assert!(config.check_invariants);
        assert_eq!(config.max_entries, 7);

        env::remove_var("QC_STAKING_MAX_VALIDATORS");
        env::remove_var("QC_STAKING_MIN_SELF_DELEGATION");
        env::remove_var("QC_STAKING_CHECK_INVARIANTS");
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = StakingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: StakingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }
}
