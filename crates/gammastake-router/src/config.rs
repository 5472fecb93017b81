// crates/gammastake-router/src/config.rs
//
// Protocol configuration for a Gammastake deployment.
// Loaded from a TOML file or populated with sensible defaults.

use serde::{Deserialize, Serialize};
use std::fs;

use gammastake_core::{
    derive_address, Address, BasisPoints, Result, StakeError, BASIS_POINTS_DIVISOR,
    MAX_BONUS_MULTIPLIER_BPS, SECONDS_PER_YEAR,
};
use gammastake_rewards::VestingCap;

/// Deployment parameters for a [`StakingRouter`](crate::StakingRouter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Governance address: deploys the router, registers the tokens, and
    /// runs every governance passthrough.
    #[serde(default = "default_gov")]
    pub gov: Address,

    /// Optional manager allowed to act on behalf of any account.
    #[serde(default)]
    pub manager: Option<Address>,

    /// Seconds for a vesting deposit to vest in full.
    #[serde(default = "default_vesting_duration")]
    pub vesting_duration: u64,

    /// Bonus points an account may earn fees on, as basis points of its
    /// other fee-tier deposits.
    #[serde(default = "default_bn_rate_cap")]
    pub bn_rate_cap: BasisPoints,

    /// Initial bonus emission, annualized basis points of staked supply.
    #[serde(default)]
    pub bonus_multiplier_basis_points: BasisPoints,

    /// Tracker shares move only through handlers.
    #[serde(default = "default_true")]
    pub private_transfer_mode: bool,

    /// Trackers accept stakes only through handlers.
    #[serde(default = "default_true")]
    pub private_staking_mode: bool,

    /// Bonus points are claimed only through the router, which restakes them.
    #[serde(default = "default_true")]
    pub private_claiming_mode: bool,

    /// Vesting ceiling of the core vester.
    #[serde(default = "default_vester_cap")]
    pub core_vester_cap: VestingCap,

    /// Vesting ceiling of every pool vester.
    #[serde(default = "default_vester_cap")]
    pub pool_vester_cap: VestingCap,

    /// Default filter for the host's tracing subscriber: "trace", "debug",
    /// "info", "warn" or "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_gov() -> Address {
    derive_address("gammastake.gov")
}

fn default_vesting_duration() -> u64 {
    SECONDS_PER_YEAR
}

fn default_bn_rate_cap() -> BasisPoints {
    BASIS_POINTS_DIVISOR
}

fn default_true() -> bool {
    true
}

fn default_vester_cap() -> VestingCap {
    VestingCap::RewardTracker
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            gov: default_gov(),
            manager: None,
            vesting_duration: default_vesting_duration(),
            bn_rate_cap: default_bn_rate_cap(),
            bonus_multiplier_basis_points: 0,
            private_transfer_mode: true,
            private_staking_mode: true,
            private_claiming_mode: true,
            core_vester_cap: default_vester_cap(),
            pool_vester_cap: default_vester_cap(),
            log_level: default_log_level(),
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let config: ProtocolConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `StakeError::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.vesting_duration == 0 {
            return Err(StakeError::Config(
                "vesting_duration must be positive".to_string(),
            ));
        }
        if self.bonus_multiplier_basis_points > MAX_BONUS_MULTIPLIER_BPS {
            return Err(StakeError::Config(format!(
                "bonus_multiplier_basis_points {} exceeds {}",
                self.bonus_multiplier_basis_points, MAX_BONUS_MULTIPLIER_BPS
            )));
        }
        if self.gov == Address::ZERO {
            return Err(StakeError::Config("gov must be set".to_string()));
        }
        if !matches!(
            self.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(StakeError::Config(format!(
                "unknown log level {:?}",
                self.log_level
            )));
        }
        Ok(())
    }
}
