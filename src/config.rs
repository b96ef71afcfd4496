use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the scoring & ledger engine service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Reward and referral knobs
    pub rewards: RewardConfig,
    /// Payout minimum overrides
    pub payouts: PayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL write-through (if false, in-memory only)
    pub postgres_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Base credits for one report before the tier multiplier
    pub base_report_reward: i64,
    /// Credits paid to the referrer when a referral qualifies
    pub referral_bonus_credits: i64,
    /// Incidents a referee must submit before the referral qualifies
    pub referral_required_incidents: u32,
}

/// Minimum payout per tier, in credits. Lower tiers carry higher
/// minimums; the tier table is built from these at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    pub min_payout_bronze: i64,
    pub min_payout_silver: i64,
    pub min_payout_gold: i64,
    pub min_payout_platinum: i64,
    pub min_payout_diamond: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8890,
            },
            database: DatabaseConfig {
                postgres_url: "postgresql://localhost:5432/roadwatch".to_string(),
                postgres_enabled: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            rewards: RewardConfig {
                base_report_reward: 10,
                referral_bonus_credits: 500,
                referral_required_incidents: 5,
            },
            payouts: PayoutConfig {
                min_payout_bronze: 1_000,
                min_payout_silver: 750,
                min_payout_gold: 500,
                min_payout_platinum: 250,
                min_payout_diamond: 100,
            },
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("ROADWATCH_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("ROADWATCH_PORT") {
            config.server.port = port.parse().context("Invalid ROADWATCH_PORT value")?;
        }

        if let Ok(url) = env::var("ROADWATCH_POSTGRES_URL") {
            config.database.postgres_url = url;
        }

        if let Ok(enabled) = env::var("ROADWATCH_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid ROADWATCH_POSTGRES_ENABLED value")?;
        }

        if let Ok(level) = env::var("ROADWATCH_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(reward) = env::var("ROADWATCH_BASE_REPORT_REWARD") {
            config.rewards.base_report_reward = reward
                .parse()
                .context("Invalid ROADWATCH_BASE_REPORT_REWARD value")?;
        }

        if let Ok(bonus) = env::var("ROADWATCH_REFERRAL_BONUS_CREDITS") {
            config.rewards.referral_bonus_credits = bonus
                .parse()
                .context("Invalid ROADWATCH_REFERRAL_BONUS_CREDITS value")?;
        }

        if let Ok(required) = env::var("ROADWATCH_REFERRAL_REQUIRED_INCIDENTS") {
            config.rewards.referral_required_incidents = required
                .parse()
                .context("Invalid ROADWATCH_REFERRAL_REQUIRED_INCIDENTS value")?;
        }

        for (var, minimum) in [
            ("ROADWATCH_MIN_PAYOUT_BRONZE", &mut config.payouts.min_payout_bronze),
            ("ROADWATCH_MIN_PAYOUT_SILVER", &mut config.payouts.min_payout_silver),
            ("ROADWATCH_MIN_PAYOUT_GOLD", &mut config.payouts.min_payout_gold),
            ("ROADWATCH_MIN_PAYOUT_PLATINUM", &mut config.payouts.min_payout_platinum),
            ("ROADWATCH_MIN_PAYOUT_DIAMOND", &mut config.payouts.min_payout_diamond),
        ] {
            if let Ok(value) = env::var(var) {
                *minimum = value
                    .parse()
                    .with_context(|| format!("Invalid {} value", var))?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Server host must not be empty");
        }
        if self.rewards.base_report_reward <= 0 {
            anyhow::bail!(
                "Base report reward must be positive, got {}",
                self.rewards.base_report_reward
            );
        }
        if self.rewards.referral_bonus_credits <= 0 {
            anyhow::bail!(
                "Referral bonus must be positive, got {}",
                self.rewards.referral_bonus_credits
            );
        }
        if self.rewards.referral_required_incidents == 0 {
            anyhow::bail!("Referral qualification requires at least one incident");
        }
        for (tier, minimum) in [
            ("bronze", self.payouts.min_payout_bronze),
            ("silver", self.payouts.min_payout_silver),
            ("gold", self.payouts.min_payout_gold),
            ("platinum", self.payouts.min_payout_platinum),
            ("diamond", self.payouts.min_payout_diamond),
        ] {
            if minimum <= 0 {
                anyhow::bail!("Minimum payout for {} must be positive, got {}", tier, minimum);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_reward_rejected() {
        let mut config = EngineConfig::default();
        config.rewards.base_report_reward = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_required_incidents_rejected() {
        let mut config = EngineConfig::default();
        config.rewards.referral_required_incidents = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_payout_minimum_rejected() {
        let mut config = EngineConfig::default();
        config.payouts.min_payout_gold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_payout_minimum_env_override() {
        env::set_var("ROADWATCH_MIN_PAYOUT_GOLD", "50");
        let config = EngineConfig::from_env().unwrap();
        env::remove_var("ROADWATCH_MIN_PAYOUT_GOLD");

        assert_eq!(config.payouts.min_payout_gold, 50);
        assert_eq!(config.payouts.min_payout_bronze, 1_000);
    }
}
