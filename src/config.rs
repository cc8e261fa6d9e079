use crate::billing::Granularity;
use crate::error::{ConfigError, CostdashError, Result};
use crate::stale::Pricing;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound for day counts (lookback, snapshot age): 100 years
pub const MAX_WINDOW_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aws: AwsConfig,
    pub idle_analysis: IdleAnalysisConfig,
    pub billing: BillingConfig,
    pub pricing: Pricing,
    pub stale: StaleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region override (falls back to the SDK default chain when unset)
    pub region: Option<String>,
    /// Named profile from ~/.aws/config
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleAnalysisConfig {
    pub bucket: String,
    pub key: String,
    /// Function that produces the idle-instance document
    pub lambda_function: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Length of the default range, ending today (UTC)
    pub lookback_days: u32,
    pub granularity: Granularity,
    pub metric: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaleConfig {
    /// Snapshots started before now minus this many days are flagged
    pub snapshot_max_age_days: u32,
}

impl Default for IdleAnalysisConfig {
    fn default() -> Self {
        Self {
            bucket: "cost-optimization-data-s3".to_string(),
            key: "lambda-outputs/idle-instance-analysis.json".to_string(),
            lambda_function: "Detect_idle_ec2-instances".to_string(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            granularity: Granularity::Daily,
            metric: "UnblendedCost".to_string(),
        }
    }
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            snapshot_max_age_days: 60,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .costdash.toml in current dir, then ~/.config/costdash/config.toml
            let local = PathBuf::from(".costdash.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("costdash").join("config.toml"))
                    .unwrap_or(local)
            }
        };

        if !config_path.exists() {
            if path.is_some() {
                warn!(
                    "Config file not found: {}; using defaults (run 'costdash init' to create one)",
                    config_path.display()
                );
            }
            return Ok(Config::default());
        }

        debug!("Loading config from {}", config_path.display());
        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", config_path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("pricing.ebs_per_gib_month", self.pricing.ebs_per_gib_month),
            ("pricing.eip_per_month", self.pricing.eip_per_month),
            ("pricing.snapshot_per_gib_month", self.pricing.snapshot_per_gib_month),
        ];
        for (field, rate) in rates {
            if rate < Decimal::ZERO {
                return Err(invalid(field, format!("rate must be non-negative, got {}", rate)));
            }
        }
        if self.billing.lookback_days == 0 || self.billing.lookback_days > MAX_WINDOW_DAYS {
            return Err(invalid(
                "billing.lookback_days",
                format!("must be between 1 and {}", MAX_WINDOW_DAYS),
            ));
        }
        if self.billing.metric.trim().is_empty() {
            return Err(invalid("billing.metric", "must not be empty".to_string()));
        }
        if self.stale.snapshot_max_age_days == 0 || self.stale.snapshot_max_age_days > MAX_WINDOW_DAYS {
            return Err(invalid(
                "stale.snapshot_max_age_days",
                format!("must be between 1 and {}", MAX_WINDOW_DAYS),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> CostdashError {
    CostdashError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        reason,
    })
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.billing.lookback_days, 7);
        assert_eq!(config.billing.granularity, Granularity::Daily);
        assert_eq!(config.billing.metric, "UnblendedCost");
        assert_eq!(config.stale.snapshot_max_age_days, 60);
        assert_eq!(config.pricing.ebs_per_gib_month, dec!(0.10));
        assert_eq!(config.pricing.eip_per_month, dec!(3.60));
        assert_eq!(config.pricing.snapshot_per_gib_month, dec!(0.05));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = Config::default();
        config.idle_analysis.bucket = "my-bucket".to_string();
        config.billing.granularity = Granularity::Monthly;
        config.save(&config_path).unwrap();

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.idle_analysis.bucket, "my-bucket");
        assert_eq!(loaded.billing.granularity, Granularity::Monthly);
        assert_eq!(loaded.pricing.eip_per_month, config.pricing.eip_per_month);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        std::fs::write(
            &config_path,
            "[pricing]\nebs_per_gib_month = 0.08\n\n[stale]\nsnapshot_max_age_days = 90\n",
        )
        .unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.pricing.ebs_per_gib_month, dec!(0.08));
        assert_eq!(config.pricing.eip_per_month, dec!(3.60));
        assert_eq!(config.stale.snapshot_max_age_days, 90);
        assert_eq!(config.billing.lookback_days, 7);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let fake_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load(Some(&fake_path)).unwrap();
        assert_eq!(config.stale.snapshot_max_age_days, 60);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "invalid toml content {").unwrap();

        let result = Config::load(Some(&config_path));
        assert!(matches!(
            result,
            Err(CostdashError::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("negative.toml");
        std::fs::write(&config_path, "[pricing]\neip_per_month = -1.0\n").unwrap();

        let err = Config::load(Some(&config_path)).unwrap_err();
        assert!(err.to_string().contains("pricing.eip_per_month"));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let mut config = Config::default();
        config.billing.lookback_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_init_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("init_test.toml");

        init_config(&config_path).unwrap();
        assert!(config_path.exists());

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.idle_analysis.lambda_function, "Detect_idle_ec2-instances");
    }
}
