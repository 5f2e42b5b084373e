use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub liquidation_bonus_rate: f64,
    pub close_factor: f64, // Share of total debt repayable in one liquidation (default: 0.5)
    pub health_factor_scaling: f64,
    pub fallback_repay_token: String,
    pub enforce_max_repay: bool,
    pub risk_scale_min: f64,
    pub risk_scale_max: f64,
    pub price_table_json: Option<String>,
    pub event_bus_buffer_size: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            liquidation_bonus_rate: 0.05,
            close_factor: 0.5,
            health_factor_scaling: 1.5,
            fallback_repay_token: "USDC".to_string(),
            enforce_max_repay: false,
            risk_scale_min: 0.8,
            risk_scale_max: 3.0,
            price_table_json: None,
            event_bus_buffer_size: 64,
            log_level: "info".to_string(),
            log_dir: None,
            dry_run: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        let config = Config {
            liquidation_bonus_rate: env::var("LIQUIDATION_BONUS_RATE")
                .unwrap_or_else(|_| defaults.liquidation_bonus_rate.to_string())
                .parse()
                .context("Invalid LIQUIDATION_BONUS_RATE value")?,
            close_factor: env::var("CLOSE_FACTOR")
                .unwrap_or_else(|_| defaults.close_factor.to_string())
                .parse()
                .context("Invalid CLOSE_FACTOR value (must be between 0.0 and 1.0)")?,
            health_factor_scaling: env::var("HEALTH_FACTOR_SCALING")
                .unwrap_or_else(|_| defaults.health_factor_scaling.to_string())
                .parse()
                .context("Invalid HEALTH_FACTOR_SCALING value")?,
            fallback_repay_token: env::var("FALLBACK_REPAY_TOKEN")
                .unwrap_or(defaults.fallback_repay_token),
            enforce_max_repay: env::var("ENFORCE_MAX_REPAY")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid ENFORCE_MAX_REPAY value (must be 'true' or 'false')")?,
            risk_scale_min: env::var("RISK_SCALE_MIN")
                .unwrap_or_else(|_| defaults.risk_scale_min.to_string())
                .parse()
                .context("Invalid RISK_SCALE_MIN value")?,
            risk_scale_max: env::var("RISK_SCALE_MAX")
                .unwrap_or_else(|_| defaults.risk_scale_max.to_string())
                .parse()
                .context("Invalid RISK_SCALE_MAX value")?,
            price_table_json: env::var("PRICE_TABLE_JSON").ok(),
            event_bus_buffer_size: env::var("EVENT_BUS_BUFFER_SIZE")
                .unwrap_or_else(|_| defaults.event_bus_buffer_size.to_string())
                .parse()
                .context("Invalid EVENT_BUS_BUFFER_SIZE value (must be usize)")?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: env::var("LOG_DIR").ok(),
            dry_run: env::var("DRY_RUN")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("Invalid DRY_RUN value (must be 'true' or 'false')")?,
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=0.20).contains(&self.liquidation_bonus_rate) {
            return Err(anyhow::anyhow!(
                "LIQUIDATION_BONUS_RATE must be between 0.0 and 0.20 (0-20%), got: {}",
                self.liquidation_bonus_rate
            ));
        }

        if !(self.close_factor > 0.0 && self.close_factor <= 1.0) {
            return Err(anyhow::anyhow!(
                "CLOSE_FACTOR must be in (0.0, 1.0], got: {}",
                self.close_factor
            ));
        }

        if !(self.health_factor_scaling > 0.0) {
            return Err(anyhow::anyhow!(
                "HEALTH_FACTOR_SCALING must be > 0.0, got: {}",
                self.health_factor_scaling
            ));
        }

        if self.risk_scale_min < 0.0 || self.risk_scale_min >= self.risk_scale_max {
            return Err(anyhow::anyhow!(
                "RISK_SCALE_MIN must be >= 0.0 and below RISK_SCALE_MAX (got: min={}, max={})",
                self.risk_scale_min,
                self.risk_scale_max
            ));
        }

        if self.event_bus_buffer_size == 0 {
            return Err(anyhow::anyhow!("EVENT_BUS_BUFFER_SIZE must be > 0"));
        }

        if self.fallback_repay_token.trim().is_empty() {
            return Err(anyhow::anyhow!("FALLBACK_REPAY_TOKEN must not be empty"));
        }

        if self.close_factor > 0.5 {
            log::warn!(
                "⚠️  CLOSE_FACTOR={} allows repaying more than half the debt in one liquidation",
                self.close_factor
            );
        }

        if self.enforce_max_repay {
            log::info!("✅ ENFORCE_MAX_REPAY=true: over-max repayments are rejected at Continue");
        } else {
            log::debug!("ENFORCE_MAX_REPAY=false: over-max repayments only raise a warning");
        }

        if !self.dry_run {
            log::warn!("⚠️  DRY_RUN=false: confirmed liquidations are sent to the real executor!");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_bonus_rate_out_of_range() {
        let config = Config {
            liquidation_bonus_rate: 0.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_close_factor_bounds() {
        let zero = Config {
            close_factor: 0.0,
            ..Config::default()
        };
        assert!(zero.validate().is_err());

        let full = Config {
            close_factor: 1.0,
            ..Config::default()
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_inverted_risk_scale_rejected() {
        let config = Config {
            risk_scale_min: 3.0,
            risk_scale_max: 0.8,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = Config {
            event_bus_buffer_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
