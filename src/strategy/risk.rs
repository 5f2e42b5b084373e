use crate::core::config::Config;
use crate::core::types::{LiquidationParams, Position};

pub const RISK_SCALE_MIN: f64 = 0.8;
pub const RISK_SCALE_MAX: f64 = 3.0;

/// Position of a health factor on the default 0.8..=3.0 risk scale.
///
/// 0 is the safest end (3.0 and above), 100 the riskiest (0.8 and below).
pub fn risk_position(health_factor: f64) -> f64 {
    RiskScale::default().position(health_factor)
}

/// Bounded health-factor scale used by the risk indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScale {
    min: f64,
    max: f64,
}

impl Default for RiskScale {
    fn default() -> Self {
        RiskScale {
            min: RISK_SCALE_MIN,
            max: RISK_SCALE_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    High,
    Mid,
    Low,
}

impl RiskBand {
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::High => "High Risk",
            RiskBand::Mid => "Mid Risk",
            RiskBand::Low => "Low Risk",
        }
    }
}

impl RiskScale {
    /// Returns `None` unless `0 <= min < max` and both are finite.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min >= 0.0 && min < max {
            Some(RiskScale { min, max })
        } else {
            None
        }
    }

    pub fn from_config(config: &Config) -> Self {
        RiskScale::new(config.risk_scale_min, config.risk_scale_max).unwrap_or_else(|| {
            log::warn!(
                "Invalid risk scale [{}, {}], using default [{}, {}]",
                config.risk_scale_min,
                config.risk_scale_max,
                RISK_SCALE_MIN,
                RISK_SCALE_MAX
            );
            RiskScale::default()
        })
    }

    /// Clamp into the scale, then normalize to a 0..=100 percentage.
    /// NaN is treated as the riskiest value.
    pub fn position(&self, health_factor: f64) -> f64 {
        let hf = if health_factor.is_nan() { self.min } else { health_factor };
        let clamped = hf.clamp(self.min, self.max);
        (self.max - clamped) / (self.max - self.min) * 100.0
    }

    pub fn band(&self, health_factor: f64) -> RiskBand {
        let pct = self.position(health_factor);
        if pct >= 200.0 / 3.0 {
            RiskBand::High
        } else if pct >= 100.0 / 3.0 {
            RiskBand::Mid
        } else {
            RiskBand::Low
        }
    }

    pub fn marker_label(&self, health_factor: f64) -> String {
        format!(
            "Risk scale, marker at {}%",
            self.position(health_factor).round() as i64
        )
    }
}

/// Informational health factor after the liquidation repays part of the debt.
///
/// `(total_borrowed - repay) / total_supplied * scaling`. An empty supply
/// yields 0 so the summary never shows NaN or infinity.
pub fn projected_health_factor(position: &Position, params: &LiquidationParams, scaling: f64) -> f64 {
    if position.total_supplied == 0.0 {
        return 0.0;
    }
    (position.total_borrowed - params.repay_amount_usd()) / position.total_supplied * scaling
}
