use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{LiquidationParams, Position};
use crate::oracle::PriceSource;
use crate::utils::helpers::parse_usd_amount;
use std::sync::Arc;

/// Protocol knobs the sizing step depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingSettings {
    pub bonus_rate: f64,
    pub close_factor: f64,
    pub fallback_repay_token: String,
    pub enforce_max_repay: bool,
}

impl Default for SizingSettings {
    fn default() -> Self {
        SizingSettings::from(&Config::default())
    }
}

impl From<&Config> for SizingSettings {
    fn from(config: &Config) -> Self {
        SizingSettings {
            bonus_rate: config.liquidation_bonus_rate,
            close_factor: config.close_factor,
            fallback_repay_token: config.fallback_repay_token.clone(),
            enforce_max_repay: config.enforce_max_repay,
        }
    }
}

/// Derived values for one (collateral, repay amount) choice.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingQuote {
    pub collateral_token: String,
    pub repay_amount_usd: f64,
    pub price: f64,
    pub bonus: f64,
    pub collateral_amount: f64,
    pub projected_ltv: f64,
    pub max_repayable: f64,
    /// Repay amount is above `max_repayable`. Informational unless max-repay is enforced.
    pub exceeds_max: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncompleteReason {
    NoCollateralSelected,
    UnknownCollateral(String),
    InvalidRepayAmount,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SizingStatus {
    Incomplete(IncompleteReason),
    PriceUnavailable { symbol: String },
    Ready(SizingQuote),
}

impl SizingStatus {
    pub fn quote(&self) -> Option<&SizingQuote> {
        match self {
            SizingStatus::Ready(quote) => Some(quote),
            _ => None,
        }
    }
}

/// `min(close_factor * total_borrowed, value of the selected collateral)`.
/// Zero when nothing is selected or the symbol is not posted as collateral.
pub fn max_repayable(position: &Position, collateral: Option<&str>, close_factor: f64) -> f64 {
    let collateral_value = collateral
        .and_then(|symbol| position.collateral(symbol))
        .map(|asset| asset.value_usd)
        .unwrap_or(0.0);
    (position.total_borrowed * close_factor).min(collateral_value)
}

/// Pure sizing computation. Same inputs always give the same status.
pub fn compute_quote(
    position: &Position,
    collateral: Option<&str>,
    repay_input: &str,
    prices: &dyn PriceSource,
    settings: &SizingSettings,
) -> SizingStatus {
    let symbol = match collateral {
        Some(symbol) if !symbol.is_empty() => symbol,
        _ => return SizingStatus::Incomplete(IncompleteReason::NoCollateralSelected),
    };

    if position.collateral(symbol).is_none() {
        return SizingStatus::Incomplete(IncompleteReason::UnknownCollateral(symbol.to_string()));
    }

    let repay = match parse_usd_amount(repay_input) {
        Some(repay) => repay,
        None => return SizingStatus::Incomplete(IncompleteReason::InvalidRepayAmount),
    };

    let price = match prices.current_price(symbol) {
        Some(price) => price,
        None => {
            log::debug!("Sizing: no price for {}, output suppressed", symbol);
            return SizingStatus::PriceUnavailable {
                symbol: symbol.to_string(),
            };
        }
    };

    let bonus = repay * settings.bonus_rate;
    let collateral_amount = (repay + bonus) / price;
    let projected_ltv = if position.total_supplied == 0.0 {
        0.0
    } else {
        (position.total_borrowed - repay).max(0.0) / position.total_supplied
    };
    let max = max_repayable(position, Some(symbol), settings.close_factor);
    let exceeds_max = repay > max;

    log::debug!(
        "Sizing: collateral={} price={:.6} repay={:.6} bonus={:.6} collateral_amount={:.6} projected_ltv={:.6} max_repayable={:.6} exceeds_max={}",
        symbol,
        price,
        repay,
        bonus,
        collateral_amount,
        projected_ltv,
        max,
        exceeds_max
    );

    SizingStatus::Ready(SizingQuote {
        collateral_token: symbol.to_string(),
        repay_amount_usd: repay,
        price,
        bonus,
        collateral_amount,
        projected_ltv,
        max_repayable: max,
        exceeds_max,
    })
}

/// Step One of the wizard: holds the liquidator's two inputs and derives
/// everything else from them on demand.
pub struct SizingCalculator {
    position: Arc<Position>,
    prices: Arc<dyn PriceSource>,
    settings: SizingSettings,
    selected_collateral: Option<String>,
    repay_input: String,
}

impl SizingCalculator {
    pub fn new(position: Arc<Position>, prices: Arc<dyn PriceSource>, settings: SizingSettings) -> Self {
        SizingCalculator {
            position,
            prices,
            settings,
            selected_collateral: None,
            repay_input: String::new(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn select_collateral(&mut self, symbol: impl Into<String>) -> SizingStatus {
        self.selected_collateral = Some(symbol.into());
        self.status()
    }

    pub fn clear_collateral(&mut self) -> SizingStatus {
        self.selected_collateral = None;
        self.status()
    }

    pub fn set_repay_amount(&mut self, input: impl Into<String>) -> SizingStatus {
        self.repay_input = input.into();
        self.status()
    }

    pub fn selected_collateral(&self) -> Option<&str> {
        self.selected_collateral.as_deref()
    }

    pub fn repay_input(&self) -> &str {
        &self.repay_input
    }

    /// Recomputed from the current inputs on every call.
    pub fn status(&self) -> SizingStatus {
        compute_quote(
            &self.position,
            self.selected_collateral.as_deref(),
            &self.repay_input,
            self.prices.as_ref(),
            &self.settings,
        )
    }

    /// Guidance shown next to the repay input, available before a quote exists.
    pub fn max_repayable(&self) -> f64 {
        max_repayable(
            &self.position,
            self.selected_collateral.as_deref(),
            self.settings.close_factor,
        )
    }

    pub fn can_continue(&self) -> bool {
        match self.status() {
            SizingStatus::Ready(quote) => !(self.settings.enforce_max_repay && quote.exceeds_max),
            _ => false,
        }
    }

    /// The "Continue" action: freeze the current quote into `LiquidationParams`.
    pub fn finalize(&self) -> Result<LiquidationParams> {
        let quote = match self.status() {
            SizingStatus::Ready(quote) => quote,
            SizingStatus::PriceUnavailable { symbol } => return Err(Error::PriceUnavailable { symbol }),
            SizingStatus::Incomplete(reason) => {
                return Err(Error::Validation(match reason {
                    IncompleteReason::NoCollateralSelected => "no collateral asset selected".to_string(),
                    IncompleteReason::UnknownCollateral(symbol) => {
                        format!("{} is not posted as collateral by this position", symbol)
                    }
                    IncompleteReason::InvalidRepayAmount => {
                        "repay amount must be a positive number".to_string()
                    }
                }))
            }
        };

        if quote.exceeds_max {
            if self.settings.enforce_max_repay {
                return Err(Error::Validation(format!(
                    "repay amount ${:.2} exceeds max repayable ${:.2}",
                    quote.repay_amount_usd, quote.max_repayable
                )));
            }
            log::warn!(
                "⚠️  Repay amount ${:.2} exceeds max repayable ${:.2} for {}; continuing (max-repay not enforced)",
                quote.repay_amount_usd,
                quote.max_repayable,
                self.position.wallet_address
            );
        }

        let repay_token = self
            .position
            .primary_debt_symbol()
            .unwrap_or(self.settings.fallback_repay_token.as_str())
            .to_string();

        let params = LiquidationParams::new(
            quote.repay_amount_usd,
            repay_token,
            quote.collateral_token,
            quote.collateral_amount,
            quote.bonus,
        );

        log::info!(
            "Liquidation sized: position={} repay=${:.2} {} -> {:.4} {} (bonus ${:.2})",
            self.position.wallet_address,
            params.repay_amount_usd(),
            params.repay_token(),
            params.collateral_amount(),
            params.collateral_token(),
            params.liquidation_bonus()
        );

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AssetHolding;
    use crate::oracle::StaticPriceTable;

    const EPS: f64 = 1e-9;

    fn position() -> Arc<Position> {
        Arc::new(Position {
            wallet_address: "0x1234567890abcdef".to_string(),
            health_factor: 0.92,
            total_supplied: 2000.0,
            total_borrowed: 1000.0,
            collateral_assets: vec![
                AssetHolding {
                    symbol: "ETH".to_string(),
                    amount: 0.6,
                    value_usd: 1200.0,
                },
                AssetHolding {
                    symbol: "ALGO".to_string(),
                    amount: 800.0,
                    value_usd: 200.0,
                },
                AssetHolding {
                    symbol: "WEIRD".to_string(),
                    amount: 5.0,
                    value_usd: 600.0,
                },
            ],
            borrowed_assets: vec![AssetHolding {
                symbol: "VOI".to_string(),
                amount: 2000.0,
                value_usd: 1000.0,
            }],
        })
    }

    fn calculator() -> SizingCalculator {
        SizingCalculator::new(
            position(),
            Arc::new(StaticPriceTable::with_defaults()),
            SizingSettings::default(),
        )
    }

    #[test]
    fn test_concrete_scenario() {
        let mut calc = calculator();
        calc.select_collateral("ETH");
        let status = calc.set_repay_amount("400");
        let quote = status.quote().expect("quote");

        assert!((quote.bonus - 20.0).abs() < EPS);
        assert!((quote.collateral_amount - 0.21).abs() < EPS);
        assert!((quote.max_repayable - 500.0).abs() < EPS);
        assert!((quote.projected_ltv - 0.3).abs() < EPS);
        assert_eq!(quote.price, 2000.0);
        assert!(!quote.exceeds_max);
    }

    #[test]
    fn test_incomplete_inputs() {
        let mut calc = calculator();
        assert_eq!(
            calc.set_repay_amount("100"),
            SizingStatus::Incomplete(IncompleteReason::NoCollateralSelected)
        );
        assert_eq!(
            calc.select_collateral("BTC"),
            SizingStatus::Incomplete(IncompleteReason::UnknownCollateral("BTC".to_string()))
        );
        calc.select_collateral("ETH");
        for bad in ["", "abc", "0", "-10", "inf"] {
            assert_eq!(
                calc.set_repay_amount(bad),
                SizingStatus::Incomplete(IncompleteReason::InvalidRepayAmount),
                "input {:?}",
                bad
            );
        }
        assert!(!calc.can_continue());
        assert!(matches!(calc.finalize(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_price_unavailable_is_distinct() {
        let mut calc = calculator();
        calc.set_repay_amount("100");
        let status = calc.select_collateral("WEIRD");
        assert_eq!(
            status,
            SizingStatus::PriceUnavailable {
                symbol: "WEIRD".to_string()
            }
        );
        assert!(!calc.can_continue());
        assert_eq!(
            calc.finalize(),
            Err(Error::PriceUnavailable {
                symbol: "WEIRD".to_string()
            })
        );
    }

    #[test]
    fn test_max_repayable_bounds() {
        let p = position();
        assert_eq!(max_repayable(&p, Some("ETH"), 0.5), 500.0);
        assert_eq!(max_repayable(&p, Some("ALGO"), 0.5), 200.0);
        assert_eq!(max_repayable(&p, Some("BTC"), 0.5), 0.0);
        assert_eq!(max_repayable(&p, None, 0.5), 0.0);
    }

    #[test]
    fn test_bonus_and_coverage_invariants() {
        let mut calc = calculator();
        calc.select_collateral("ETH");
        for repay in [0.01, 1.0, 123.45, 400.0, 999.99, 5000.0] {
            let status = calc.set_repay_amount(repay.to_string());
            let quote = status.quote().expect("quote");
            assert!((quote.bonus - repay * 0.05).abs() < EPS);
            assert!((quote.collateral_amount * quote.price - (repay + quote.bonus)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut calc = calculator();
        calc.select_collateral("ETH");
        calc.set_repay_amount("250.5");
        assert_eq!(calc.status(), calc.status());
    }

    #[test]
    fn test_projected_ltv_floors_at_zero() {
        let mut calc = calculator();
        calc.select_collateral("ETH");
        let status = calc.set_repay_amount("1500");
        let quote = status.quote().expect("quote");
        assert_eq!(quote.projected_ltv, 0.0);
        assert!(quote.exceeds_max);
    }

    #[test]
    fn test_projected_ltv_with_empty_supply() {
        let mut p = (*position()).clone();
        p.total_supplied = 0.0;
        let mut calc = SizingCalculator::new(
            Arc::new(p),
            Arc::new(StaticPriceTable::with_defaults()),
            SizingSettings::default(),
        );
        calc.select_collateral("ETH");
        let status = calc.set_repay_amount("100");
        assert_eq!(status.quote().map(|q| q.projected_ltv), Some(0.0));
    }

    #[test]
    fn test_over_max_warns_by_default() {
        let mut calc = calculator();
        calc.select_collateral("ALGO");
        calc.set_repay_amount("300");
        assert!(calc.can_continue());
        let params = calc.finalize().unwrap();
        assert_eq!(params.repay_amount_usd(), 300.0);
        assert_eq!(params.collateral_token(), "ALGO");
    }

    #[test]
    fn test_over_max_blocked_when_enforced() {
        let settings = SizingSettings {
            enforce_max_repay: true,
            ..SizingSettings::default()
        };
        let mut calc = SizingCalculator::new(position(), Arc::new(StaticPriceTable::with_defaults()), settings);
        calc.select_collateral("ALGO");
        calc.set_repay_amount("300");
        assert!(!calc.can_continue());
        assert!(matches!(calc.finalize(), Err(Error::Validation(_))));

        calc.set_repay_amount("200");
        assert!(calc.can_continue());
    }

    #[test]
    fn test_finalize_uses_first_debt_or_fallback() {
        let mut calc = calculator();
        calc.select_collateral("ETH");
        calc.set_repay_amount("400");
        let params = calc.finalize().unwrap();
        assert_eq!(params.repay_token(), "VOI");
        assert!((params.liquidation_bonus() - 20.0).abs() < EPS);
        assert!((params.collateral_amount() - 0.21).abs() < EPS);

        let mut no_debt = (*position()).clone();
        no_debt.borrowed_assets.clear();
        let mut calc = SizingCalculator::new(
            Arc::new(no_debt),
            Arc::new(StaticPriceTable::with_defaults()),
            SizingSettings::default(),
        );
        calc.select_collateral("ETH");
        calc.set_repay_amount("400");
        assert_eq!(calc.finalize().unwrap().repay_token(), "USDC");
    }
}
