use serde::{Deserialize, Serialize};

/// A borrower's aggregate collateral and debt, as handed to the wizard by
/// the account data source. Read-only for the duration of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub wallet_address: String,
    pub health_factor: f64,
    pub total_supplied: f64,
    pub total_borrowed: f64,
    #[serde(default)]
    pub collateral_assets: Vec<AssetHolding>,
    #[serde(default)]
    pub borrowed_assets: Vec<AssetHolding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHolding {
    pub symbol: String,
    pub amount: f64,
    pub value_usd: f64,
}

impl Position {
    pub fn collateral(&self, symbol: &str) -> Option<&AssetHolding> {
        self.collateral_assets.iter().find(|a| a.symbol == symbol)
    }

    /// Symbol of the debt a liquidator repays by default.
    pub fn primary_debt_symbol(&self) -> Option<&str> {
        self.borrowed_assets.first().map(|a| a.symbol.as_str())
    }

    /// Current loan-to-value. Zero when nothing is supplied.
    pub fn ltv(&self) -> f64 {
        if self.total_supplied == 0.0 {
            return 0.0;
        }
        self.total_borrowed / self.total_supplied
    }
}

/// Finalized liquidation sizing. Built only by the sizing calculator and
/// never mutated afterwards; the confirm step reads it through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidationParams {
    repay_amount_usd: f64,
    repay_token: String,
    collateral_token: String,
    collateral_amount: f64,
    liquidation_bonus: f64,
}

impl LiquidationParams {
    pub(crate) fn new(
        repay_amount_usd: f64,
        repay_token: String,
        collateral_token: String,
        collateral_amount: f64,
        liquidation_bonus: f64,
    ) -> Self {
        LiquidationParams {
            repay_amount_usd,
            repay_token,
            collateral_token,
            collateral_amount,
            liquidation_bonus,
        }
    }

    pub fn repay_amount_usd(&self) -> f64 {
        self.repay_amount_usd
    }

    pub fn repay_token(&self) -> &str {
        &self.repay_token
    }

    pub fn collateral_token(&self) -> &str {
        &self.collateral_token
    }

    pub fn collateral_amount(&self) -> f64 {
        self.collateral_amount
    }

    pub fn liquidation_bonus(&self) -> f64 {
        self.liquidation_bonus
    }

    /// USD value of the seized collateral (repayment plus bonus).
    pub fn seized_value_usd(&self) -> f64 {
        self.repay_amount_usd + self.liquidation_bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        Position {
            wallet_address: "0xabc".to_string(),
            health_factor: 0.92,
            total_supplied: 2000.0,
            total_borrowed: 1000.0,
            collateral_assets: vec![AssetHolding {
                symbol: "ETH".to_string(),
                amount: 0.6,
                value_usd: 1200.0,
            }],
            borrowed_assets: vec![AssetHolding {
                symbol: "VOI".to_string(),
                amount: 2000.0,
                value_usd: 1000.0,
            }],
        }
    }

    #[test]
    fn test_collateral_lookup() {
        let p = position();
        assert_eq!(p.collateral("ETH").map(|a| a.value_usd), Some(1200.0));
        assert!(p.collateral("BTC").is_none());
    }

    #[test]
    fn test_primary_debt_symbol() {
        let mut p = position();
        assert_eq!(p.primary_debt_symbol(), Some("VOI"));
        p.borrowed_assets.clear();
        assert_eq!(p.primary_debt_symbol(), None);
    }

    #[test]
    fn test_ltv_with_empty_supply() {
        let mut p = position();
        assert!((p.ltv() - 0.5).abs() < 1e-12);
        p.total_supplied = 0.0;
        assert_eq!(p.ltv(), 0.0);
    }

    #[test]
    fn test_position_deserializes_without_asset_lists() {
        let json = r#"{
            "wallet_address": "0xdef",
            "health_factor": 1.1,
            "total_supplied": 10.0,
            "total_borrowed": 5.0
        }"#;
        let p: Position = serde_json::from_str(json).unwrap();
        assert!(p.collateral_assets.is_empty());
        assert!(p.borrowed_assets.is_empty());
    }
}
