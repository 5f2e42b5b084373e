// Price sources for the sizing step.
// The calculator only sees the PriceSource trait, so a live oracle can replace
// the static table without touching sizing logic.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Resolves a USD price for an asset symbol.
///
/// Returning `None` means the symbol is unpriced; the sizing step then
/// suppresses its output instead of guessing.
pub trait PriceSource: Send + Sync {
    fn current_price(&self, symbol: &str) -> Option<f64>;
}

/// Reference prices used when no price table is configured.
static DEFAULT_PRICES: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    [
        ("ETH", 2000.0),
        ("BTC", 45000.0),
        ("USDC", 1.0),
        ("VOI", 0.5),
        ("ALGO", 0.25),
        ("UNIT", 0.1),
    ]
    .into_iter()
    .map(|(symbol, price)| (symbol.to_string(), price))
    .collect()
});

/// Fixed symbol -> USD price lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceTable {
    prices: HashMap<String, f64>,
}

impl StaticPriceTable {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        StaticPriceTable { prices }
    }

    pub fn with_defaults() -> Self {
        StaticPriceTable {
            prices: DEFAULT_PRICES.clone(),
        }
    }

    /// Load a `{"SYMBOL": price}` JSON object.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read price table: {}", path.display()))?;
        let prices: HashMap<String, f64> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse price table JSON: {}", path.display()))?;

        let unusable: Vec<&String> = prices
            .iter()
            .filter(|(_, price)| !is_usable_price(**price))
            .map(|(symbol, _)| symbol)
            .collect();
        if !unusable.is_empty() {
            log::warn!(
                "Price table {} has non-positive prices for {:?}; those symbols are treated as unpriced",
                path.display(),
                unusable
            );
        }

        log::info!("✅ Loaded {} prices from {}", prices.len(), path.display());
        Ok(StaticPriceTable { prices })
    }

    pub fn set_price(&mut self, symbol: impl Into<String>, price: f64) {
        self.prices.insert(symbol.into(), price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl PriceSource for StaticPriceTable {
    fn current_price(&self, symbol: &str) -> Option<f64> {
        self.prices
            .get(symbol)
            .copied()
            .filter(|price| is_usable_price(*price))
    }
}

fn is_usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_prices() {
        let table = StaticPriceTable::with_defaults();
        assert_eq!(table.current_price("ETH"), Some(2000.0));
        assert_eq!(table.current_price("UNIT"), Some(0.1));
        assert_eq!(table.current_price("DOGE"), None);
    }

    #[test]
    fn test_unusable_prices_are_unavailable() {
        let mut table = StaticPriceTable::default();
        table.set_price("ZERO", 0.0);
        table.set_price("NEG", -3.0);
        table.set_price("NAN", f64::NAN);
        assert_eq!(table.current_price("ZERO"), None);
        assert_eq!(table.current_price("NEG"), None);
        assert_eq!(table.current_price("NAN"), None);
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("prices-{}.json", std::process::id()));
        {
            let mut file = fs::File::create(&path).unwrap();
            write!(file, r#"{{"ETH": 2500.5, "SOL": 150}}"#).unwrap();
        }

        let table = StaticPriceTable::from_json_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.current_price("ETH"), Some(2500.5));
        assert_eq!(table.current_price("SOL"), Some(150.0));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_from_missing_file() {
        assert!(StaticPriceTable::from_json_file("/nonexistent/prices.json").is_err());
    }
}
