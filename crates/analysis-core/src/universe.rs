use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetClass {
    Commodity,
    Forex,
    Stock,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Commodity => "COMMODITY",
            AssetClass::Forex => "FOREX",
            AssetClass::Stock => "STOCK",
        }
    }

    /// Quoted as a currency pair (no exchange volume).
    pub fn is_fx_pair(&self) -> bool {
        matches!(self, AssetClass::Commodity | AssetClass::Forex)
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMMODITY" => Ok(AssetClass::Commodity),
            "FOREX" => Ok(AssetClass::Forex),
            "STOCK" => Ok(AssetClass::Stock),
            other => Err(AnalysisError::InvalidData(format!("unknown asset class '{}'", other))),
        }
    }
}

/// One tradable instrument of the fixed universe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub symbol: &'static str,
    pub class: AssetClass,
    /// Keyword queries for the news provider, most specific first
    pub search_terms: &'static [&'static str],
    /// Sentiment is only fetched for these, to stay inside the news quota
    pub priority_sentiment: bool,
}

impl Asset {
    /// Base and quote currency for six-letter pair symbols (`XAUUSD` -> `XAU`, `USD`).
    pub fn fx_pair(&self) -> Option<(&'static str, &'static str)> {
        if !self.class.is_fx_pair() || self.symbol.len() != 6 || !self.symbol.is_ascii() {
            return None;
        }
        Some(self.symbol.split_at(3))
    }
}

pub const UNIVERSE: &[Asset] = &[
    Asset {
        symbol: "XAUUSD",
        class: AssetClass::Commodity,
        search_terms: &["gold price", "gold market", "XAU", "gold futures"],
        priority_sentiment: true,
    },
    Asset {
        symbol: "XAGUSD",
        class: AssetClass::Commodity,
        search_terms: &["silver price", "silver market", "XAG", "silver futures"],
        priority_sentiment: false,
    },
    Asset {
        symbol: "EURUSD",
        class: AssetClass::Forex,
        search_terms: &["euro dollar", "EUR USD", "ECB", "European Central Bank"],
        priority_sentiment: true,
    },
    Asset {
        symbol: "GBPUSD",
        class: AssetClass::Forex,
        search_terms: &["pound dollar", "GBP USD", "Bank of England", "sterling"],
        priority_sentiment: false,
    },
    Asset {
        symbol: "USDJPY",
        class: AssetClass::Forex,
        search_terms: &["dollar yen", "USD JPY", "Bank of Japan", "yen"],
        priority_sentiment: false,
    },
    Asset {
        symbol: "AAPL",
        class: AssetClass::Stock,
        search_terms: &["Apple", "iPhone", "AAPL"],
        priority_sentiment: false,
    },
    Asset {
        symbol: "TSLA",
        class: AssetClass::Stock,
        search_terms: &["Tesla", "Elon Musk", "TSLA", "electric vehicle"],
        priority_sentiment: true,
    },
    Asset {
        symbol: "NVDA",
        class: AssetClass::Stock,
        search_terms: &["NVIDIA", "AI chips", "NVDA", "GPU"],
        priority_sentiment: true,
    },
    Asset {
        symbol: "MSFT",
        class: AssetClass::Stock,
        search_terms: &["Microsoft", "Azure", "MSFT", "Windows"],
        priority_sentiment: false,
    },
    Asset {
        symbol: "GOOGL",
        class: AssetClass::Stock,
        search_terms: &["Google", "Alphabet", "GOOGL", "search"],
        priority_sentiment: false,
    },
];

/// Look up a symbol in the universe (case-insensitive).
pub fn find_asset(symbol: &str) -> Option<&'static Asset> {
    UNIVERSE.iter().find(|a| a.symbol.eq_ignore_ascii_case(symbol))
}

/// Resolve a list of symbols, rejecting anything outside the universe.
pub fn resolve_assets<S: AsRef<str>>(symbols: &[S]) -> Result<Vec<&'static Asset>, AnalysisError> {
    symbols
        .iter()
        .map(|s| {
            find_asset(s.as_ref()).ok_or_else(|| {
                AnalysisError::ConfigError(format!("symbol '{}' is not in the asset universe", s.as_ref()))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_lookup() {
        let gold = find_asset("xauusd").unwrap();
        assert_eq!(gold.class, AssetClass::Commodity);
        assert_eq!(gold.fx_pair(), Some(("XAU", "USD")));
        assert!(gold.priority_sentiment);

        let nvda = find_asset("NVDA").unwrap();
        assert_eq!(nvda.fx_pair(), None);
        assert!(find_asset("BTCUSD").is_none());
    }

    #[test]
    fn test_priority_assets() {
        let priority: Vec<&str> = UNIVERSE
            .iter()
            .filter(|a| a.priority_sentiment)
            .map(|a| a.symbol)
            .collect();
        assert_eq!(priority, vec!["XAUUSD", "EURUSD", "TSLA", "NVDA"]);
    }

    #[test]
    fn test_resolve_rejects_unknown() {
        assert!(resolve_assets(&["AAPL", "EURUSD"]).is_ok());
        let err = resolve_assets(&["AAPL", "DOGE"]).unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigError(_)));
    }

    #[test]
    fn test_symbols_unique() {
        let mut symbols: Vec<&str> = UNIVERSE.iter().map(|a| a.symbol).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), UNIVERSE.len());
    }
}
