use analysis_orchestrator::EngineSettings;
use anyhow::{Context, Result};
use market_data::alpha_vantage::DEFAULT_REQUESTS_PER_MINUTE;
use market_data::marketaux::DEFAULT_MONTHLY_QUOTA;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub database_url: String,
    pub alphavantage_api_key: String,
    /// Sentiment is disabled when unset
    pub marketaux_api_key: Option<String>,

    pub alphavantage_rate_limit: usize,
    pub marketaux_monthly_quota: u32,

    pub news_cache_hours: i64,
    pub news_lookback_days: u32,
    pub bar_lookback: usize,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: String| var(key).unwrap_or(default);

        let config = Self {
            database_url: or_default("DATABASE_URL", "sqlite:stocklens.db".to_string()),
            alphavantage_api_key: var("ALPHAVANTAGE_API_KEY")
                .context("ALPHAVANTAGE_API_KEY must be set")?,
            marketaux_api_key: var("MARKETAUX_API_KEY"),

            alphavantage_rate_limit: or_default("ALPHAVANTAGE_RATE_LIMIT", DEFAULT_REQUESTS_PER_MINUTE.to_string())
                .parse()
                .context("ALPHAVANTAGE_RATE_LIMIT must be a positive integer")?,
            marketaux_monthly_quota: or_default("MARKETAUX_MONTHLY_QUOTA", DEFAULT_MONTHLY_QUOTA.to_string())
                .parse()
                .context("MARKETAUX_MONTHLY_QUOTA must be a non-negative integer")?,

            news_cache_hours: or_default("NEWS_CACHE_HOURS", "24".to_string())
                .parse()
                .context("NEWS_CACHE_HOURS must be an integer")?,
            news_lookback_days: or_default("NEWS_LOOKBACK_DAYS", "3".to_string())
                .parse()
                .context("NEWS_LOOKBACK_DAYS must be a non-negative integer")?,
            bar_lookback: or_default("BAR_LOOKBACK", "200".to_string())
                .parse()
                .context("BAR_LOOKBACK must be a positive integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.alphavantage_rate_limit == 0 {
            anyhow::bail!("ALPHAVANTAGE_RATE_LIMIT must be at least 1");
        }
        if self.news_cache_hours < 0 {
            anyhow::bail!("NEWS_CACHE_HOURS cannot be negative");
        }
        if self.bar_lookback < 50 {
            anyhow::bail!("BAR_LOOKBACK must be at least 50 to cover SMA50");
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            lookback: self.bar_lookback,
            news_lookback_days: self.news_lookback_days,
            news_cache_hours: self.news_cache_hours,
        }
    }
}
