pub mod alpha_vantage;
pub mod marketaux;
pub mod rate_limit;

pub use alpha_vantage::AlphaVantageClient;
pub use marketaux::MarketauxClient;
pub use rate_limit::{MonthlyQuota, RateLimiter};
