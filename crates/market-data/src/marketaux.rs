use analysis_core::{find_asset, AnalysisError, NewsArticle, NewsProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::rate_limit::MonthlyQuota;

const BASE_URL: &str = "https://api.marketaux.com/v1/news/all";

/// Free plan request budget per month
pub const DEFAULT_MONTHLY_QUOTA: u32 = 100;

const SYMBOL_QUERY_LIMIT: u32 = 10;
const KEYWORD_QUERY_LIMIT: u32 = 5;

/// Below this many symbol matches a single keyword search is added
const MIN_SYMBOL_ARTICLES: usize = 5;

#[derive(Clone)]
pub struct MarketauxClient {
    api_token: String,
    base_url: String,
    client: Client,
    quota: MonthlyQuota,
}

impl MarketauxClient {
    pub fn new(api_token: String, monthly_quota: u32) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        tracing::info!("Marketaux client initialized, quota {} requests/month", monthly_quota);

        Self {
            api_token,
            base_url: BASE_URL.to_string(),
            client,
            quota: MonthlyQuota::new(monthly_quota),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn quota(&self) -> &MonthlyQuota {
        &self.quota
    }

    /// Every request that leaves the process costs one quota unit.
    async fn send_request(&self, params: &[(&str, String)]) -> Result<Vec<NewsArticle>, AnalysisError> {
        let remaining = self.quota.try_acquire().await?;

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("api_token", &self.api_token)])
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        tracing::info!("Marketaux request sent, {} of {} left this month", remaining, self.quota.limit());

        match response.status().as_u16() {
            429 => return Err(AnalysisError::ApiError("Marketaux rate limit exceeded".to_string())),
            401 => return Err(AnalysisError::ApiError("Marketaux API token rejected".to_string())),
            _ => {}
        }

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: NewsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        parse_response(body)
    }

    async fn fetch_by_symbol(&self, symbol: &str, since: DateTime<Utc>) -> Result<Vec<NewsArticle>, AnalysisError> {
        let params = vec![
            ("symbols", symbol.to_string()),
            ("filter_entities", "true".to_string()),
            ("language", "en".to_string()),
            ("sort", "published_desc".to_string()),
            ("published_after", since.format("%Y-%m-%dT%H:%M").to_string()),
            ("limit", SYMBOL_QUERY_LIMIT.to_string()),
        ];
        tracing::info!("Fetching news for {}", symbol);
        self.send_request(&params).await
    }

    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>, AnalysisError> {
        let params = vec![
            ("search", query.to_string()),
            ("language", "en".to_string()),
            ("sort", "published_desc".to_string()),
            ("limit", KEYWORD_QUERY_LIMIT.to_string()),
        ];
        tracing::info!("Searching news for '{}'", query);
        self.send_request(&params).await
    }
}

#[async_trait]
impl NewsProvider for MarketauxClient {
    async fn get_articles(&self, symbol: &str, since_days: u32) -> Result<Vec<NewsArticle>, AnalysisError> {
        let since = Utc::now() - ChronoDuration::days(i64::from(since_days));
        let mut articles = self.fetch_by_symbol(symbol, since).await?;

        if articles.len() < MIN_SYMBOL_ARTICLES {
            let term = find_asset(symbol).and_then(|a| a.search_terms.first().copied());
            if let Some(term) = term {
                match self.search(term).await {
                    Ok(extra) => articles = merge_articles(articles, extra),
                    Err(e) => tracing::warn!("{}: keyword search '{}' failed: {}", symbol, term, e),
                }
            }
        }

        Ok(articles)
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    data: Vec<RawArticle>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: String,
    description: Option<String>,
    published_at: Option<String>,
    source: Option<String>,
    url: Option<String>,
    relevance_score: Option<f64>,
}

fn parse_response(body: NewsResponse) -> Result<Vec<NewsArticle>, AnalysisError> {
    if let Some(error) = body.error {
        return Err(AnalysisError::ApiError(format!("Marketaux error: {}", error)));
    }
    Ok(body.data.into_iter().map(convert_article).collect())
}

fn convert_article(raw: RawArticle) -> NewsArticle {
    NewsArticle {
        title: raw.title,
        description: raw.description,
        published_at: raw
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
        source: raw.source,
        url: raw.url,
        relevance: raw.relevance_score,
    }
}

/// Append `extra` to `articles`, skipping titles already present.
fn merge_articles(mut articles: Vec<NewsArticle>, extra: Vec<NewsArticle>) -> Vec<NewsArticle> {
    let mut seen: HashSet<String> = articles.iter().map(|a| a.title.to_lowercase()).collect();
    for article in extra {
        if seen.insert(article.title.to_lowercase()) {
            articles.push(article);
        }
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(json: &str) -> NewsResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_articles() {
        let body = response(
            r#"{
                "meta": { "found": 2, "returned": 2, "limit": 10, "page": 1 },
                "data": [
                    {
                        "uuid": "a1",
                        "title": "Nvidia beats estimates",
                        "description": "Record data center revenue.",
                        "published_at": "2024-06-03T10:15:00.000000Z",
                        "source": "reuters.com",
                        "url": "https://example.com/a1",
                        "relevance_score": 0.92
                    },
                    {
                        "uuid": "a2",
                        "title": "Chip stocks mixed",
                        "description": null,
                        "published_at": "2024-06-02T21:00:00Z",
                        "source": "cnbc.com",
                        "url": "https://example.com/a2",
                        "relevance_score": null
                    }
                ]
            }"#,
        );

        let articles = parse_response(body).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Nvidia beats estimates");
        assert_eq!(articles[0].published_at, Utc.with_ymd_and_hms(2024, 6, 3, 10, 15, 0).unwrap());
        assert_eq!(articles[0].relevance, Some(0.92));
        assert_eq!(articles[1].description, None);
        assert_eq!(articles[1].relevance, None);
    }

    #[test]
    fn test_error_payload() {
        let body = response(r#"{ "error": { "code": "usage_limit_reached", "message": "Limit reached" } }"#);
        assert!(matches!(parse_response(body), Err(AnalysisError::ApiError(_))));
    }

    #[test]
    fn test_bad_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let article = convert_article(RawArticle {
            title: "Gold steady".to_string(),
            description: None,
            published_at: Some("yesterday".to_string()),
            source: None,
            url: None,
            relevance_score: None,
        });
        assert!(article.published_at >= before);
    }

    #[test]
    fn test_merge_skips_duplicate_titles() {
        let body = response(
            r#"{ "data": [
                { "title": "Tesla rallies", "published_at": "2024-06-03T10:00:00Z" },
                { "title": "Musk speaks", "published_at": "2024-06-03T09:00:00Z" }
            ] }"#,
        );
        let extra_body = response(
            r#"{ "data": [
                { "title": "TESLA RALLIES", "published_at": "2024-06-03T10:00:00Z" },
                { "title": "EV demand cools", "published_at": "2024-06-03T08:00:00Z" }
            ] }"#,
        );

        let merged = merge_articles(parse_response(body).unwrap(), parse_response(extra_body).unwrap());
        let titles: Vec<&str> = merged.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Tesla rallies", "Musk speaks", "EV demand cools"]);
    }

    #[tokio::test]
    async fn test_exhausted_quota_skips_request() {
        let client = MarketauxClient::new("token".to_string(), 0).with_base_url("http://127.0.0.1:9");
        let err = client.get_articles("TSLA", 3).await.unwrap_err();
        assert!(matches!(err, AnalysisError::QuotaExceeded(_)));
    }
}
