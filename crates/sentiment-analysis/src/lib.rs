use analysis_core::{NewsArticle, SentimentLabel, SentimentResult};
use chrono::{DateTime, Utc};

pub mod lexicon;
pub use lexicon::LexiconScorer;

/// At most this many articles are scored per symbol
pub const MAX_ARTICLES: usize = 20;

/// Descriptions are cut to this many characters before scoring
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Relevance assumed when the provider does not report one
pub const DEFAULT_RELEVANCE: f64 = 0.5;

const MIN_RECENCY_WEIGHT: f64 = 0.1;

/// One article after scoring
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    pub score: f64,
    pub published_at: DateTime<Utc>,
    pub relevance: Option<f64>,
}

pub struct SentimentAnalysisEngine {
    scorer: LexiconScorer,
    recency_weighting: bool,
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        Self {
            scorer: LexiconScorer::new(),
            recency_weighting: true,
        }
    }

    pub fn with_scorer(scorer: LexiconScorer) -> Self {
        Self {
            scorer,
            recency_weighting: true,
        }
    }

    /// Disable recency/relevance weighting and use a plain mean.
    pub fn with_recency_weighting(mut self, enabled: bool) -> Self {
        self.recency_weighting = enabled;
        self
    }

    /// Polarity of `"{title}. {description}"`, description truncated.
    pub fn score_article(&self, article: &NewsArticle) -> f64 {
        let description: String = article
            .description
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(MAX_DESCRIPTION_CHARS)
            .collect();
        self.scorer.polarity(&format!("{}. {}", article.title, description))
    }

    /// Score up to [`MAX_ARTICLES`] articles and aggregate them as of `now`.
    pub fn analyze(&self, symbol: &str, articles: &[NewsArticle], now: DateTime<Utc>) -> SentimentResult {
        if articles.is_empty() {
            tracing::debug!("{}: no articles, neutral sentiment", symbol);
            return SentimentResult::empty();
        }

        let scored: Vec<ScoredArticle> = articles
            .iter()
            .take(MAX_ARTICLES)
            .map(|a| ScoredArticle {
                score: self.score_article(a),
                published_at: a.published_at,
                relevance: a.relevance,
            })
            .collect();

        let score = if self.recency_weighting {
            weighted_sentiment(&scored, now)
        } else {
            mean_sentiment(&scored)
        };
        let label = SentimentLabel::from_score(score);
        let confidence = sentiment_confidence(scored.len());

        tracing::info!(
            "{}: sentiment={:.2} ({}), articles={}, confidence={:.0}%",
            symbol,
            score,
            label.as_str(),
            scored.len(),
            confidence
        );

        SentimentResult {
            score,
            label,
            article_count: scored.len(),
            confidence,
        }
    }
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// `max(0.1, 1 / (1 + age_hours / 24))`. Future timestamps count as age 0.
pub fn recency_weight(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = ((now - published_at).num_seconds() as f64 / 3600.0).max(0.0);
    (1.0 / (1.0 + age_hours / 24.0)).max(MIN_RECENCY_WEIGHT)
}

/// Recency times relevance weighted mean, 0 when no weight.
pub fn weighted_sentiment(articles: &[ScoredArticle], now: DateTime<Utc>) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for article in articles {
        let relevance = article.relevance.unwrap_or(DEFAULT_RELEVANCE).clamp(0.0, 1.0);
        let weight = recency_weight(article.published_at, now) * relevance;
        weighted_sum += article.score * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        (weighted_sum / total_weight).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

pub fn mean_sentiment(articles: &[ScoredArticle]) -> f64 {
    if articles.is_empty() {
        return 0.0;
    }
    articles.iter().map(|a| a.score).sum::<f64>() / articles.len() as f64
}

/// More articles, more confidence: 30 + 5 per article, capped at 80.
pub fn sentiment_confidence(article_count: usize) -> f64 {
    if article_count == 0 {
        return 0.0;
    }
    (30.0 + 5.0 * article_count as f64).min(80.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    fn article(title: &str, hours_ago: i64, relevance: Option<f64>) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            description: None,
            published_at: now() - Duration::hours(hours_ago),
            source: Some("test".to_string()),
            url: None,
            relevance,
        }
    }

    #[test]
    fn test_recency_weight() {
        assert_relative_eq!(recency_weight(now(), now()), 1.0);
        assert_relative_eq!(recency_weight(now() - Duration::hours(24), now()), 0.5);
        assert_relative_eq!(recency_weight(now() - Duration::hours(72), now()), 0.25);
        // floor
        assert_relative_eq!(recency_weight(now() - Duration::days(30), now()), 0.1);
        // future articles are treated as brand new
        assert_relative_eq!(recency_weight(now() + Duration::hours(5), now()), 1.0);
    }

    #[test]
    fn test_weighted_sentiment() {
        let scored = vec![
            ScoredArticle { score: 0.8, published_at: now(), relevance: Some(1.0) },
            ScoredArticle { score: -0.4, published_at: now() - Duration::hours(24), relevance: None },
        ];
        // weights 1.0 and 0.5 * 0.5 = 0.25
        let expected = (0.8 * 1.0 + -0.4 * 0.25) / 1.25;
        assert_relative_eq!(weighted_sentiment(&scored, now()), expected, epsilon = 1e-12);
        assert_relative_eq!(mean_sentiment(&scored), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_relevance_everywhere() {
        let scored = vec![ScoredArticle { score: 0.9, published_at: now(), relevance: Some(0.0) }];
        assert_eq!(weighted_sentiment(&scored, now()), 0.0);
    }

    #[test]
    fn test_confidence() {
        assert_eq!(sentiment_confidence(0), 0.0);
        assert_eq!(sentiment_confidence(1), 35.0);
        assert_eq!(sentiment_confidence(10), 80.0);
        assert_eq!(sentiment_confidence(20), 80.0);
    }

    #[test]
    fn test_analyze_empty() {
        let engine = SentimentAnalysisEngine::new();
        assert_eq!(engine.analyze("TSLA", &[], now()), SentimentResult::empty());
    }

    #[test]
    fn test_analyze_positive_news() {
        let engine = SentimentAnalysisEngine::new();
        let articles = vec![
            article("Tesla shares surge on strong deliveries", 2, Some(0.9)),
            article("Analysts upgrade Tesla after record profit", 10, None),
            article("Tesla annual meeting scheduled", 30, Some(0.4)),
        ];

        let result = engine.analyze("TSLA", &articles, now());
        assert_eq!(result.article_count, 3);
        assert_eq!(result.label, SentimentLabel::Positive);
        assert!(result.score > 0.15 && result.score <= 1.0);
        assert_eq!(result.confidence, 45.0);
    }

    #[test]
    fn test_analyze_caps_article_count() {
        let engine = SentimentAnalysisEngine::new();
        let articles: Vec<NewsArticle> = (0..30)
            .map(|i| article("Gold slump deepens as bearish bets pile up", i, None))
            .collect();

        let result = engine.analyze("XAUUSD", &articles, now());
        assert_eq!(result.article_count, MAX_ARTICLES);
        assert_eq!(result.label, SentimentLabel::Negative);
        assert_eq!(result.confidence, 80.0);
    }

    #[test]
    fn test_description_truncated() {
        let engine = SentimentAnalysisEngine::new();
        let mut a = article("Neutral headline", 1, None);
        a.description = Some(format!("{} crash", "x ".repeat(MAX_DESCRIPTION_CHARS)));
        // The negative word lies past the cut
        assert_eq!(engine.score_article(&a), 0.0);
    }
}
