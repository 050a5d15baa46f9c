use analysis_core::math::round_to;
use analysis_core::{SentimentLabel, SentimentResult, SignalStrength};

pub const TECHNICAL_WEIGHT: f64 = 0.6;
pub const SENTIMENT_WEIGHT: f64 = 0.4;

/// Confidence multiplier when only the technical side is available
pub const TECHNICAL_ONLY_CONFIDENCE_FACTOR: f64 = 0.8;

const POSITIVE_FLOOR: f64 = 60.0;
const NEGATIVE_CEILING: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridResult {
    pub score: f64,
    pub verdict: SignalStrength,
    pub confidence: f64,
}

/// Map a sentiment in [-1, 1] onto 0-100, keeping the label's side of 50.
pub fn sentiment_to_score(sentiment: &SentimentResult) -> f64 {
    let score = ((sentiment.score.clamp(-1.0, 1.0) + 1.0) * 50.0).clamp(0.0, 100.0);
    match sentiment.label {
        SentimentLabel::Positive => score.max(POSITIVE_FLOOR),
        SentimentLabel::Negative => score.min(NEGATIVE_CEILING),
        SentimentLabel::Neutral => score,
    }
}

/// Blend the technical verdict with news sentiment.
///
/// With no articles the technical score stands alone and its confidence is
/// discounted.
pub fn combine(
    technical: SignalStrength,
    technical_confidence: f64,
    sentiment: &SentimentResult,
) -> HybridResult {
    let tech_score = technical.to_score();

    let (score, confidence) = if sentiment.has_articles() {
        (
            TECHNICAL_WEIGHT * tech_score + SENTIMENT_WEIGHT * sentiment_to_score(sentiment),
            TECHNICAL_WEIGHT * technical_confidence + SENTIMENT_WEIGHT * sentiment.confidence,
        )
    } else {
        (tech_score, technical_confidence * TECHNICAL_ONLY_CONFIDENCE_FACTOR)
    };

    let score = round_to(score, 2);
    HybridResult {
        score,
        verdict: SignalStrength::from_score(score),
        confidence: round_to(confidence.clamp(0.0, 100.0), 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sentiment(score: f64, articles: usize, confidence: f64) -> SentimentResult {
        SentimentResult {
            score,
            label: SentimentLabel::from_score(score),
            article_count: articles,
            confidence,
        }
    }

    #[test]
    fn test_technical_only_fallback() {
        let result = combine(SignalStrength::StrongBuy, 80.0, &SentimentResult::empty());
        assert_relative_eq!(result.score, 90.0);
        assert_eq!(result.verdict, SignalStrength::StrongBuy);
        assert_relative_eq!(result.confidence, 64.0);
    }

    #[test]
    fn test_positive_news_lifts_hold_to_buy() {
        let news = sentiment(0.8, 6, 60.0);
        assert_relative_eq!(sentiment_to_score(&news), 90.0);

        let result = combine(SignalStrength::Hold, 50.0, &news);
        assert_relative_eq!(result.score, 66.0);
        assert_eq!(result.verdict, SignalStrength::Buy);
        assert_relative_eq!(result.confidence, 0.6 * 50.0 + 0.4 * 60.0);
    }

    #[test]
    fn test_label_floor_and_ceiling() {
        // +0.15 maps to 57.5, lifted to the positive floor
        assert_relative_eq!(sentiment_to_score(&sentiment(0.15, 1, 35.0)), 60.0);
        // -0.15 maps to 42.5, pushed down to the negative ceiling
        assert_relative_eq!(sentiment_to_score(&sentiment(-0.15, 1, 35.0)), 40.0);
        assert_relative_eq!(sentiment_to_score(&sentiment(-1.0, 1, 35.0)), 0.0);
        assert_relative_eq!(sentiment_to_score(&sentiment(0.0, 1, 35.0)), 50.0);
    }

    #[test]
    fn test_negative_news_drags_verdict() {
        let news = sentiment(-0.9, 10, 80.0);
        let result = combine(SignalStrength::Sell, 70.0, &news);
        // 0.6 * 30 + 0.4 * 5
        assert_relative_eq!(result.score, 20.0);
        assert_eq!(result.verdict, SignalStrength::StrongSell);
    }

    #[test]
    fn test_monotonic_in_technical_rank() {
        let ranks = [
            SignalStrength::StrongSell,
            SignalStrength::Sell,
            SignalStrength::Hold,
            SignalStrength::Buy,
            SignalStrength::StrongBuy,
        ];
        for news in [SentimentResult::empty(), sentiment(-0.6, 4, 50.0), sentiment(0.7, 4, 50.0)] {
            let scores: Vec<f64> = ranks.iter().map(|&r| combine(r, 60.0, &news).score).collect();
            assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}", scores);
        }
    }
}
