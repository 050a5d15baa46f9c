use analysis_core::math::format_grouped;
use analysis_core::{Direction, SentimentLabel, SentimentResult, SignalStrength, TechnicalReport};

/// Sub-10 quotes (FX majors) keep five decimals, everything else two.
fn price_decimals(price: f64) -> usize {
    if price.abs() < 10.0 {
        5
    } else {
        2
    }
}

fn format_price(price: f64) -> String {
    format_grouped(price, price_decimals(price))
}

fn verdict_text(verdict: SignalStrength) -> &'static str {
    match verdict {
        SignalStrength::StrongBuy => "Strong buying opportunity detected.",
        SignalStrength::Buy => "Favorable conditions for buying.",
        SignalStrength::Hold => "Maintain current position.",
        SignalStrength::Sell => "Consider reducing exposure.",
        SignalStrength::StrongSell => "Strong selling pressure indicated.",
    }
}

/// Human-readable summary: price, RSI, trade setup, sentiment, verdict.
/// Clauses whose inputs are missing are left out; the verdict is always last.
pub fn generate_summary(
    symbol: &str,
    technical: &TechnicalReport,
    sentiment: &SentimentResult,
    verdict: SignalStrength,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(price) = technical.current_price {
        let change = match technical.price_change_pct {
            Some(pct) if pct != 0.0 => {
                let direction = if pct > 0.0 { "up" } else { "down" };
                format!(" ({} {:.1}%)", direction, pct.abs())
            }
            _ => String::new(),
        };
        parts.push(format!("{} trading at {}{}.", symbol, format_price(price), change));
    }

    if let Some(rsi) = technical.indicators.rsi14 {
        let reading = if rsi < 30.0 {
            "indicates oversold conditions"
        } else if rsi > 70.0 {
            "indicates overbought conditions"
        } else {
            "shows neutral momentum"
        };
        parts.push(format!("RSI at {:.0} {}.", rsi, reading));
    }

    if let Some(levels) = technical.levels.filter(|l| l.direction != Direction::None) {
        if let (Some(stop), Some(target)) = (levels.stop_loss, levels.take_profit_1) {
            parts.push(format!(
                "Signal: {} with Entry={}, SL={}, TP={}.",
                levels.direction.as_str(),
                format_price(levels.entry_price),
                format_price(stop),
                format_price(target)
            ));
        }
    }

    if sentiment.has_articles() {
        let mood = match sentiment.label {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        };
        parts.push(format!(
            "Market sentiment is {} based on {} recent articles.",
            mood, sentiment.article_count
        ));
    }

    parts.push(verdict_text(verdict).to_string());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{IndicatorSet, RsiZone, TradingLevels};

    fn report(price: Option<f64>, change: Option<f64>, rsi: Option<f64>) -> TechnicalReport {
        TechnicalReport {
            current_price: price,
            price_change_pct: change,
            high_24h: None,
            low_24h: None,
            volume_24h: None,
            indicators: IndicatorSet { rsi14: rsi, ..Default::default() },
            rsi_zone: RsiZone::from_rsi(rsi),
            macd_trend: None,
            signal: SignalStrength::Hold,
            confidence: 50.0,
            levels: price.map(TradingLevels::none),
        }
    }

    #[test]
    fn test_full_summary() {
        let mut tech = report(Some(2030.0), Some(1.234), Some(28.4));
        tech.levels = Some(TradingLevels {
            direction: Direction::Long,
            entry_price: 2030.0,
            stop_loss: Some(1999.0),
            take_profit_1: Some(2053.25),
            take_profit_2: Some(2076.5),
            risk_reward: Some(1.5),
        });
        let news = SentimentResult {
            score: 0.4,
            label: SentimentLabel::Positive,
            article_count: 7,
            confidence: 65.0,
        };

        let summary = generate_summary("XAUUSD", &tech, &news, SignalStrength::Buy);
        assert_eq!(
            summary,
            "XAUUSD trading at 2,030.00 (up 1.2%). RSI at 28 indicates oversold conditions. \
             Signal: LONG with Entry=2,030.00, SL=1,999.00, TP=2,053.25. \
             Market sentiment is positive based on 7 recent articles. \
             Favorable conditions for buying."
        );
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let tech = report(None, None, None);
        let summary = generate_summary("AAPL", &tech, &SentimentResult::empty(), SignalStrength::Hold);
        assert_eq!(summary, "Maintain current position.");
    }

    #[test]
    fn test_flat_change_and_neutral_rsi() {
        let tech = report(Some(1.08712), Some(0.0), Some(55.0));
        let summary = generate_summary("EURUSD", &tech, &SentimentResult::empty(), SignalStrength::Hold);
        assert_eq!(
            summary,
            "EURUSD trading at 1.08712. RSI at 55 shows neutral momentum. Maintain current position."
        );
    }

    #[test]
    fn test_falling_price_and_overbought() {
        let tech = report(Some(180.5), Some(-2.06), Some(74.2));
        let summary = generate_summary("TSLA", &tech, &SentimentResult::empty(), SignalStrength::StrongSell);
        assert!(summary.starts_with("TSLA trading at 180.50 (down 2.1%)."));
        assert!(summary.contains("RSI at 74 indicates overbought conditions."));
        assert!(summary.ends_with("Strong selling pressure indicated."));
    }

    #[test]
    fn test_zero_rsi_is_reported() {
        let tech = report(Some(80.0), None, Some(0.0));
        let summary = generate_summary("AAPL", &tech, &SentimentResult::empty(), SignalStrength::Hold);
        assert_eq!(
            summary,
            "AAPL trading at 80.00. RSI at 0 indicates oversold conditions. Maintain current position."
        );
    }
}
