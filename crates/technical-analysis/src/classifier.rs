use analysis_core::math::mean;
use analysis_core::{IndicatorSet, MacdTrend, SignalStrength};

/// Inputs to the rule-based technical classifier. Absent values contribute nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifierInput {
    pub rsi: Option<f64>,
    pub macd_trend: Option<MacdTrend>,
    pub price_to_sma20: Option<f64>,
    pub price_to_sma50: Option<f64>,
}

impl ClassifierInput {
    pub fn from_indicators(current_price: f64, indicators: &IndicatorSet) -> Self {
        let ratio = |sma: Option<f64>| match sma {
            Some(s) if s != 0.0 && s.is_finite() => Some(current_price / s),
            _ => None,
        };

        Self {
            rsi: indicators.rsi14,
            macd_trend: indicators.macd_trend(),
            price_to_sma20: ratio(indicators.sma20),
            price_to_sma50: ratio(indicators.sma50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub signal: SignalStrength,
    /// Raw score, 50 is neutral
    pub score: f64,
    /// 0-100
    pub confidence: f64,
}

pub fn classify(input: &ClassifierInput) -> Classification {
    let mut score = 50.0;
    let mut confidence_factors: Vec<f64> = Vec::new();

    if let Some(rsi) = input.rsi {
        if rsi < 20.0 {
            score += 25.0;
            confidence_factors.push(0.9);
        } else if rsi < 30.0 {
            score += 15.0;
            confidence_factors.push(0.8);
        } else if rsi > 80.0 {
            score -= 25.0;
            confidence_factors.push(0.9);
        } else if rsi > 70.0 {
            score -= 15.0;
            confidence_factors.push(0.8);
        } else {
            confidence_factors.push(0.5);
        }
    }

    match input.macd_trend {
        Some(MacdTrend::Bullish) => {
            score += 12.0;
            confidence_factors.push(0.7);
        }
        Some(MacdTrend::Bearish) => {
            score -= 12.0;
            confidence_factors.push(0.7);
        }
        Some(MacdTrend::Neutral) => confidence_factors.push(0.4),
        None => {}
    }

    // Trend filters move the score only
    if let Some(ratio) = input.price_to_sma20 {
        if ratio > 1.02 {
            score += 10.0;
        } else if ratio < 0.98 {
            score -= 10.0;
        }
    }

    if let Some(ratio) = input.price_to_sma50 {
        if ratio > 1.05 {
            score += 8.0;
        } else if ratio < 0.95 {
            score -= 8.0;
        }
    }

    let confidence = mean(&confidence_factors).map(|m| m * 100.0).unwrap_or(50.0);

    Classification {
        signal: SignalStrength::from_score(score),
        score,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_inputs_is_neutral() {
        let c = classify(&ClassifierInput::default());
        assert_eq!(c.signal, SignalStrength::Hold);
        assert_relative_eq!(c.score, 50.0);
        assert_relative_eq!(c.confidence, 50.0);
    }

    #[test]
    fn test_deep_oversold_bullish_uptrend() {
        let c = classify(&ClassifierInput {
            rsi: Some(18.0),
            macd_trend: Some(MacdTrend::Bullish),
            price_to_sma20: Some(1.03),
            price_to_sma50: Some(1.06),
        });
        assert_relative_eq!(c.score, 105.0);
        assert_eq!(c.signal, SignalStrength::StrongBuy);
        assert_relative_eq!(c.confidence, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overbought_bearish() {
        let c = classify(&ClassifierInput {
            rsi: Some(75.0),
            macd_trend: Some(MacdTrend::Bearish),
            price_to_sma20: None,
            price_to_sma50: None,
        });
        assert_relative_eq!(c.score, 23.0);
        assert_eq!(c.signal, SignalStrength::StrongSell);
        assert_relative_eq!(c.confidence, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_neutral_rsi_and_macd() {
        let c = classify(&ClassifierInput {
            rsi: Some(50.0),
            macd_trend: Some(MacdTrend::Neutral),
            price_to_sma20: Some(0.97),
            price_to_sma50: Some(1.0),
        });
        assert_relative_eq!(c.score, 40.0);
        assert_eq!(c.signal, SignalStrength::Sell);
        assert_relative_eq!(c.confidence, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sma_ratios_do_not_add_confidence() {
        let c = classify(&ClassifierInput {
            rsi: None,
            macd_trend: None,
            price_to_sma20: Some(1.10),
            price_to_sma50: Some(1.10),
        });
        assert_relative_eq!(c.score, 68.0);
        assert_eq!(c.signal, SignalStrength::Buy);
        assert_relative_eq!(c.confidence, 50.0);
    }

    #[test]
    fn test_ratio_skips_zero_sma() {
        let indicators = IndicatorSet {
            sma20: Some(0.0),
            sma50: Some(100.0),
            ..Default::default()
        };
        let input = ClassifierInput::from_indicators(110.0, &indicators);
        assert_eq!(input.price_to_sma20, None);
        assert_relative_eq!(input.price_to_sma50.unwrap(), 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_rsi_thresholds_are_strict() {
        let rsi_only = |rsi: f64| {
            classify(&ClassifierInput {
                rsi: Some(rsi),
                ..Default::default()
            })
        };

        let at_20 = rsi_only(20.0);
        assert_relative_eq!(at_20.score, 65.0);
        assert_relative_eq!(at_20.confidence, 80.0, epsilon = 1e-9);

        let at_30 = rsi_only(30.0);
        assert_relative_eq!(at_30.score, 50.0);
        assert_relative_eq!(at_30.confidence, 50.0, epsilon = 1e-9);

        let at_70 = rsi_only(70.0);
        assert_relative_eq!(at_70.score, 50.0);
        assert_relative_eq!(at_70.confidence, 50.0, epsilon = 1e-9);

        let at_80 = rsi_only(80.0);
        assert_relative_eq!(at_80.score, 35.0);
        assert_eq!(at_80.signal, SignalStrength::Sell);
        assert_relative_eq!(at_80.confidence, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sma_ratio_thresholds_are_strict() {
        for (sma20, sma50) in [(1.02, 1.05), (0.98, 0.95)] {
            let c = classify(&ClassifierInput {
                price_to_sma20: Some(sma20),
                price_to_sma50: Some(sma50),
                ..Default::default()
            });
            assert_relative_eq!(c.score, 50.0);
            assert_eq!(c.signal, SignalStrength::Hold);
        }
    }
}
