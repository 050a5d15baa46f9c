use analysis_core::math::{round_opt, round_to};
use analysis_core::{Bar, IndicatorSet, SignalStrength, TechnicalReport};

use crate::bars::normalize_bars;
use crate::classifier::{classify, ClassifierInput};
use crate::indicators::{compute_indicators, IndicatorParams};
use crate::levels::{trading_levels, PRICE_DECIMALS};

/// Number of trailing bars used for the rolling high/low/volume/change stats
pub const STATS_WINDOW: usize = 24;

/// Runs indicators, classifier and level generator over one bar series.
pub struct TechnicalAnalysisEngine {
    params: IndicatorParams,
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self::with_params(IndicatorParams::default())
    }

    pub fn with_params(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Never fails: an empty or short series degrades to HOLD with absent indicators.
    pub fn analyze(&self, symbol: &str, bars: &[Bar]) -> TechnicalReport {
        let bars = normalize_bars(bars.to_vec());

        let Some(last) = bars.last() else {
            tracing::warn!("{}: no price data, reporting HOLD", symbol);
            return empty_report();
        };
        let current_price = last.close;

        let indicators = compute_indicators(&bars, &self.params);
        let classification = classify(&ClassifierInput::from_indicators(current_price, &indicators));
        let rsi_zone = indicators.rsi_zone();
        let levels = trading_levels(current_price, indicators.atr14, rsi_zone);

        let window = &bars[bars.len().saturating_sub(STATS_WINDOW)..];
        let reference = &bars[bars.len() - 1 - STATS_WINDOW.min(bars.len() - 1)];
        let price_change_pct = if reference.close > 0.0 {
            (current_price - reference.close) / reference.close * 100.0
        } else {
            0.0
        };
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let volume: f64 = window.iter().map(|b| b.volume).sum();

        tracing::info!(
            "{}: RSI={}, signal={}, confidence={:.1}%, direction={}",
            symbol,
            indicators.rsi14.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "N/A".to_string()),
            classification.signal,
            classification.confidence,
            levels.direction.as_str()
        );

        TechnicalReport {
            current_price: Some(round_to(current_price, PRICE_DECIMALS)),
            price_change_pct: Some(round_to(price_change_pct, 4)),
            high_24h: Some(round_to(high, PRICE_DECIMALS)),
            low_24h: Some(round_to(low, PRICE_DECIMALS)),
            volume_24h: Some(volume),
            indicators: round_indicators(&indicators),
            rsi_zone,
            macd_trend: indicators.macd_trend(),
            signal: classification.signal,
            confidence: round_to(classification.confidence, 2),
            levels: Some(levels),
        }
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_report() -> TechnicalReport {
    TechnicalReport {
        current_price: None,
        price_change_pct: None,
        high_24h: None,
        low_24h: None,
        volume_24h: None,
        indicators: IndicatorSet::default(),
        rsi_zone: analysis_core::RsiZone::Neutral,
        macd_trend: None,
        signal: SignalStrength::Hold,
        confidence: 0.0,
        levels: None,
    }
}

fn round_indicators(ind: &IndicatorSet) -> IndicatorSet {
    IndicatorSet {
        rsi14: round_opt(ind.rsi14, 2),
        sma20: round_opt(ind.sma20, PRICE_DECIMALS),
        sma50: round_opt(ind.sma50, PRICE_DECIMALS),
        macd_line: round_opt(ind.macd_line, PRICE_DECIMALS),
        macd_signal: round_opt(ind.macd_signal, PRICE_DECIMALS),
        macd_histogram: round_opt(ind.macd_histogram, PRICE_DECIMALS),
        atr14: round_opt(ind.atr14, PRICE_DECIMALS),
    }
}
