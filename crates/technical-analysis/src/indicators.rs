use analysis_core::{Bar, IndicatorSet};
use serde::{Deserialize, Serialize};

/// Simple Moving Average. One value per full window, aligned to the window's last bar.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Exponential Moving Average with alpha = 2/(period+1), seeded by the first value.
/// Defined for every input bar.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.is_empty() {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);

    for i in 1..data.len() {
        let ema_val = (data[i] - result[i - 1]) * multiplier + result[i - 1];
        result.push(ema_val);
    }

    result
}

/// How the RSI gain/loss streams are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSmoothing {
    /// Wilder-style exponential average, alpha = 1/period, bias-adjusted weights
    #[default]
    Wilder,
    /// Rolling arithmetic mean over the last `period` changes
    Simple,
}

/// Relative Strength Index.
///
/// Returns one entry per bar from index `period` onward (the first `period`
/// bars are warm-up). An entry is `None` when both average gain and average
/// loss are zero, which happens on a flat window.
pub fn rsi(data: &[f64], period: usize, smoothing: RsiSmoothing) -> Vec<Option<f64>> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let averages: Vec<(f64, f64)> = match smoothing {
        RsiSmoothing::Wilder => {
            let decay = 1.0 - 1.0 / period as f64;
            let mut gain_num = 0.0;
            let mut loss_num = 0.0;
            let mut weight = 0.0;
            let mut out = Vec::with_capacity(gains.len());
            for (g, l) in gains.iter().zip(&losses) {
                gain_num = g + decay * gain_num;
                loss_num = l + decay * loss_num;
                weight = 1.0 + decay * weight;
                out.push((gain_num / weight, loss_num / weight));
            }
            out.split_off(period - 1)
        }
        RsiSmoothing::Simple => sma(&gains, period)
            .into_iter()
            .zip(sma(&losses, period))
            .collect(),
    };

    averages
        .into_iter()
        .map(|(avg_gain, avg_loss)| rsi_from_averages(avg_gain, avg_loss))
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 {
            return Some(100.0);
        }
        return None;
    }

    let rs = avg_gain / avg_loss;
    Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// All three series are aligned with the input and have its length.
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || slow_period < fast_period {
        return MacdResult { macd_line: vec![], signal_line: vec![], histogram: vec![] };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let macd_line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal_period);
    let histogram = macd_line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// True range per bar. The first bar has no previous close, so its range is high - low.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut ranges = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let high_low = bar.high - bar.low;
        let tr = match i.checked_sub(1).map(|p| bars[p].close) {
            Some(prev_close) => {
                let high_close = (bar.high - prev_close).abs();
                let low_close = (bar.low - prev_close).abs();
                high_low.max(high_close).max(low_close)
            }
            None => high_low,
        };
        ranges.push(tr);
    }

    ranges
}

/// Average True Range as a simple rolling mean of the true range.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    sma(&true_range(bars), period)
}

/// Lookback periods for [`compute_indicators`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub rsi_smoothing: RsiSmoothing,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_smoothing: RsiSmoothing::Wilder,
            sma_fast: 20,
            sma_slow: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
        }
    }
}

/// Latest value of every indicator for an ascending bar series.
pub fn compute_indicators(bars: &[Bar], params: &IndicatorParams) -> IndicatorSet {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let rsi14 = rsi(&closes, params.rsi_period, params.rsi_smoothing)
        .last()
        .copied()
        .flatten();

    let (macd_line, macd_signal, macd_histogram) =
        if params.macd_slow > 0 && closes.len() >= params.macd_slow {
            let result = macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal);
            (
                result.macd_line.last().copied(),
                result.signal_line.last().copied(),
                result.histogram.last().copied(),
            )
        } else {
            (None, None, None)
        };

    IndicatorSet {
        rsi14,
        sma20: sma(&closes, params.sma_fast).last().copied(),
        sma50: sma(&closes, params.sma_slow).last().copied(),
        macd_line,
        macd_signal,
        macd_histogram,
        atr14: atr(bars, params.atr_period).last().copied(),
    }
}
