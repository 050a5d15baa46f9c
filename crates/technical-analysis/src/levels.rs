//! ATR-based entry, stop-loss and take-profit levels.

use analysis_core::math::round_to;
use analysis_core::{Direction, RsiZone, TradingLevels};

pub const STOP_LOSS_ATR_MULTIPLIER: f64 = 2.0;
pub const TAKE_PROFIT_1_ATR_MULTIPLIER: f64 = 1.5;
pub const TAKE_PROFIT_2_ATR_MULTIPLIER: f64 = 3.0;

pub const PRICE_DECIMALS: u32 = 6;
pub const RATIO_DECIMALS: u32 = 2;

/// Oversold opens a LONG, overbought a SHORT, neutral nothing.
///
/// Returns direction NONE (entry only) when the ATR is missing or not
/// positive, the price is not a positive finite number, or rounding would
/// break the strict ordering of the levels.
pub fn trading_levels(current_price: f64, atr: Option<f64>, zone: RsiZone) -> TradingLevels {
    let entry = if current_price.is_finite() {
        round_to(current_price, PRICE_DECIMALS)
    } else {
        current_price
    };

    let atr = match atr {
        Some(a) if a.is_finite() && a > 0.0 => a,
        _ => return TradingLevels::none(entry),
    };
    if !current_price.is_finite() || current_price <= 0.0 {
        return TradingLevels::none(entry);
    }

    let sign = match zone {
        RsiZone::Oversold => 1.0,
        RsiZone::Overbought => -1.0,
        RsiZone::Neutral => return TradingLevels::none(entry),
    };

    let stop_loss = round_to(current_price - sign * STOP_LOSS_ATR_MULTIPLIER * atr, PRICE_DECIMALS);
    let take_profit_1 = round_to(current_price + sign * TAKE_PROFIT_1_ATR_MULTIPLIER * atr, PRICE_DECIMALS);
    let take_profit_2 = round_to(current_price + sign * TAKE_PROFIT_2_ATR_MULTIPLIER * atr, PRICE_DECIMALS);

    let ordered = if sign > 0.0 {
        stop_loss < entry && entry < take_profit_1 && take_profit_1 < take_profit_2
    } else {
        stop_loss > entry && entry > take_profit_1 && take_profit_1 > take_profit_2
    };
    if !ordered {
        tracing::debug!("ATR {} too small for price precision, no levels", atr);
        return TradingLevels::none(entry);
    }

    let risk = (entry - stop_loss).abs();
    let reward = (take_profit_2 - entry).abs();
    let risk_reward = if risk == 0.0 {
        0.0
    } else {
        round_to(reward / risk, RATIO_DECIMALS)
    };

    TradingLevels {
        direction: if sign > 0.0 { Direction::Long } else { Direction::Short },
        entry_price: entry,
        stop_loss: Some(stop_loss),
        take_profit_1: Some(take_profit_1),
        take_profit_2: Some(take_profit_2),
        risk_reward: Some(risk_reward),
    }
}
