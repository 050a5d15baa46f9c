use analysis_core::Bar;
use chrono::{DateTime, Utc};

/// Sort ascending, collapse duplicate timestamps (the later bar wins) and drop
/// bars whose close is not a positive finite number.
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    let before = bars.len();
    bars.retain(|b| b.close.is_finite() && b.close > 0.0);
    bars.sort_by_key(|b| b.timestamp);

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => out.push(bar),
        }
    }

    if out.len() != before {
        tracing::debug!("Normalized bars: {} -> {}", before, out.len());
    }
    let inconsistent = out.iter().filter(|b| !is_consistent(b)).count();
    if inconsistent > 0 {
        tracing::warn!("{} bars have inconsistent OHLC values", inconsistent);
    }
    out
}

/// OHLC consistency: high >= low and both bracket open and close.
pub fn is_consistent(bar: &Bar) -> bool {
    bar.high >= bar.low
        && bar.high >= bar.open.max(bar.close)
        && bar.low <= bar.open.min(bar.close)
}

/// Aggregate ascending bars into fixed UTC buckets of `bucket_minutes`.
///
/// Each output bar has:
/// - timestamp = bucket start
/// - open = first bar's open
/// - high = max high in the bucket
/// - low = min low in the bucket
/// - close = last bar's close
/// - volume = sum of all volumes
pub fn aggregate_bars(bars: &[Bar], bucket_minutes: i64) -> Vec<Bar> {
    if bars.is_empty() || bucket_minutes <= 0 {
        return Vec::new();
    }

    let mut aggregated: Vec<Bar> = Vec::new();
    let mut current: Option<(DateTime<Utc>, Vec<&Bar>)> = None;

    for bar in bars {
        let start = bucket_start(bar.timestamp, bucket_minutes);

        match &mut current {
            Some((s, group)) if *s == start => {
                group.push(bar);
            }
            _ => {
                if let Some((s, group)) = current.take() {
                    if let Some(merged) = merge_bucket(s, &group) {
                        aggregated.push(merged);
                    }
                }
                current = Some((start, vec![bar]));
            }
        }
    }

    if let Some((s, group)) = current {
        if let Some(merged) = merge_bucket(s, &group) {
            aggregated.push(merged);
        }
    }

    aggregated
}

fn bucket_start(ts: DateTime<Utc>, bucket_minutes: i64) -> DateTime<Utc> {
    let bucket_secs = bucket_minutes * 60;
    let secs = ts.timestamp();
    let floored = secs - secs.rem_euclid(bucket_secs);
    DateTime::<Utc>::from_timestamp(floored, 0).unwrap_or(ts)
}

fn merge_bucket(start: DateTime<Utc>, group: &[&Bar]) -> Option<Bar> {
    let first = group.first()?;
    let last = group.last()?;

    Some(Bar {
        timestamp: start,
        open: first.open,
        high: group.iter().map(|b| b.high).fold(f64::MIN, f64::max),
        low: group.iter().map(|b| b.low).fold(f64::MAX, f64::min),
        close: last.close,
        volume: group.iter().map(|b| b.volume).sum(),
    })
}
