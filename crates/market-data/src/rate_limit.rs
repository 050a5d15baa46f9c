use analysis_core::AnalysisError;
use chrono::{DateTime, Datelike, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Wait until a request slot is free, then take it.
    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for a request slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Debug)]
struct QuotaState {
    period: (i32, u32),
    used: u32,
}

/// Request budget per UTC calendar month. The count resets at the first
/// instant of each new month.
#[derive(Clone)]
pub struct MonthlyQuota {
    limit: u32,
    state: Arc<Mutex<QuotaState>>,
}

impl MonthlyQuota {
    pub fn new(limit: u32) -> Self {
        let now = Utc::now();
        Self {
            limit,
            state: Arc::new(Mutex::new(QuotaState {
                period: (now.year(), now.month()),
                used: 0,
            })),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Consume one unit. Returns the units left this month.
    pub async fn try_acquire(&self) -> Result<u32, AnalysisError> {
        self.try_acquire_at(Utc::now()).await
    }

    pub async fn try_acquire_at(&self, now: DateTime<Utc>) -> Result<u32, AnalysisError> {
        let mut state = self.state.lock().await;
        roll_period(&mut state, now);

        if state.used >= self.limit {
            return Err(AnalysisError::QuotaExceeded(format!(
                "monthly limit of {} requests reached for {}-{:02}",
                self.limit, state.period.0, state.period.1
            )));
        }

        state.used += 1;
        Ok(self.limit - state.used)
    }

    pub async fn remaining_at(&self, now: DateTime<Utc>) -> u32 {
        let mut state = self.state.lock().await;
        roll_period(&mut state, now);
        self.limit.saturating_sub(state.used)
    }
}

fn roll_period(state: &mut QuotaState, now: DateTime<Utc>) {
    let period = (now.year(), now.month());
    if period != state.period {
        tracing::info!(
            "News quota reset for {}-{:02} ({} used last period)",
            period.0,
            period.1,
            state.used
        );
        state.period = period;
        state.used = 0;
    }
}
