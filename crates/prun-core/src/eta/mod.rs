//! Remaining-time estimate from a stream of completed-item counts.
//!
//! Per-item latency is an exponentially weighted moving average over the intervals between
//! reports. The blended estimate additionally mixes in the whole-run average, which is steadier
//! while only a few items have completed.
use std::time::{Duration, Instant};

/// Smoothing factor for new per-item samples.
pub const ALPHA: f64 = 0.10;
/// Weight of the whole-run average in the blended estimate.
pub const BETA: f64 = 0.5;
/// Minimum interval between changes of the visible estimate.
pub const REFRESH: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Eta {
    total: u64,
    completed: u64,
    last_completed: u64,
    window_start: Instant,
    last_sample: Instant,
    per_item: Option<Duration>,
    visible: Option<Duration>,
    visible_at: Option<Instant>,
}

impl Eta {
    pub fn new(start: Instant, total: u64) -> Self {
        Self {
            total,
            completed: 0,
            last_completed: 0,
            window_start: start,
            last_sample: start,
            per_item: None,
            visible: None,
            visible_at: None,
        }
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Smoothed per-item duration, `None` before the first completed item.
    pub fn per_item(&self) -> Option<Duration> {
        self.per_item
    }

    pub fn report(&mut self, completed: u64) {
        self.report_at(completed, Instant::now());
    }

    /// Record that `completed` items are done in total as of `now`.
    ///
    /// Zero and unchanged counts carry no information and are ignored.
    pub fn report_at(&mut self, completed: u64, now: Instant) {
        if completed == 0 || completed == self.completed {
            return;
        }
        self.completed = completed;

        let Some(fresh) = completed
            .checked_sub(self.last_completed)
            .filter(|n| *n > 0)
        else {
            self.last_completed = completed;
            self.last_sample = now;
            return;
        };

        let block = now.saturating_duration_since(self.last_sample);
        self.last_sample = now;
        self.last_completed = completed;

        let sample = block.div_f64(fresh as f64);
        self.per_item = Some(match self.per_item {
            None => sample,
            Some(prev) => Duration::from_secs_f64(
                ALPHA * sample.as_secs_f64() + (1.0 - ALPHA) * prev.as_secs_f64(),
            ),
        });
    }

    /// `(total - completed) × per-item estimate`.
    pub fn eta(&self) -> Option<Duration> {
        let per_item = self.per_item?;
        Some(per_item.mul_f64(self.remaining() as f64))
    }

    /// Like [`Eta::eta`] but with the per-item estimate blended against the whole-run average.
    pub fn eta_blended_at(&self, now: Instant) -> Option<Duration> {
        let per_item = self.per_item?;
        if self.completed == 0 {
            return None;
        }
        let whole_run = now
            .saturating_duration_since(self.window_start)
            .div_f64(self.completed as f64);
        let blended = BETA * whole_run.as_secs_f64() + (1.0 - BETA) * per_item.as_secs_f64();
        Some(Duration::from_secs_f64(blended * self.remaining() as f64))
    }

    /// Blended estimate as shown to the user: recomputed at most once per [`REFRESH`].
    pub fn visible_at(&mut self, now: Instant) -> Option<Duration> {
        let stale = self
            .visible_at
            .is_none_or(|at| now.saturating_duration_since(at) >= REFRESH);
        if stale || self.visible.is_none() {
            self.visible = self.eta_blended_at(now);
            if self.visible.is_some() {
                self.visible_at = Some(now);
            }
        }
        self.visible
    }

    fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.completed)
    }
}
