//! Session statistics: rolling FPS and cumulative detection counters.
//!
//! Counters are reset when capture starts, updated once per processed frame
//! and displayed live; nothing here is persisted beyond the session.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const FPS_WINDOW: usize = 30;

/// FPS over a rolling window of frame intervals.
#[derive(Debug)]
pub struct FpsCounter {
    intervals: VecDeque<Duration>,
    last: Instant,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            intervals: VecDeque::with_capacity(FPS_WINDOW),
            last: Instant::now(),
        }
    }

    /// Record a frame boundary and return the current FPS estimate.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        if self.intervals.len() == FPS_WINDOW {
            self.intervals.pop_front();
        }
        self.intervals.push_back(now - self.last);
        self.last = now;
        self.fps()
    }

    pub fn fps(&self) -> f32 {
        let total: Duration = self.intervals.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.intervals.len() as f32 / total.as_secs_f32()
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
        self.last = Instant::now();
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

use crate::detect::FrameCounts;

/// Cumulative per-session detection counters.
#[derive(Debug)]
pub struct SessionStats {
    pub bottle_count: u64,
    pub with_cap_count: u64,
    pub without_cap_count: u64,
    pub brand_counts: HashMap<String, u64>,
    pub total_frames: u64,
    started: Instant,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            bottle_count: 0,
            with_cap_count: 0,
            without_cap_count: 0,
            brand_counts: HashMap::new(),
            total_frames: 0,
            started: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Fold one frame's counts and brand labels into the session totals.
    pub fn record(&mut self, counts: &FrameCounts, brands: &[&str]) {
        self.bottle_count += counts.bottles as u64;
        self.with_cap_count += counts.with_cap as u64;
        self.without_cap_count += counts.without_cap as u64;
        self.total_frames += 1;
        for brand in brands {
            *self.brand_counts.entry((*brand).to_string()).or_insert(0) += 1;
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn summary(&self) -> StatsSummary {
        let elapsed = self.elapsed().as_secs_f64().max(f64::MIN_POSITIVE);
        let mut brands: Vec<(String, u64)> = self
            .brand_counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        // Most-seen first, name as tiebreaker so the display is stable.
        brands.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        StatsSummary {
            bottles: self.bottle_count,
            with_cap: self.with_cap_count,
            without_cap: self.without_cap_count,
            total_frames: self.total_frames,
            elapsed_secs: self.elapsed().as_secs_f64(),
            avg_bottles_per_frame: self.bottle_count as f64 / self.total_frames.max(1) as f64,
            avg_fps: self.total_frames as f64 / elapsed,
            brands,
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub bottles: u64,
    pub with_cap: u64,
    pub without_cap: u64,
    pub total_frames: u64,
    pub elapsed_secs: f64,
    pub avg_bottles_per_frame: f64,
    pub avg_fps: f64,
    /// Per-brand detection counts, most frequent first.
    pub brands: Vec<(String, u64)>,
}
