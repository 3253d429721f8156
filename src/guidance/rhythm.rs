//! Compression rhythm feedback from manual taps.
//!
//! The rate is taken over the most recent taps (up to ten intervals) and
//! classified against the 100–120 compressions-per-minute guideline.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Slowest rate still considered on pace.
pub const MIN_ON_PACE_BPM: u32 = 100;

/// Fastest rate still considered on pace.
pub const MAX_ON_PACE_BPM: u32 = 120;

const WINDOW_INTERVALS: usize = 10;

/// Classification of the measured compression rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmVerdict {
    /// Below the guideline; push faster.
    TooSlow,
    /// Within the guideline.
    OnPace,
    /// Above the guideline; slow down.
    TooFast,
}

impl RhythmVerdict {
    /// Classifies a rate in compressions per minute.
    #[must_use]
    pub const fn classify(bpm: u32) -> Self {
        if bpm < MIN_ON_PACE_BPM {
            Self::TooSlow
        } else if bpm > MAX_ON_PACE_BPM {
            Self::TooFast
        } else {
            Self::OnPace
        }
    }

    /// Feedback phrase for the user.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::TooSlow => "Push faster!",
            Self::OnPace => "Perfect rhythm!",
            Self::TooFast => "Slow down!",
        }
    }
}

/// Measured rate and its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RhythmReading {
    /// Compressions per minute over the recent window
    pub bpm: u32,
    /// Classification against the guideline
    pub verdict: RhythmVerdict,
}

/// Rolling window of tap instants.
#[derive(Debug, Default, Clone)]
pub struct RhythmTracker {
    taps: VecDeque<Instant>,
}

impl RhythmTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            taps: VecDeque::new(),
        }
    }

    /// Records a tap and returns the updated reading, if two or more taps
    /// are on record.
    pub fn record(&mut self, at: Instant) -> Option<RhythmReading> {
        self.taps.push_back(at);
        while self.taps.len() > WINDOW_INTERVALS + 1 {
            self.taps.pop_front();
        }
        self.reading()
    }

    /// Current reading without recording a tap.
    #[must_use]
    pub fn reading(&self) -> Option<RhythmReading> {
        let (first, last) = (self.taps.front()?, self.taps.back()?);
        let intervals = u32::try_from(self.taps.len().checked_sub(1)?).ok()?;
        if intervals == 0 {
            return None;
        }
        let span = last.saturating_duration_since(*first);
        if span.is_zero() {
            return None;
        }
        let bpm = rate_per_minute(intervals, span);
        Some(RhythmReading {
            bpm,
            verdict: RhythmVerdict::classify(bpm),
        })
    }

    /// Forgets all taps.
    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

fn rate_per_minute(intervals: u32, span: Duration) -> u32 {
    let span_ms = span.as_millis().max(1);
    let per_minute = (u128::from(intervals) * 60_000 + span_ms / 2) / span_ms;
    u32::try_from(per_minute).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps_every(interval_ms: u64, count: usize) -> RhythmTracker {
        let start = Instant::now();
        let mut tracker = RhythmTracker::new();
        for i in 0..count {
            tracker.record(start + Duration::from_millis(interval_ms * i as u64));
        }
        tracker
    }

    #[test]
    fn test_single_tap_has_no_reading() {
        let tracker = taps_every(500, 1);
        assert_eq!(tracker.reading(), None);
    }

    #[test]
    fn test_on_pace_at_110() {
        // 545ms ≈ 110/min
        let reading = taps_every(545, 6).reading().unwrap();
        assert_eq!(reading.bpm, 110);
        assert_eq!(reading.verdict, RhythmVerdict::OnPace);
    }

    #[test]
    fn test_too_slow_and_too_fast() {
        assert_eq!(
            taps_every(1000, 4).reading().unwrap().verdict,
            RhythmVerdict::TooSlow
        );
        assert_eq!(
            taps_every(400, 4).reading().unwrap().verdict,
            RhythmVerdict::TooFast
        );
    }

    #[test]
    fn test_window_keeps_recent_taps_only() {
        let start = Instant::now();
        let mut tracker = RhythmTracker::new();
        // Ten slow taps then eleven fast ones; only the fast ones remain.
        let mut at = start;
        for _ in 0..10 {
            tracker.record(at);
            at += Duration::from_millis(1500);
        }
        for _ in 0..11 {
            tracker.record(at);
            at += Duration::from_millis(500);
        }
        assert_eq!(tracker.reading().unwrap().bpm, 120);
    }

    #[test]
    fn test_reset_clears_reading() {
        let mut tracker = taps_every(500, 5);
        tracker.reset();
        assert_eq!(tracker.reading(), None);
    }

    #[test]
    fn test_classify_bounds() {
        assert_eq!(RhythmVerdict::classify(99), RhythmVerdict::TooSlow);
        assert_eq!(RhythmVerdict::classify(100), RhythmVerdict::OnPace);
        assert_eq!(RhythmVerdict::classify(120), RhythmVerdict::OnPace);
        assert_eq!(RhythmVerdict::classify(121), RhythmVerdict::TooFast);
        assert_eq!(RhythmVerdict::TooFast.prompt(), "Slow down!");
    }
}
