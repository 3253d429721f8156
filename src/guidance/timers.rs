//! The countdown and metronome of the active step, wired to the engine's
//! input channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::catalog::StepKind;
use super::countdown::{CountdownTimer, TICK};
use super::engine::Input;
use super::metronome::Metronome;
use crate::ports::BeepPort;

/// Time left until the next tick and the next beat, captured when a step is
/// frozen so that resuming picks the cadence up where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerPhase {
    pub(crate) until_tick: Duration,
    pub(crate) until_beat: Duration,
}

impl TimerPhase {
    /// Phase of a step entered just now.
    pub(crate) const fn fresh(beat_interval: Duration) -> Self {
        Self {
            until_tick: TICK,
            until_beat: beat_interval,
        }
    }
}

/// Schedule of one periodic timer: when it was armed, how long until its
/// first delivery, and how many deliveries the engine has accepted since.
#[derive(Debug, Clone, Copy)]
struct Cadence {
    armed_at: Instant,
    first: Duration,
    period: Duration,
    delivered: u32,
}

impl Cadence {
    fn new(first: Duration, period: Duration) -> Self {
        Self {
            armed_at: Instant::now(),
            first: first.min(period),
            period,
            delivered: 0,
        }
    }

    /// Time from `now` until the first delivery the engine has not seen.
    /// Zero when that delivery is already due.
    fn until_next(&self, now: Instant) -> Duration {
        let due = self.armed_at + self.first + self.period * self.delivered;
        due.saturating_duration_since(now)
    }
}

/// Timer tasks for one step. Every message they post is tagged with the
/// epoch they were armed under.
#[derive(Debug)]
pub(crate) struct StepTimers {
    countdown: CountdownTimer,
    metronome: Metronome,
    inputs: mpsc::UnboundedSender<Input>,
    beat_interval: Duration,
    ticks: Option<Cadence>,
    beats: Option<Cadence>,
}

impl StepTimers {
    pub(crate) fn new(
        beeper: Arc<dyn BeepPort>,
        beat_interval: Duration,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Self {
        Self {
            countdown: CountdownTimer::new(),
            metronome: Metronome::new(beeper),
            inputs,
            beat_interval,
            ticks: None,
            beats: None,
        }
    }

    /// Arms the countdown from `remaining_seconds` and, for a compressions
    /// step, starts the metronome. Both run a full period before their first
    /// delivery.
    pub(crate) fn arm(&mut self, epoch: u64, kind: StepKind, remaining_seconds: u32) {
        self.arm_at(
            epoch,
            kind,
            remaining_seconds,
            TimerPhase::fresh(self.beat_interval),
        );
    }

    /// Like [`arm`](Self::arm), with the first tick and beat due after the
    /// delays in `phase`.
    pub(crate) fn arm_at(
        &mut self,
        epoch: u64,
        kind: StepKind,
        remaining_seconds: u32,
        phase: TimerPhase,
    ) {
        let tick_tx = self.inputs.clone();
        let expire_tx = self.inputs.clone();
        self.countdown.arm(
            remaining_seconds,
            phase.until_tick,
            move |remaining| {
                let _ = tick_tx.send(Input::CountdownTick { epoch, remaining });
            },
            move || {
                let _ = expire_tx.send(Input::CountdownExpired { epoch });
            },
        );
        self.ticks = Some(Cadence::new(phase.until_tick, TICK));

        match kind {
            StepKind::Compressions => {
                let beat_tx = self.inputs.clone();
                self.metronome
                    .start(self.beat_interval, phase.until_beat, move || {
                        let _ = beat_tx.send(Input::Beat { epoch });
                    });
                self.beats = Some(Cadence::new(phase.until_beat, self.beat_interval));
            }
            StepKind::Timed => {
                self.metronome.stop();
                self.beats = None;
            }
        }
    }

    /// Records that the engine accepted a countdown tick.
    pub(crate) fn tick_delivered(&mut self) {
        if let Some(ticks) = self.ticks.as_mut() {
            ticks.delivered += 1;
        }
    }

    /// Records that the engine accepted a metronome beat.
    pub(crate) fn beat_delivered(&mut self) {
        if let Some(beats) = self.beats.as_mut() {
            beats.delivered += 1;
        }
    }

    /// Cancels both timers and returns how far each was from its next
    /// delivery. A tick or beat already due but not yet accepted comes back
    /// as zero, so it fires first on resume.
    pub(crate) fn suspend(&mut self, now: Instant) -> TimerPhase {
        let fresh = TimerPhase::fresh(self.beat_interval);
        let phase = TimerPhase {
            until_tick: self
                .ticks
                .map_or(fresh.until_tick, |ticks| ticks.until_next(now)),
            until_beat: self
                .beats
                .map_or(fresh.until_beat, |beats| beats.until_next(now)),
        };
        self.cancel_all();
        phase
    }

    pub(crate) fn cancel_all(&mut self) {
        self.countdown.cancel();
        self.metronome.stop();
        self.ticks = None;
        self.beats = None;
    }

    pub(crate) fn is_idle(&self) -> bool {
        !self.countdown.is_armed() && !self.metronome.is_running()
    }
}
