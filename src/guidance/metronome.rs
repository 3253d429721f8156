//! Fixed-interval compression metronome.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::observability::metrics;
use crate::ports::BeepPort;

/// Beat interval for a tempo in beats per minute (120 BPM is 500 ms).
///
/// A tempo of zero is treated as one beat per minute.
#[must_use]
pub fn beat_interval(bpm: u32) -> Duration {
    Duration::from_millis(60_000 / u64::from(bpm.max(1)))
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Beat generator driving the beep port and the compression counter.
///
/// Every beat first asks the [`BeepPort`] for a sound, then calls `on_beat`.
/// A failed beep is logged and counted but never delays or drops the beat.
pub struct Metronome {
    beeper: Arc<dyn BeepPort>,
    running: Option<Running>,
}

impl Metronome {
    /// Creates a stopped metronome that sounds through `beeper`.
    #[must_use]
    pub fn new(beeper: Arc<dyn BeepPort>) -> Self {
        Self {
            beeper,
            running: None,
        }
    }

    /// Starts beating every `interval`, the first beat `first_beat` from now
    /// (capped at one interval).
    ///
    /// A metronome already running is stopped first.
    pub fn start<F>(&mut self, interval: Duration, first_beat: Duration, on_beat: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let beeper = Arc::clone(&self.beeper);
        let period = interval.max(Duration::from_millis(1));
        let first = Instant::now() + first_beat.min(period);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = beeper.beep() {
                            debug!(error = %err, "beep failed; continuing silently");
                            metrics::record_port_failure("beep");
                        }
                        on_beat();
                    }
                }
            }
        });

        self.running = Some(Running { cancel, handle });
    }

    /// Stops beating. Idempotent.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.handle.abort();
        }
    }

    /// Whether the beat task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Metronome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metronome")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
