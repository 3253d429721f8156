//! Terminal adapters for the narration and beep ports.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{BeepPort, NarrationCallback, NarrationPort};
use crate::error::PortError;

/// Speaking pace at rate 1.0.
const WORDS_PER_MINUTE: f64 = 150.0;

/// Default speech rate, slightly slower than normal for clarity.
pub const DEFAULT_SPEECH_RATE: f64 = 0.95;

/// Estimated time to say `text` at `rate`.
#[must_use]
pub fn speaking_time(text: &str, rate: f64) -> Duration {
    let words = text.split_whitespace().count();
    if words == 0 {
        return Duration::ZERO;
    }
    #[allow(clippy::cast_precision_loss)]
    let secs = words as f64 * 60.0 / (WORDS_PER_MINUTE * rate.max(0.1));
    Duration::from_secs_f64(secs)
}

type CompletionSlot = Arc<Mutex<Option<NarrationCallback>>>;

struct Utterance {
    remaining: Duration,
    resumed_at: Option<Instant>,
    on_complete: CompletionSlot,
    timer: Option<JoinHandle<()>>,
}

impl Utterance {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Prints narration to a writer and completes after the estimated speaking
/// time, honoring pause and resume.
pub struct ConsoleNarrator {
    writer: Mutex<Box<dyn Write + Send>>,
    current: Mutex<Option<Utterance>>,
    rate: f64,
}

impl ConsoleNarrator {
    /// Creates a narrator writing to `writer` at the given speech rate.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, rate: f64) -> Self {
        Self {
            writer: Mutex::new(writer),
            current: Mutex::new(None),
            rate,
        }
    }

    /// Creates a narrator printing to stdout at the default rate.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()), DEFAULT_SPEECH_RATE)
    }

    fn print(&self, text: &str) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = writeln!(w, "  \u{1f50a} {text}");
            let _ = w.flush();
        }
    }

    fn spawn_completion(remaining: Duration, slot: &CompletionSlot) -> Option<JoinHandle<()>> {
        let slot = Arc::clone(slot);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // No runtime to time the utterance on; finish immediately.
            if let Some(done) = slot.lock().ok().and_then(|mut s| s.take()) {
                done();
            }
            return None;
        };
        Some(runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            if let Some(done) = slot.lock().ok().and_then(|mut s| s.take()) {
                done();
            }
        }))
    }
}

impl NarrationPort for ConsoleNarrator {
    fn speak(&self, text: &str, on_complete: Option<NarrationCallback>) {
        self.stop();
        self.print(text);

        let remaining = speaking_time(text, self.rate);
        let slot: CompletionSlot = Arc::new(Mutex::new(on_complete));
        let timer = Self::spawn_completion(remaining, &slot);

        if let Ok(mut current) = self.current.lock() {
            *current = Some(Utterance {
                remaining,
                resumed_at: Some(Instant::now()),
                on_complete: slot,
                timer,
            });
        }
    }

    fn pause(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(utterance) = current.as_mut() {
                if let Some(resumed_at) = utterance.resumed_at.take() {
                    utterance.cancel_timer();
                    utterance.remaining = utterance
                        .remaining
                        .saturating_sub(resumed_at.elapsed());
                    debug!(remaining_ms = utterance.remaining.as_millis(), "narration paused");
                }
            }
        }
    }

    fn resume(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(utterance) = current.as_mut() {
                if utterance.resumed_at.is_none() {
                    utterance.resumed_at = Some(Instant::now());
                    utterance.timer =
                        Self::spawn_completion(utterance.remaining, &utterance.on_complete);
                }
            }
        }
    }

    fn stop(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(mut utterance) = current.take() {
                utterance.cancel_timer();
                if let Ok(mut slot) = utterance.on_complete.lock() {
                    slot.take();
                }
            }
        }
    }

    fn dispose(&self) {
        self.stop();
    }
}

impl std::fmt::Debug for ConsoleNarrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleNarrator")
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

/// Rings the terminal bell on stderr.
///
/// When stderr is not a terminal the bell reports itself unavailable and
/// every beep fails quietly.
#[derive(Debug, Default)]
pub struct TerminalBell {
    available: AtomicBool,
}

impl TerminalBell {
    /// Creates a bell; call [`BeepPort::init`] before use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            available: AtomicBool::new(false),
        }
    }
}

impl BeepPort for TerminalBell {
    fn init(&self) -> Result<(), PortError> {
        let tty = std::io::stderr().is_terminal();
        self.available.store(tty, Ordering::SeqCst);
        if tty {
            Ok(())
        } else {
            Err(PortError::Unavailable("stderr is not a terminal".to_string()))
        }
    }

    fn beep(&self) -> Result<(), PortError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("terminal bell".to_string()));
        }
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }

    fn dispose(&self) {
        self.available.store(false, Ordering::SeqCst);
    }
}
