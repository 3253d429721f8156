//! Structured event stream for guidance sessions.
//!
//! Discrete, typed events emitted as the engine moves through a session.
//! Events are serialized as newline-delimited JSON (JSONL) and include a
//! monotonically increasing sequence number for ordering guarantees.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::guidance::{AdvanceReason, StepKind};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a guidance session.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A session has started at the first step.
    SessionStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
        /// Identifier shared by every event of the session.
        session_id: Uuid,
        /// Number of steps in the catalog.
        steps: usize,
        /// Configured compression tempo.
        tempo_bpm: u32,
        /// Compressions needed per compressions step.
        target_compressions: u32,
    },

    /// A step became active.
    StepEntered {
        /// When the step was entered.
        timestamp: DateTime<Utc>,
        /// Session identifier.
        session_id: Uuid,
        /// Zero-based index of the step.
        step_index: usize,
        /// Declared id of the step.
        step_id: u32,
        /// Kind of the step.
        kind: StepKind,
        /// Cycle the step belongs to.
        cycle: u32,
    },

    /// The engine left one step for the next.
    StepAdvanced {
        /// When the transition began.
        timestamp: DateTime<Utc>,
        /// Session identifier.
        session_id: Uuid,
        /// Index of the step that was left.
        from: usize,
        /// Index of the step that will be entered.
        to: usize,
        /// What triggered the advance.
        reason: AdvanceReason,
        /// Whether the sequence wrapped back to the compressions step.
        cycle_wrapped: bool,
    },

    /// The active step was frozen.
    SessionPaused {
        /// When the pause was applied.
        timestamp: DateTime<Utc>,
        /// Session identifier.
        session_id: Uuid,
        /// Index of the frozen step.
        step_index: usize,
        /// Seconds left when frozen.
        time_remaining_seconds: u32,
        /// Compressions counted when frozen.
        compression_count: u32,
    },

    /// A frozen step was thawed.
    SessionResumed {
        /// When the resume was applied.
        timestamp: DateTime<Utc>,
        /// Session identifier.
        session_id: Uuid,
        /// Index of the thawed step.
        step_index: usize,
        /// Seconds left on resume.
        time_remaining_seconds: u32,
        /// Compressions counted on resume.
        compression_count: u32,
    },

    /// The session was stopped and reset.
    SessionStopped {
        /// When the session stopped.
        timestamp: DateTime<Utc>,
        /// Session identifier.
        session_id: Uuid,
        /// Cycle the session had reached.
        cycles: u32,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are silently dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::noop()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
