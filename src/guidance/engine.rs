//! Guidance engine orchestration
//!
//! The `GuidanceEngine` owns the session and runs as a single cooperative
//! event loop. Commands from the front-end and messages from timer tasks,
//! narration callbacks and the transition delay all arrive on one channel
//! and are applied in order; nothing else touches the session.
//!
//! Timer messages carry the epoch they were armed under and narration or
//! transition messages carry the step generation. Anything tagged with an
//! older value is dropped, so a callback that fires after a pause, a stop
//! or a transition can never move the engine.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::catalog::{StepCatalog, StepKind};
use super::guard::AdvanceGuard;
use super::pause::{FrozenStep, PauseController};
use super::rhythm::RhythmTracker;
use super::sequencer::StepSequencer;
use super::session::{EnginePhase, GuidanceSnapshot, Session};
use super::settings::{CompressionSource, GuidanceSettings};
use super::timers::StepTimers;
use crate::error::{CatalogError, EngineError};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;
use crate::ports::{BeepPort, NarrationPort, SilentBeeper, SilentNarrator};

/// User commands accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin at the first step.
    Start,
    /// Cancel everything and return to idle.
    Stop,
    /// Freeze the active step.
    Pause,
    /// Thaw a frozen step.
    Resume,
    /// Advance to the next step now.
    Skip,
    /// Register one manual compression.
    Tap,
}

/// What triggered a step transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceReason {
    /// The countdown of a timed step reached zero.
    CountdownExpired,
    /// The compression count reached the target.
    CompressionTarget,
    /// Narration of a timed step finished.
    NarrationFinished,
    /// The user skipped the step.
    Skip,
}

impl AdvanceReason {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CountdownExpired => "countdown_expired",
            Self::CompressionTarget => "compression_target",
            Self::NarrationFinished => "narration_finished",
            Self::Skip => "skip",
        }
    }
}

/// Messages processed by the engine loop.
#[derive(Debug)]
pub(crate) enum Input {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<GuidanceSnapshot>>,
    },
    CountdownTick {
        epoch: u64,
        remaining: u32,
    },
    CountdownExpired {
        epoch: u64,
    },
    Beat {
        epoch: u64,
    },
    NarrationFinished {
        generation: u64,
    },
    TransitionElapsed {
        generation: u64,
    },
}

/// Side-effect adapters injected into the engine.
#[derive(Clone)]
pub struct EnginePorts {
    /// Spoken guidance
    pub narration: Arc<dyn NarrationPort>,
    /// Metronome sound
    pub beeper: Arc<dyn BeepPort>,
    /// Structured session events
    pub events: Arc<EventEmitter>,
}

impl EnginePorts {
    /// Ports with no audible output and no event stream.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(Arc::new(SilentNarrator), Arc::new(SilentBeeper))
    }

    /// Ports using the given narrator and beeper, discarding events.
    #[must_use]
    pub fn new(narration: Arc<dyn NarrationPort>, beeper: Arc<dyn BeepPort>) -> Self {
        Self {
            narration,
            beeper,
            events: Arc::new(EventEmitter::noop()),
        }
    }

    /// Replaces the event emitter.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }
}

impl std::fmt::Debug for EnginePorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePorts")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

struct PendingTransition {
    to: usize,
    handle: JoinHandle<()>,
}

/// The guidance state machine.
///
/// Constructed by [`spawn`] and driven through an [`EngineHandle`].
pub(crate) struct GuidanceEngine {
    catalog: StepCatalog,
    settings: GuidanceSettings,
    sequencer: StepSequencer,
    session: Session,
    guard: Arc<AdvanceGuard>,
    pause: PauseController,
    timers: StepTimers,
    narration: Arc<dyn NarrationPort>,
    beeper: Arc<dyn BeepPort>,
    events: Arc<EventEmitter>,
    rhythm: RhythmTracker,
    inputs: mpsc::UnboundedSender<Input>,
    /// Tags narration and transition messages
    generation: u64,
    /// Tags countdown and metronome messages
    timer_epoch: u64,
    pending: Option<PendingTransition>,
    session_id: Uuid,
    state: watch::Sender<GuidanceSnapshot>,
}

impl GuidanceEngine {
    /// Creates an idle engine posting timer messages to `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the tempo or the compression target is
    /// zero, or when the configured compressions step index does not name a
    /// compressions step of `catalog`.
    pub(crate) fn new(
        catalog: StepCatalog,
        settings: GuidanceSettings,
        ports: EnginePorts,
        inputs: mpsc::UnboundedSender<Input>,
    ) -> Result<(Self, watch::Receiver<GuidanceSnapshot>), CatalogError> {
        if settings.tempo_bpm == 0 {
            return Err(CatalogError::ZeroTempo);
        }
        if settings.target_compressions == 0 {
            return Err(CatalogError::ZeroTarget);
        }
        catalog.check_anchor(settings.compressions_step_index)?;

        let sequencer = StepSequencer::new(catalog.len(), settings.compressions_step_index);
        let timers = StepTimers::new(
            Arc::clone(&ports.beeper),
            settings.beat_interval(),
            inputs.clone(),
        );
        let (state, rx) = watch::channel(GuidanceSnapshot::idle(settings.target_compressions));

        let engine = Self {
            catalog,
            settings,
            sequencer,
            session: Session::default(),
            guard: Arc::new(AdvanceGuard::new()),
            pause: PauseController::default(),
            timers,
            narration: ports.narration,
            beeper: ports.beeper,
            events: ports.events,
            rhythm: RhythmTracker::new(),
            inputs,
            generation: 0,
            timer_epoch: 0,
            pending: None,
            session_id: Uuid::new_v4(),
            state,
        };
        Ok((engine, rx))
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>, cancel: CancellationToken) {
        self.init_ports();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("guidance engine cancelled");
                    break;
                }
                input = rx.recv() => {
                    let Some(input) = input else { break };
                    self.handle(input);
                }
            }
        }
        self.stop();
        self.publish();
        self.narration.dispose();
        self.beeper.dispose();
    }

    fn init_ports(&self) {
        if let Err(err) = self.narration.init() {
            warn!(error = %err, "narration unavailable; continuing without speech");
            metrics::record_port_failure("narration");
        }
        if let Err(err) = self.beeper.init() {
            warn!(error = %err, "beeper unavailable; continuing without sound");
            metrics::record_port_failure("beep");
        }
    }

    /// Applies one input and publishes the resulting snapshot.
    pub(crate) fn handle(&mut self, input: Input) {
        match input {
            Input::Command { command, reply } => {
                self.apply(command);
                self.publish();
                if let Some(reply) = reply {
                    let _ = reply.send(self.snapshot());
                }
                return;
            }
            Input::CountdownTick { epoch, remaining } => {
                if self.is_current_epoch(epoch) {
                    self.on_countdown_tick(remaining);
                }
            }
            Input::CountdownExpired { epoch } => {
                if self.is_current_epoch(epoch) {
                    self.on_countdown_expired();
                }
            }
            Input::Beat { epoch } => {
                if self.is_current_epoch(epoch) {
                    self.on_beat();
                }
            }
            Input::NarrationFinished { generation } => {
                if self.is_current_generation(generation) {
                    self.on_narration_finished();
                }
            }
            Input::TransitionElapsed { generation } => {
                if self.is_current_generation(generation) {
                    self.on_transition_elapsed();
                }
            }
        }
        self.publish();
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Skip => self.skip(),
            Command::Tap => self.tap(),
        }
    }

    fn is_current_epoch(&self, epoch: u64) -> bool {
        let current = epoch == self.timer_epoch;
        if !current {
            debug!(epoch, current = self.timer_epoch, "dropping stale timer message");
        }
        current
    }

    fn is_current_generation(&self, generation: u64) -> bool {
        let current = generation == self.generation;
        if !current {
            debug!(
                generation,
                current = self.generation,
                "dropping stale step message"
            );
        }
        current
    }

    pub(crate) fn snapshot(&self) -> GuidanceSnapshot {
        let rhythm = if self.current_kind() == Some(StepKind::Compressions) {
            self.rhythm.reading()
        } else {
            None
        };
        GuidanceSnapshot::capture(
            &self.session,
            &self.catalog,
            &self.sequencer,
            self.settings.target_compressions,
            rhythm,
        )
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn current_kind(&self) -> Option<StepKind> {
        self.session
            .step_index
            .and_then(|i| self.catalog.get(i))
            .map(|step| step.kind)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn start(&mut self) {
        if self.session.is_running {
            debug!("start ignored; session already running");
            return;
        }
        self.session = Session {
            is_running: true,
            ..Session::default()
        };
        self.session_id = Uuid::new_v4();
        info!(session_id = %self.session_id, steps = self.catalog.len(), "guidance started");
        self.events.emit(Event::SessionStarted {
            timestamp: Utc::now(),
            session_id: self.session_id,
            steps: self.catalog.len(),
            tempo_bpm: self.settings.tempo_bpm,
            target_compressions: self.settings.target_compressions,
        });
        self.enter_step(0);
    }

    fn stop(&mut self) {
        let was_running = self.session.is_running;

        self.timers.cancel_all();
        debug_assert!(self.timers.is_idle());
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
        self.narration.stop();
        self.guard.release();
        self.pause.clear();
        self.rhythm.reset();
        self.generation += 1;
        self.timer_epoch += 1;

        if was_running {
            info!(cycles = self.session.cycle_count, "guidance stopped");
            self.events.emit(Event::SessionStopped {
                timestamp: Utc::now(),
                session_id: self.session_id,
                cycles: self.session.cycle_count,
            });
        }
        self.session = Session::default();
        metrics::set_current_step(None);
    }

    fn pause(&mut self) {
        if !self.session.is_step_active() {
            debug!(phase = ?self.session.phase(), "pause ignored");
            return;
        }
        let (Some(step_index), Some(kind)) = (self.session.step_index, self.current_kind()) else {
            return;
        };
        let frozen = FrozenStep {
            step_index,
            kind,
            time_remaining_seconds: self.session.time_remaining_seconds,
            compression_count: self.session.compression_count,
        };
        if !self
            .pause
            .pause(frozen, &mut self.timers, self.narration.as_ref())
        {
            return;
        }
        self.timer_epoch += 1;
        self.session.is_paused = true;

        info!(step_index, remaining = frozen.time_remaining_seconds, "guidance paused");
        self.events.emit(Event::SessionPaused {
            timestamp: Utc::now(),
            session_id: self.session_id,
            step_index,
            time_remaining_seconds: frozen.time_remaining_seconds,
            compression_count: frozen.compression_count,
        });
    }

    fn resume(&mut self) {
        if self.session.phase() != EnginePhase::Paused || !self.pause.is_paused() {
            debug!(phase = ?self.session.phase(), "resume ignored");
            return;
        }
        self.timer_epoch += 1;
        let Some(frozen) =
            self.pause
                .resume(self.timer_epoch, &mut self.timers, self.narration.as_ref())
        else {
            return;
        };
        self.session.is_paused = false;
        self.session.time_remaining_seconds = frozen.time_remaining_seconds;
        self.session.compression_count = frozen.compression_count;

        info!(step_index = frozen.step_index, "guidance resumed");
        self.events.emit(Event::SessionResumed {
            timestamp: Utc::now(),
            session_id: self.session_id,
            step_index: frozen.step_index,
            time_remaining_seconds: frozen.time_remaining_seconds,
            compression_count: frozen.compression_count,
        });
    }

    fn skip(&mut self) {
        if !self.session.is_step_active() {
            debug!(phase = ?self.session.phase(), "skip ignored");
            return;
        }
        self.advance(AdvanceReason::Skip);
    }

    fn tap(&mut self) {
        if !self.session.is_step_active() || self.current_kind() != Some(StepKind::Compressions) {
            debug!("tap ignored outside an active compressions step");
            return;
        }
        if let Some(reading) = self.rhythm.record(Instant::now()) {
            debug!(bpm = reading.bpm, verdict = ?reading.verdict, "rhythm");
        }
        if self.settings.compression_source == CompressionSource::Manual {
            self.count_compression();
        }
    }

    // ------------------------------------------------------------------
    // Timer and callback messages
    // ------------------------------------------------------------------

    fn on_countdown_tick(&mut self, remaining: u32) {
        self.timers.tick_delivered();
        self.session.time_remaining_seconds = self.session.time_remaining_seconds.min(remaining);
    }

    fn on_countdown_expired(&mut self) {
        self.session.time_remaining_seconds = 0;
        if self.current_kind() == Some(StepKind::Timed) {
            self.advance(AdvanceReason::CountdownExpired);
        }
    }

    fn on_beat(&mut self) {
        self.timers.beat_delivered();
        if self.settings.compression_source == CompressionSource::Metronome {
            self.count_compression();
        }
    }

    fn count_compression(&mut self) {
        let target = self.settings.target_compressions;
        if self.session.compression_count < target {
            self.session.compression_count += 1;
            metrics::record_compression();
        }
        if self.session.compression_count >= target {
            self.advance(AdvanceReason::CompressionTarget);
        }
    }

    fn on_narration_finished(&mut self) {
        if !self.settings.advance_on_narration {
            return;
        }
        if self.session.is_step_active() && self.current_kind() == Some(StepKind::Timed) {
            self.advance(AdvanceReason::NarrationFinished);
        }
    }

    fn on_transition_elapsed(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.session.transitioning = false;
        self.guard.release();
        self.enter_step(pending.to);
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Starts a transition unless one is already in flight.
    fn advance(&mut self, reason: AdvanceReason) -> bool {
        let guard = Arc::clone(&self.guard);
        let advanced = guard.try_advance(|| self.begin_transition(reason));
        if !advanced {
            debug!(reason = reason.as_str(), "advance already in flight");
        }
        advanced
    }

    fn begin_transition(&mut self, reason: AdvanceReason) {
        let Some(from) = self.session.step_index else {
            return;
        };
        self.narration.stop();
        self.timers.cancel_all();
        self.generation += 1;
        self.timer_epoch += 1;

        let next = self.sequencer.next(from);
        if next.wrapped {
            self.session.cycle_count += 1;
            metrics::record_cycle();
        }
        self.session.transitioning = true;

        info!(
            from,
            to = next.index,
            reason = reason.as_str(),
            cycle = self.session.cycle_count,
            "step transition"
        );
        metrics::record_transition(reason);
        self.events.emit(Event::StepAdvanced {
            timestamp: Utc::now(),
            session_id: self.session_id,
            from,
            to: next.index,
            reason,
            cycle_wrapped: next.wrapped,
        });

        self.schedule_entry(next.index);
    }

    fn schedule_entry(&mut self, to: usize) {
        let generation = self.generation;
        let delay = self.settings.transition_delay;
        let inputs = self.inputs.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inputs.send(Input::TransitionElapsed { generation });
        });
        self.pending = Some(PendingTransition { to, handle });
    }

    pub(crate) fn enter_step(&mut self, index: usize) {
        let catalog = self.catalog.clone();
        let Some(step) = catalog.get(index) else {
            error!(index, len = catalog.len(), "step index out of range; returning to idle");
            self.stop();
            return;
        };

        self.generation += 1;
        self.timer_epoch += 1;
        self.session.step_index = Some(index);
        self.session.time_remaining_seconds = step.duration_seconds;
        if step.kind == StepKind::Compressions {
            self.session.compression_count = 0;
            self.rhythm.reset();
        }

        self.timers
            .arm(self.timer_epoch, step.kind, step.duration_seconds);
        self.speak(&step.narration_text);

        info!(index, id = step.id, kind = %step.kind, "step entered");
        metrics::record_step_entered(step.kind);
        metrics::set_current_step(Some(index));
        self.events.emit(Event::StepEntered {
            timestamp: Utc::now(),
            session_id: self.session_id,
            step_index: index,
            step_id: step.id,
            kind: step.kind,
            cycle: self.session.cycle_count,
        });
    }

    fn speak(&self, text: &str) {
        let generation = self.generation;
        let inputs = self.inputs.clone();
        self.narration.speak(
            text,
            Some(Box::new(move || {
                let _ = inputs.send(Input::NarrationFinished { generation });
            })),
        );
    }
}

/// Starts an engine task for `catalog` and returns a handle to drive it.
///
/// The task runs until [`EngineHandle::shutdown`] is called or every handle
/// has been dropped.
///
/// # Errors
///
/// Returns [`CatalogError`] when `settings` has a zero tempo or target, or
/// its compressions step index does not name a compressions step.
pub fn spawn(
    catalog: StepCatalog,
    settings: GuidanceSettings,
    ports: EnginePorts,
) -> Result<(EngineHandle, JoinHandle<()>), CatalogError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let (engine, state) = GuidanceEngine::new(catalog, settings, ports, tx.clone())?;
    let cancel = CancellationToken::new();
    let task = tokio::spawn(engine.run(rx, cancel.clone()));
    Ok((EngineHandle::new(tx, state, cancel), task))
}

/// Cloneable front-end to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    inputs: mpsc::UnboundedSender<Input>,
    state: watch::Receiver<GuidanceSnapshot>,
    cancel: CancellationToken,
    _owner: Arc<DropGuard>,
}

impl EngineHandle {
    fn new(
        inputs: mpsc::UnboundedSender<Input>,
        state: watch::Receiver<GuidanceSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inputs,
            state,
            _owner: Arc::new(cancel.clone().drop_guard()),
            cancel,
        }
    }

    /// Sends `command` and waits for the snapshot taken right after it was
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Shutdown`] when the engine loop has exited and
    /// [`EngineError::ReplyDropped`] when it exited before replying.
    pub async fn send(&self, command: Command) -> Result<GuidanceSnapshot, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.inputs
            .send(Input::Command {
                command,
                reply: Some(reply),
            })
            .map_err(|_| EngineError::Shutdown)?;
        rx.await.map_err(|_| EngineError::ReplyDropped)
    }

    /// Begins guidance at the first step.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn start(&self) -> Result<GuidanceSnapshot, EngineError> {
        self.send(Command::Start).await
    }

    /// Stops guidance and resets the session.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn stop(&self) -> Result<GuidanceSnapshot, EngineError> {
        self.send(Command::Stop).await
    }

    /// Freezes the active step.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn pause(&self) -> Result<GuidanceSnapshot, EngineError> {
        self.send(Command::Pause).await
    }

    /// Thaws a frozen step.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn resume(&self) -> Result<GuidanceSnapshot, EngineError> {
        self.send(Command::Resume).await
    }

    /// Advances to the next step.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn skip(&self) -> Result<GuidanceSnapshot, EngineError> {
        self.send(Command::Skip).await
    }

    /// Registers one manual compression.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn tap(&self) -> Result<GuidanceSnapshot, EngineError> {
        self.send(Command::Tap).await
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> GuidanceSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified on every snapshot change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GuidanceSnapshot> {
        self.state.clone()
    }

    /// Stops the engine loop. Pending commands fail with
    /// [`EngineError::Shutdown`] or [`EngineError::ReplyDropped`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("shut_down", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
