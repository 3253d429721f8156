//! Shared integration-test harness: recording ports, an engine spawner on
//! paused time, and helpers for running the `cpr-guide` binary.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpr_guide::error::PortError;
use cpr_guide::guidance::{
    EngineHandle, EnginePorts, GuidanceSettings, StepCatalog, spawn,
};
use cpr_guide::observability::EventEmitter;
use cpr_guide::ports::{BeepPort, NarrationCallback, NarrationPort};
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ============================================================================
// Recording ports
// ============================================================================

/// Narration port that records every call and completes only on request.
#[derive(Default)]
pub struct RecordingNarrator {
    spoken: Mutex<Vec<String>>,
    pending: Mutex<Option<NarrationCallback>>,
    pub pauses: AtomicU32,
    pub resumes: AtomicU32,
    pub stops: AtomicU32,
    pub fail_init: AtomicBool,
}

impl RecordingNarrator {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Fires the completion callback of the current utterance, if any.
    pub fn finish(&self) -> bool {
        let callback = self.pending.lock().unwrap().take();
        callback.map(|done| done()).is_some()
    }

    /// Takes the current callback without firing it.
    pub fn take_callback(&self) -> Option<NarrationCallback> {
        self.pending.lock().unwrap().take()
    }
}

impl NarrationPort for RecordingNarrator {
    fn init(&self) -> Result<(), PortError> {
        if self.fail_init.load(Ordering::SeqCst) {
            Err(PortError::Unavailable("no speech engine".to_string()))
        } else {
            Ok(())
        }
    }

    fn speak(&self, text: &str, on_complete: Option<NarrationCallback>) {
        self.spoken.lock().unwrap().push(text.to_string());
        *self.pending.lock().unwrap() = on_complete;
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().take();
    }
}

/// Beep port that counts beeps and can be told to fail.
#[derive(Default)]
pub struct CountingBeeper {
    pub beeps: AtomicU32,
    pub failing: AtomicBool,
}

impl CountingBeeper {
    pub fn count(&self) -> u32 {
        self.beeps.load(Ordering::SeqCst)
    }
}

impl BeepPort for CountingBeeper {
    fn beep(&self) -> Result<(), PortError> {
        self.beeps.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(PortError::Unavailable("no audio device".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-memory writer for capturing event output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<serde_json::Value> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Engine harness
// ============================================================================

/// A spawned engine with its recording ports.
pub struct Harness {
    pub engine: EngineHandle,
    pub task: JoinHandle<()>,
    pub narrator: Arc<RecordingNarrator>,
    pub beeper: Arc<CountingBeeper>,
    pub events: SharedBuffer,
    pub origin: Instant,
}

impl Harness {
    /// Builtin catalog, default settings.
    pub fn builtin() -> Self {
        Self::new(StepCatalog::builtin(), GuidanceSettings::default())
    }

    pub fn with_settings(settings: GuidanceSettings) -> Self {
        Self::new(StepCatalog::builtin(), settings)
    }

    pub fn new(catalog: StepCatalog, settings: GuidanceSettings) -> Self {
        Self::with_ports(
            catalog,
            settings,
            Arc::new(RecordingNarrator::default()),
            Arc::new(CountingBeeper::default()),
        )
    }

    pub fn with_ports(
        catalog: StepCatalog,
        settings: GuidanceSettings,
        narrator: Arc<RecordingNarrator>,
        beeper: Arc<CountingBeeper>,
    ) -> Self {
        let events = SharedBuffer::default();
        let ports = EnginePorts::new(narrator.clone(), beeper.clone())
            .with_events(Arc::new(EventEmitter::new(Box::new(events.clone()))));
        let (engine, task) = spawn(catalog, settings, ports).unwrap();
        Self {
            engine,
            task,
            narrator,
            beeper,
            events,
            origin: Instant::now(),
        }
    }

    /// Sleeps until `secs` after the harness was created.
    pub async fn at(&self, secs: f64) {
        tokio::time::sleep_until(self.origin + Duration::from_secs_f64(secs)).await;
    }

    /// Event types in emission order.
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lines()
            .iter()
            .map(|e| e["type"].as_str().unwrap().to_string())
            .collect()
    }
}

// ============================================================================
// Binary helpers
// ============================================================================

/// Path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Path to the compiled binary.
pub fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_cpr-guide")
}

/// Runs the binary with `args` and no stdin.
pub fn spawn_command(args: &[&str]) -> Output {
    std::process::Command::new(bin())
        .args(args)
        .env_remove("CPR_GUIDE_CONFIG")
        .env_remove("CPR_GUIDE_TEMPO")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run cpr-guide")
}

/// Runs the binary with `args`, feeding `input` on stdin.
pub fn spawn_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = std::process::Command::new(bin())
        .args(args)
        .env_remove("CPR_GUIDE_CONFIG")
        .env_remove("CPR_GUIDE_TEMPO")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn cpr-guide");
    child
        .stdin
        .take()
        .expect("stdin not captured")
        .write_all(input.as_bytes())
        .expect("failed to write stdin");
    child.wait_with_output().expect("failed to wait for cpr-guide")
}

/// Writes `content` to a temporary YAML file.
pub fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("non-UTF-8 path")
}
