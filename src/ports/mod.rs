//! Side-effect ports
//!
//! The engine never talks to audio or speech hardware directly. It calls a
//! [`NarrationPort`] for spoken guidance and a [`BeepPort`] for metronome
//! clicks; both are injected, both have an explicit `init`/`dispose`
//! lifecycle, and neither may fail in a way that affects timing.

pub mod console;

pub use console::{ConsoleNarrator, TerminalBell};

use crate::error::PortError;

/// Callback fired once when an utterance finishes.
pub type NarrationCallback = Box<dyn FnOnce() + Send + 'static>;

/// Text-to-speech service.
///
/// `speak` replaces any utterance in progress. The completion callback is
/// invoked at most once and never after `stop`.
pub trait NarrationPort: Send + Sync {
    /// Prepares the speech backend.
    ///
    /// # Errors
    ///
    /// Returns [`PortError`] when speech is unavailable; the engine keeps
    /// running without it.
    fn init(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// Starts speaking `text`.
    fn speak(&self, text: &str, on_complete: Option<NarrationCallback>);

    /// Suspends the current utterance.
    fn pause(&self);

    /// Continues a suspended utterance.
    fn resume(&self);

    /// Abandons the current utterance without completing it.
    fn stop(&self);

    /// Releases the speech backend.
    fn dispose(&self) {}
}

/// Metronome sound output.
pub trait BeepPort: Send + Sync {
    /// Prepares the audio device.
    ///
    /// # Errors
    ///
    /// Returns [`PortError`] when no device is available.
    fn init(&self) -> Result<(), PortError> {
        Ok(())
    }

    /// Emits one click.
    ///
    /// # Errors
    ///
    /// Returns [`PortError`] when the sound could not be produced. Callers
    /// swallow the error.
    fn beep(&self) -> Result<(), PortError>;

    /// Releases the audio device.
    fn dispose(&self) {}
}

/// Narration port that says nothing and never completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNarrator;

impl NarrationPort for SilentNarrator {
    fn speak(&self, _text: &str, _on_complete: Option<NarrationCallback>) {}
    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {}
}

/// Beep port that produces no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBeeper;

impl BeepPort for SilentBeeper {
    fn beep(&self) -> Result<(), PortError> {
        Ok(())
    }
}
