//! Collaborator contracts
//!
//! The controller never produces sound or drives a clock itself. It talks to:
//! - an [`AudioBackend`]: a transport clock with timed callbacks
//! - an [`Instrument`]: what the callbacks use to make sound
//! - a [`PlaybackListener`]: notified when notes and beats fire, for highlighting
//!
//! Callbacks run on whatever thread the backend's clock uses, so everything they
//! capture is `Send` and the instrument and listener are `Send + Sync`.

use std::sync::Arc;

/// Called with the scheduled time (transport seconds) when the clock reaches it
pub type TimedCallback = Box<dyn FnMut(f64) + Send + 'static>;

/// Identifies one registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(pub u64);

/// Length of a metronome click in seconds
pub const CLICK_LENGTH: f64 = 0.05;

/// Sound output used from inside timed callbacks
pub trait Instrument: Send + Sync {
    /// Sound `pitches` (e.g. `["C4", "E4"]`) for `duration` seconds at transport time `time`
    fn trigger(&self, pitches: &[String], duration: f64, time: f64);

    /// Metronome click, higher on the downbeat
    fn click(&self, downbeat: bool, time: f64) {
        let pitch = if downbeat { "G5" } else { "C5" };
        self.trigger(&[pitch.to_string()], CLICK_LENGTH, time);
    }
}

/// Visual synchronisation hooks. Implementations must return quickly.
pub trait PlaybackListener: Send + Sync {
    /// A sounded note started. `event_index` is its position in the full schedule, rests included.
    fn on_note(&self, _event_id: &str, _event_index: usize) {}

    /// A metronome beat fired. `beat_number` is 0-indexed within the measure.
    fn on_beat(&self, _beat_number: u32, _is_downbeat: bool) {}
}

/// Transport clock with timed callbacks
///
/// Times are seconds on the backend's own transport timeline. `stop` rewinds to 0,
/// `pause` keeps the position. Registered callbacks fire when the running clock
/// crosses their time; with a loop window they fire again on every pass.
pub trait AudioBackend {
    /// Prepare audio output. Hosts that need a user gesture call this from one.
    fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn is_ready(&self) -> bool;

    /// Handle to the sound source that timed callbacks trigger
    fn instrument(&self) -> Arc<dyn Instrument>;

    fn register_timed_callback(&mut self, time: f64, callback: TimedCallback) -> CallbackHandle;

    /// Drop every registered callback that has not been cancelled
    fn cancel_all(&mut self);

    fn start(&mut self);

    fn pause(&mut self);

    /// Halt and rewind the clock to 0
    fn stop(&mut self);

    /// Move the clock to `seconds` without changing whether it runs
    fn seek(&mut self, seconds: f64);

    /// Current clock position in seconds
    fn position(&self) -> f64;

    fn set_tempo(&mut self, bpm: u32);

    /// Loop window `[0, loop_end)` when enabled
    fn set_loop(&mut self, enabled: bool, loop_end: f64);
}
