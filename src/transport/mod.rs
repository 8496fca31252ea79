//! # Transport Module
//!
//! Plays a scheduled exercise through an external audio backend.
//!
//! ## Sub-modules
//! - `backend` - AudioBackend, Instrument and PlaybackListener contracts
//! - `controller` - Stopped/Playing/Paused state machine and event registration
//! - `progress` - Lock-free playback position for the UI
//! - `simulated` - Deterministic backend with a manually advanced clock
//!
//! ## Timeline
//!
//! The backend clock starts at 0 with the count-in, if any. Note events are registered
//! at `lead_in + start_time`, metronome beats at their own times. Everything is handed
//! to the backend as `(time, callback)` pairs; the controller never polls.

mod backend;
mod controller;
mod progress;
mod simulated;

#[cfg(test)]
mod tests;

pub use backend::{
    AudioBackend, CallbackHandle, Instrument, PlaybackListener, TimedCallback, CLICK_LENGTH,
};
pub use controller::{PlaybackController, TransportState, NOTE_LENGTH_RATIO};
pub use progress::SharedProgress;
pub use simulated::{RecordingInstrument, SimulatedBackend, Sound};
