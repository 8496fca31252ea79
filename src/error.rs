//! # Error Types
//!
//! This module defines the error type returned by configuration loading and
//! transport commands.
//!
//! Scheduling itself never fails: unknown duration codes fall back to a quarter
//! note and unparseable pitch keys are skipped, both with a logged warning.
//! Only commands that would otherwise leave the transport in a state the caller
//! does not expect (playing with nothing loaded, playing on a backend that
//! cannot make sound, a zero tempo) are reported here.
//!
//! ## Usage
//! ```rust
//! use etude::{PlaybackController, PlaybackError, SimulatedBackend};
//!
//! let mut controller = PlaybackController::new(SimulatedBackend::new());
//! match controller.play() {
//!     Err(PlaybackError::NoExercise) => eprintln!("load an exercise first"),
//!     Err(e) => eprintln!("playback error: {}", e),
//!     Ok(()) => {}
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The audio backend has not been initialised (or failed to initialise).
    ///
    /// Returned by `play()` instead of registering callbacks that would never fire.
    ///
    /// # Example
    /// ```
    /// # use etude::PlaybackError;
    /// let err = PlaybackError::BackendNotReady;
    /// assert_eq!(err.to_string(), "Audio backend is not ready");
    /// ```
    #[error("Audio backend is not ready")]
    BackendNotReady,

    /// The audio backend reported a failure while initialising.
    #[error("Audio backend failed to initialise: {0}")]
    BackendInit(String),

    /// A transport command that needs a schedule was issued before any exercise was loaded.
    #[error("No exercise loaded")]
    NoExercise,

    /// Tempo must be a positive number of beats per minute.
    ///
    /// # Example
    /// ```
    /// # use etude::PlaybackError;
    /// let err = PlaybackError::InvalidTempo(0);
    /// assert_eq!(err.to_string(), "Invalid tempo: 0 BPM (must be positive)");
    /// ```
    #[error("Invalid tempo: {0} BPM (must be positive)")]
    InvalidTempo(u32),

    /// Beats per measure and beat unit must both be positive.
    #[error("Invalid meter {beats_per_measure}/{beat_unit} (both parts must be positive)")]
    InvalidMeter {
        beats_per_measure: u32,
        beat_unit: u32,
    },

    /// Playback configuration could not be deserialized.
    #[error("Invalid playback config: {0}")]
    Config(String),

    /// Exercise data could not be deserialized.
    #[error("Invalid exercise: {0}")]
    Exercise(String),
}
