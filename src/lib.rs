pub mod config;
pub mod error;
pub mod exercise;
pub mod pitch;
pub mod playback;
pub mod timing;
pub mod transport;

pub use config::{PlaybackConfig, DEFAULT_TEMPO};
pub use error::*;
pub use exercise::{Bar, Exercise, Note, TimeSignature, Voice};
pub use pitch::Pitch;
pub use playback::{
    exercise_duration, schedule_duration, schedule_exercise, schedule_metronome, MetronomeBeat,
    ScheduledEvent,
};
pub use timing::{BaseUnit, Duration};
pub use transport::{
    AudioBackend, Instrument, PlaybackController, PlaybackListener, SimulatedBackend,
    TransportState,
};

/// Schedule a YAML exercise at its own tempo and meter.
/// This is the main entry point for hosts that only need the event list.
pub fn schedule_yaml(source: &str) -> Result<Vec<ScheduledEvent>, PlaybackError> {
    let exercise = Exercise::from_yaml(source)?;
    let config = PlaybackConfig::for_exercise(&exercise);
    config.validate()?;
    Ok(schedule_exercise(&exercise, &config))
}

/// Schedule a YAML exercise with a host-supplied config (tempo and meter overrides kept)
pub fn schedule_yaml_with(
    source: &str,
    config: &PlaybackConfig,
) -> Result<Vec<ScheduledEvent>, PlaybackError> {
    let exercise = Exercise::from_yaml(source)?;
    config.validate()?;
    Ok(schedule_exercise(&exercise, config))
}
