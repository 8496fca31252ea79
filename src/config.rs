//! Playback configuration
//!
//! Tempo and meter start out as the loaded exercise's values but can be changed
//! independently at runtime. Hosts may also keep a config in YAML:
//!
//! ```yaml
//! tempo: 96
//! beats-per-measure: 3
//! beat-unit: 4
//! loop: true
//! metronome: true
//! count-in: 1
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;
use crate::exercise::Exercise;
use crate::timing::bar_duration_seconds;

pub const DEFAULT_TEMPO: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PlaybackConfig {
    /// Quarter notes per minute
    pub tempo: u32,
    pub beats_per_measure: u32,
    pub beat_unit: u32,
    #[serde(rename = "loop")]
    pub loop_enabled: bool,
    #[serde(rename = "metronome")]
    pub metronome_enabled: bool,
    /// Measures of metronome clicks before the first note
    pub count_in: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            beats_per_measure: 4,
            beat_unit: 4,
            loop_enabled: false,
            metronome_enabled: false,
            count_in: 0,
        }
    }
}

impl PlaybackConfig {
    /// Defaults with tempo and meter taken from the exercise
    pub fn for_exercise(exercise: &Exercise) -> Self {
        Self::default().with_exercise(exercise)
    }

    /// Replace tempo and meter with the exercise's values, keeping loop, metronome and count-in
    pub fn with_exercise(mut self, exercise: &Exercise) -> Self {
        if exercise.tempo > 0 {
            self.tempo = exercise.tempo;
        }
        self.beats_per_measure = exercise.time_signature.beats;
        self.beat_unit = exercise.time_signature.beat_type;
        self
    }

    /// Parse and validate a YAML config
    pub fn from_yaml(source: &str) -> Result<Self, PlaybackError> {
        let config: Self =
            serde_yaml::from_str(source).map_err(|e| PlaybackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.tempo == 0 {
            return Err(PlaybackError::InvalidTempo(self.tempo));
        }
        if self.beats_per_measure == 0 || self.beat_unit == 0 {
            return Err(PlaybackError::InvalidMeter {
                beats_per_measure: self.beats_per_measure,
                beat_unit: self.beat_unit,
            });
        }
        Ok(())
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo as f64
    }

    /// Length of one measure at the current tempo and meter
    pub fn bar_duration(&self) -> f64 {
        bar_duration_seconds(self.beats_per_measure, self.beat_unit, self.tempo_bpm())
    }

    /// Time taken by the count-in before the first bar
    pub fn lead_in(&self) -> f64 {
        self.count_in as f64 * self.bar_duration()
    }
}
