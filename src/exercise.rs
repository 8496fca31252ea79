//! # Exercise Data Model
//!
//! Symbolic input to the playback engine.
//!
//! ## Type Hierarchy
//! ```text
//! Exercise
//!   ├── id, name
//!   ├── time_signature: TimeSignature ("N/D")
//!   ├── tempo: BPM
//!   ├── grand_staff: bool (second voice enabled)
//!   └── Vec<Bar>
//!         ├── number (1-indexed)
//!         ├── notes: Vec<Note>       (treble / single staff)
//!         └── bass_notes: Vec<Note>  (grand staff only)
//!
//! Note
//!   ├── keys: Vec<String> ("c/4", "e/4" ...; empty = rest)
//!   └── duration: Duration (parsed once from "q", "hd", "8r" ...)
//! ```
//!
//! Nothing here checks that a bar's notes add up to the measure length. The scheduler
//! advances every bar by its nominal length regardless.
//!
//! ## YAML
//! ```yaml
//! id: l1_ex1
//! time-signature: 4/4
//! tempo: 80
//! bars:
//!   - number: 1
//!     notes:
//!       - { keys: ["c/4"], duration: q }
//!       - { keys: [], duration: qr }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DEFAULT_TEMPO;
use crate::error::PlaybackError;
use crate::timing::{BaseUnit, Duration};

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self { beats, beat_type }
    }

    /// Parse `"N/D"`. A missing, malformed or zero part falls back to 4.
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split('/');
        let mut next = || {
            parts
                .next()
                .and_then(|part| part.trim().parse::<u32>().ok())
                .filter(|&value| value > 0)
                .unwrap_or(4)
        };
        let beats = next();
        let beat_type = next();
        Self { beats, beat_type }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

impl Serialize for TimeSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TimeSignature::parse(&raw))
    }
}

/// Which staff a note sequence belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    /// Single staff, or the upper staff of a grand staff
    Treble,
    /// Lower staff of a grand staff
    Bass,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Treble => "treble",
            Voice::Bass => "bass",
        }
    }
}

/// A note, chord or rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub keys: Vec<String>,
    pub duration: Duration,
}

impl Note {
    pub fn new<K: Into<String>>(keys: impl IntoIterator<Item = K>, duration: Duration) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            duration,
        }
    }

    /// Build a note from a duration code, e.g. `Note::with_code(["c/4"], "qd")`
    pub fn with_code<K: Into<String>>(keys: impl IntoIterator<Item = K>, code: &str) -> Self {
        Self::new(keys, Duration::from_code(code))
    }

    /// A rest of the given length
    pub fn rest(base: BaseUnit) -> Self {
        Self {
            keys: Vec::new(),
            duration: Duration::new(base).rest(),
        }
    }

    /// Silent when marked as a rest or when it names no pitches
    pub fn is_rest(&self) -> bool {
        self.duration.rest || self.keys.is_empty()
    }
}

/// One measure of the exercise
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Bar {
    pub number: u32,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bass_notes: Vec<Note>,
}

impl Bar {
    pub fn new(number: u32, notes: Vec<Note>) -> Self {
        Self {
            number,
            notes,
            bass_notes: Vec::new(),
        }
    }

    pub fn with_bass(mut self, bass_notes: Vec<Note>) -> Self {
        self.bass_notes = bass_notes;
        self
    }

    /// Notes for a voice; the bass voice is empty unless the bar has one
    pub fn voice(&self, voice: Voice) -> &[Note] {
        match voice {
            Voice::Treble => &self.notes,
            Voice::Bass => &self.bass_notes,
        }
    }
}

fn default_tempo() -> u32 {
    DEFAULT_TEMPO
}

/// A complete practice exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Exercise {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default = "default_tempo")]
    pub tempo: u32,
    #[serde(default)]
    pub grand_staff: bool,
    #[serde(default)]
    pub bars: Vec<Bar>,
}

impl Exercise {
    pub fn new(id: impl Into<String>, time_signature: TimeSignature, tempo: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            time_signature,
            tempo,
            grand_staff: false,
            bars: Vec::new(),
        }
    }

    pub fn with_grand_staff(mut self, grand_staff: bool) -> Self {
        self.grand_staff = grand_staff;
        self
    }

    /// Append a bar numbered after the last one
    pub fn push_bar(&mut self, notes: Vec<Note>) -> &mut Bar {
        let number = self.bars.len() as u32 + 1;
        self.bars.push(Bar::new(number, notes));
        let last = self.bars.len() - 1;
        &mut self.bars[last]
    }

    /// Load an exercise from YAML
    pub fn from_yaml(source: &str) -> Result<Self, PlaybackError> {
        serde_yaml::from_str(source).map_err(|e| PlaybackError::Exercise(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature_parse() {
        assert_eq!(TimeSignature::parse("3/4"), TimeSignature::new(3, 4));
        assert_eq!(TimeSignature::parse("6/8"), TimeSignature::new(6, 8));
        assert_eq!(TimeSignature::parse(" 2 / 2 "), TimeSignature::new(2, 2));
    }

    #[test]
    fn test_time_signature_fallbacks() {
        assert_eq!(TimeSignature::parse(""), TimeSignature::new(4, 4));
        assert_eq!(TimeSignature::parse("3"), TimeSignature::new(3, 4));
        assert_eq!(TimeSignature::parse("0/8"), TimeSignature::new(4, 8));
        assert_eq!(TimeSignature::parse("x/y"), TimeSignature::new(4, 4));
    }

    #[test]
    fn test_rest_detection() {
        assert!(Note::with_code(["c/4"], "qr").is_rest());
        assert!(Note::with_code(Vec::<String>::new(), "q").is_rest());
        assert!(Note::rest(BaseUnit::Half).is_rest());
        assert!(!Note::with_code(["c/4", "e/4"], "h").is_rest());
    }

    #[test]
    fn test_push_bar_numbers_contiguously() {
        let mut exercise = Exercise::new("ex", TimeSignature::default(), 90);
        exercise.push_bar(vec![Note::with_code(["c/4"], "w")]);
        exercise
            .push_bar(vec![Note::with_code(["e/4"], "w")])
            .bass_notes = vec![Note::with_code(["c/3"], "w")];

        assert_eq!(exercise.bars[0].number, 1);
        assert_eq!(exercise.bars[1].number, 2);
        assert_eq!(exercise.bars[1].voice(Voice::Bass).len(), 1);
        assert!(exercise.bars[0].voice(Voice::Bass).is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let source = r#"
id: l1_ex1
name: Stepwise
time-signature: 3/4
tempo: 96
grand-staff: true
bars:
  - number: 1
    notes:
      - { keys: ["c/4"], duration: hd }
    bass-notes:
      - { keys: ["c/3"], duration: q }
      - { duration: hr }
"#;
        let exercise = Exercise::from_yaml(source).unwrap();
        assert_eq!(exercise.id, "l1_ex1");
        assert_eq!(exercise.time_signature, TimeSignature::new(3, 4));
        assert_eq!(exercise.tempo, 96);
        assert!(exercise.grand_staff);
        assert_eq!(exercise.bars[0].notes[0].duration, Duration::from_code("hd"));
        assert!(exercise.bars[0].bass_notes[1].is_rest());
    }

    #[test]
    fn test_from_yaml_unknown_duration_is_quarter() {
        let source = r#"
id: odd
bars:
  - number: 1
    notes:
      - { keys: ["c/4"], duration: "7" }
"#;
        let exercise = Exercise::from_yaml(source).unwrap();
        assert_eq!(exercise.tempo, 80);
        assert_eq!(exercise.bars[0].notes[0].duration, Duration::new(BaseUnit::Quarter));
    }

    #[test]
    fn test_from_yaml_numeric_durations() {
        let source = r#"
id: eighths
bars:
  - number: 1
    notes:
      - { keys: ["c/4"], duration: 8 }
      - { keys: ["d/4"], duration: 16 }
      - { keys: ["e/4"], duration: 8d }
"#;
        let exercise = Exercise::from_yaml(source).unwrap();
        let notes = &exercise.bars[0].notes;
        assert_eq!(notes[0].duration, Duration::new(BaseUnit::Eighth));
        assert_eq!(notes[1].duration, Duration::new(BaseUnit::Sixteenth));
        assert_eq!(notes[2].duration, Duration::new(BaseUnit::Eighth).dotted());
    }

    #[test]
    fn test_from_yaml_error() {
        let result = Exercise::from_yaml("bars: 3");
        assert!(matches!(result, Err(PlaybackError::Exercise(_))));
    }
}
