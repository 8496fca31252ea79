//! # Duration Calculus
//!
//! Converts symbolic duration codes into fractions of a whole note and then into
//! seconds for a given tempo and beat unit.
//!
//! ## Duration Codes
//! ```text
//! w   whole          1
//! h   half           1/2
//! q   quarter        1/4
//! 8   eighth         1/8
//! 16  sixteenth      1/16
//! 32  thirty-second  1/32
//!
//! suffix d   dotted (x 1.5)     "hd", "qd", "8d"
//! suffix r   rest               "qr", "8r", "hdr"
//! ```
//!
//! Rests occupy exactly the same time as sounded notes of the same length.
//!
//! ## Tempo Convention
//! Tempo is counted in quarter notes per minute and rescaled by the beat unit, so a
//! whole note lasts `(240 / bpm) * (4 / beat_unit)` seconds. In 6/8 the same BPM
//! therefore counts eighths.
//!
//! ## Unknown Codes
//! [`Duration::from_code`] never fails: an unknown code logs a warning and falls
//! back to a quarter note. [`Duration::parse`] is the strict variant.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Base note value, without dot or rest modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseUnit {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl BaseUnit {
    /// Returns the value as a fraction of a whole note
    pub fn as_fraction(&self) -> f64 {
        match self {
            BaseUnit::Whole => 1.0,
            BaseUnit::Half => 0.5,
            BaseUnit::Quarter => 0.25,
            BaseUnit::Eighth => 0.125,
            BaseUnit::Sixteenth => 0.0625,
            BaseUnit::ThirtySecond => 0.03125,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BaseUnit::Whole => "w",
            BaseUnit::Half => "h",
            BaseUnit::Quarter => "q",
            BaseUnit::Eighth => "8",
            BaseUnit::Sixteenth => "16",
            BaseUnit::ThirtySecond => "32",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "w" => Some(BaseUnit::Whole),
            "h" => Some(BaseUnit::Half),
            "q" => Some(BaseUnit::Quarter),
            "8" => Some(BaseUnit::Eighth),
            "16" => Some(BaseUnit::Sixteenth),
            "32" => Some(BaseUnit::ThirtySecond),
            _ => None,
        }
    }
}

/// A duration code that is not part of the vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown duration code '{0}'")]
pub struct UnknownDuration(pub String);

/// Parsed duration code
///
/// Built once when an exercise is loaded so the scheduler never re-parses strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    pub base: BaseUnit,
    pub dotted: bool,
    pub rest: bool,
}

impl Duration {
    pub const fn new(base: BaseUnit) -> Self {
        Self {
            base,
            dotted: false,
            rest: false,
        }
    }

    pub fn dotted(mut self) -> Self {
        self.dotted = true;
        self
    }

    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }

    /// Parse a duration code such as `"q"`, `"hd"`, `"8r"` or `"qdr"`.
    ///
    /// The rest suffix comes last, the dot directly after the base value.
    pub fn parse(code: &str) -> Result<Self, UnknownDuration> {
        let trimmed = code.trim();
        let (without_rest, rest) = match trimmed.strip_suffix('r') {
            Some(stripped) => (stripped, true),
            None => (trimmed, false),
        };
        let (base_code, dotted) = match without_rest.strip_suffix('d') {
            Some(stripped) => (stripped, true),
            None => (without_rest, false),
        };

        BaseUnit::from_code(base_code)
            .map(|base| Self { base, dotted, rest })
            .ok_or_else(|| UnknownDuration(code.to_string()))
    }

    /// Lenient parse: unknown codes become a quarter note and log a warning.
    ///
    /// A rest suffix on an otherwise unknown code is still honoured so the slot stays silent.
    pub fn from_code(code: &str) -> Self {
        match Self::parse(code) {
            Ok(duration) => duration,
            Err(err) => {
                log::warn!("{}, defaulting to quarter note", err);
                Self {
                    base: BaseUnit::Quarter,
                    dotted: false,
                    rest: code.trim().ends_with('r'),
                }
            }
        }
    }

    /// Returns the duration as a fraction of a whole note (dot applied, rest ignored)
    pub fn as_fraction(&self) -> f64 {
        let base = self.base.as_fraction();
        if self.dotted { base * 1.5 } else { base }
    }

    /// Length in seconds at the given tempo and beat unit
    pub fn seconds(&self, tempo_bpm: f64, beat_unit: u32) -> f64 {
        self.as_fraction() * seconds_per_whole_note(tempo_bpm, beat_unit)
    }

    /// Canonical code for this duration
    pub fn code(&self) -> String {
        let mut code = self.base.code().to_string();
        if self.dotted {
            code.push('d');
        }
        if self.rest {
            code.push('r');
        }
        code
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl Serialize for Duration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

/// YAML reads bare `8`, `16` and `32` as numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Number(u32),
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = match RawCode::deserialize(deserializer)? {
            RawCode::Text(code) => code,
            RawCode::Number(n) => n.to_string(),
        };
        Ok(Duration::from_code(&code))
    }
}

fn seconds_per_whole_note(tempo_bpm: f64, beat_unit: u32) -> f64 {
    (240.0 / tempo_bpm) * (4.0 / beat_unit as f64)
}

/// Fraction of a whole note for a duration code. Unknown codes count as a quarter.
pub fn duration_to_fraction(code: &str) -> f64 {
    Duration::from_code(code).as_fraction()
}

/// Seconds for a duration code at `tempo_bpm` (quarter notes per minute) and `beat_unit`.
///
/// ```
/// use etude::timing::duration_to_seconds;
///
/// assert_eq!(duration_to_seconds("q", 80.0, 4), 0.75);
/// assert_eq!(duration_to_seconds("hd", 120.0, 4), 1.5);
/// ```
pub fn duration_to_seconds(code: &str, tempo_bpm: f64, beat_unit: u32) -> f64 {
    Duration::from_code(code).seconds(tempo_bpm, beat_unit)
}

/// Length of one full measure, independent of what the measure contains.
pub fn bar_duration_seconds(beats_per_measure: u32, beat_unit: u32, tempo_bpm: f64) -> f64 {
    let seconds_per_beat = 60.0 / tempo_bpm;
    let beat_adjustment = 4.0 / beat_unit as f64;
    beats_per_measure as f64 * seconds_per_beat * beat_adjustment
}

/// Seconds between metronome beats when beats are counted in `beat_unit`
pub fn metronome_interval(tempo_bpm: f64, beat_unit: u32) -> f64 {
    (60.0 / tempo_bpm) * (4.0 / beat_unit as f64)
}

/// Beat within the measure (0-indexed) that `time` falls on
pub fn current_beat(time: f64, tempo_bpm: f64, beats_per_measure: u32, beat_unit: u32) -> u32 {
    if beats_per_measure == 0 {
        return 0;
    }
    let total_beats = (time.max(0.0) / metronome_interval(tempo_bpm, beat_unit)).floor() as u64;
    (total_beats % beats_per_measure as u64) as u32
}

/// Measure (1-indexed) that `time` falls in
pub fn current_measure(time: f64, tempo_bpm: f64, beats_per_measure: u32, beat_unit: u32) -> u32 {
    let bar = bar_duration_seconds(beats_per_measure, beat_unit, tempo_bpm);
    if bar <= 0.0 {
        return 1;
    }
    (time.max(0.0) / bar).floor() as u32 + 1
}

/// Format seconds as `M:SS`
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
