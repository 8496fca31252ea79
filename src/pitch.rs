//! Pitch key resolution
//!
//! Exercises name pitches with notation keys of the form `letter[accidental]/octave`
//! (`"c/4"`, `"f#/5"`, `"bb/3"`). Playback needs them in two other shapes: a MIDI
//! number and a scientific pitch name for the synthesizer (`"F#5"`).

use std::fmt;

/// Note letters A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'c' => Some(Letter::C),
            'd' => Some(Letter::D),
            'e' => Some(Letter::E),
            'f' => Some(Letter::F),
            'g' => Some(Letter::G),
            'a' => Some(Letter::A),
            'b' => Some(Letter::B),
            _ => None,
        }
    }

    /// Semitones above C
    fn semitone(&self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn as_char(&self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// A resolved pitch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pitch {
    pub letter: Letter,
    /// Net accidental in semitones (`#` = +1, `b` = -1, `##` = +2 ...)
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    /// Parse a notation key such as `"c/4"` or `"f#/5"`. Returns `None` for anything else.
    pub fn from_key(key: &str) -> Option<Self> {
        let (name, octave) = key.trim().split_once('/')?;
        let octave: i8 = octave.trim().parse().ok()?;

        let mut chars = name.trim().chars();
        let letter = Letter::from_char(chars.next()?)?;

        let mut alter = 0i8;
        for c in chars {
            match c {
                '#' => alter += 1,
                'b' => alter -= 1,
                'n' => {}
                _ => return None,
            }
        }

        Some(Self {
            letter,
            alter,
            octave,
        })
    }

    /// MIDI note number (C4 = 60), clamped to 0-127
    pub fn midi(&self) -> u8 {
        let total = (self.octave as i32 + 1) * 12 + self.letter.semitone() + self.alter as i32;
        total.clamp(0, 127) as u8
    }

    /// Scientific pitch name for synthesizers, e.g. `"C4"`, `"F#5"`, `"Bb3"`
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        let accidental = if self.alter >= 0 { "#" } else { "b" };
        for _ in 0..self.alter.unsigned_abs() {
            f.write_str(accidental)?;
        }
        write!(f, "{}", self.octave)
    }
}

/// Resolve a list of keys, skipping (and logging) anything that does not parse.
pub fn resolve_keys(keys: &[String]) -> Vec<Pitch> {
    keys.iter()
        .filter_map(|key| {
            let pitch = Pitch::from_key(key);
            if pitch.is_none() {
                log::warn!("Unrecognised pitch key '{}', skipping", key);
            }
            pitch
        })
        .collect()
}
