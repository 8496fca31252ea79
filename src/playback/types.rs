//! Scheduled event type definitions
//!
//! Both event kinds are plain data derived from an exercise and a config. They are
//! `Serialize` so a host can hand snapshots to its UI layer unchanged.

use serde::Serialize;

use crate::exercise::{Note, Voice};

/// A note or rest with absolute timing
///
/// # Fields
/// - `id`: `"{exercise}-bar{n}-{voice}-note{i}"`, stable across rebuilds
/// - `bar_number`: 1-indexed bar the note came from
/// - `note_index`: position within its bar and voice
/// - `start_time`: seconds from the schedule origin (cumulative, never measured)
/// - `duration`: seconds at the tempo the schedule was built for
/// - `midi_pitches`: MIDI numbers for the sounded pitches (empty for rests)
/// - `pitch_names`: synthesizer pitch names, e.g. `"C4"` (empty for rests)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub id: String,
    pub note: Note,
    pub bar_number: u32,
    pub note_index: usize,
    pub start_time: f64,
    pub duration: f64,
    pub midi_pitches: Vec<u8>,
    pub pitch_names: Vec<String>,
    pub voice: Voice,
}

impl ScheduledEvent {
    /// Rests stay in the schedule for progress tracking but are never sent to the audio backend
    pub fn is_rest(&self) -> bool {
        self.pitch_names.is_empty()
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// A metronome tick
///
/// `beat_number` counts 0..beats_per_measure cyclically; beat 0 is the downbeat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetronomeBeat {
    pub time: f64,
    pub beat_number: u32,
    pub is_downbeat: bool,
}
