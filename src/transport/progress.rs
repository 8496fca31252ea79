//! Playback progress shared with the UI
//!
//! Timed callbacks fire on the backend's clock thread and record what they played
//! here. Atomics keep reads lock-free for a render loop polling every frame.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

const NONE: usize = usize::MAX;

#[derive(Debug)]
pub struct SharedProgress {
    note_index: AtomicUsize,
    measure: AtomicU32,
    beat: AtomicU32,
    beats_played: AtomicU32,
}

impl SharedProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Index of the last sounded event in the schedule
    pub fn note_index(&self) -> Option<usize> {
        match self.note_index.load(Ordering::Relaxed) {
            NONE => None,
            index => Some(index),
        }
    }

    /// Bar (1-indexed) of the last sounded note
    pub fn measure(&self) -> u32 {
        self.measure.load(Ordering::Relaxed)
    }

    /// Last metronome beat number (0-indexed within the measure)
    pub fn beat(&self) -> u32 {
        self.beat.load(Ordering::Relaxed)
    }

    pub fn beats_played(&self) -> u32 {
        self.beats_played.load(Ordering::Relaxed)
    }

    pub(crate) fn record_note(&self, index: usize, bar_number: u32) {
        self.note_index.store(index, Ordering::Relaxed);
        self.measure.store(bar_number, Ordering::Relaxed);
    }

    pub(crate) fn record_beat(&self, beat_number: u32) {
        self.beat.store(beat_number, Ordering::Relaxed);
        self.beats_played.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.note_index.store(NONE, Ordering::Relaxed);
        self.measure.store(1, Ordering::Relaxed);
        self.beat.store(0, Ordering::Relaxed);
        self.beats_played.store(0, Ordering::Relaxed);
    }
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self {
            note_index: AtomicUsize::new(NONE),
            measure: AtomicU32::new(1),
            beat: AtomicU32::new(0),
            beats_played: AtomicU32::new(0),
        }
    }
}
