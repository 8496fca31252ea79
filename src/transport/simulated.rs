//! In-process backend with a manually advanced clock
//!
//! Useful for headless hosts and for tests: nothing runs until [`SimulatedBackend::advance`]
//! moves the clock, and every sound request is recorded instead of played.

use std::sync::{Arc, Mutex};

use super::backend::{AudioBackend, CallbackHandle, Instrument, TimedCallback};

/// What the instrument was asked to play
#[derive(Debug, Clone, PartialEq)]
pub enum Sound {
    Note {
        pitches: Vec<String>,
        duration: f64,
        time: f64,
    },
    Click {
        downbeat: bool,
        time: f64,
    },
}

impl Sound {
    pub fn time(&self) -> f64 {
        match self {
            Sound::Note { time, .. } | Sound::Click { time, .. } => *time,
        }
    }
}

/// Instrument that records every request
#[derive(Debug, Default)]
pub struct RecordingInstrument {
    sounds: Mutex<Vec<Sound>>,
}

impl RecordingInstrument {
    pub fn sounds(&self) -> Vec<Sound> {
        self.lock().clone()
    }

    /// Pitch sets of every note played, in order
    pub fn notes(&self) -> Vec<Vec<String>> {
        self.lock()
            .iter()
            .filter_map(|sound| match sound {
                Sound::Note { pitches, .. } => Some(pitches.clone()),
                Sound::Click { .. } => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<(bool, f64)> {
        self.lock()
            .iter()
            .filter_map(|sound| match sound {
                Sound::Click { downbeat, time } => Some((*downbeat, *time)),
                Sound::Note { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sound>> {
        // A panic inside a callback must not hide what was recorded before it
        self.sounds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Instrument for RecordingInstrument {
    fn trigger(&self, pitches: &[String], duration: f64, time: f64) {
        self.lock().push(Sound::Note {
            pitches: pitches.to_vec(),
            duration,
            time,
        });
    }

    fn click(&self, downbeat: bool, time: f64) {
        self.lock().push(Sound::Click { downbeat, time });
    }
}

struct Registered {
    handle: CallbackHandle,
    time: f64,
    callback: TimedCallback,
}

pub struct SimulatedBackend {
    ready: bool,
    running: bool,
    position: f64,
    tempo: u32,
    loop_enabled: bool,
    loop_end: f64,
    next_handle: u64,
    callbacks: Vec<Registered>,
    instrument: Arc<RecordingInstrument>,
}

impl SimulatedBackend {
    /// A ready backend stopped at 0
    pub fn new() -> Self {
        Self {
            ready: true,
            running: false,
            position: 0.0,
            tempo: 0,
            loop_enabled: false,
            loop_end: 0.0,
            next_handle: 0,
            callbacks: Vec::new(),
            instrument: Arc::new(RecordingInstrument::default()),
        }
    }

    /// A backend that reports not ready until `initialize` is called
    pub fn uninitialized() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn recorder(&self) -> Arc<RecordingInstrument> {
        Arc::clone(&self.instrument)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn loop_window(&self) -> Option<f64> {
        self.loop_enabled.then_some(self.loop_end)
    }

    /// Number of callbacks currently registered
    pub fn pending(&self) -> usize {
        self.callbacks.len()
    }

    /// Registered callback times in registration order
    pub fn registered_times(&self) -> Vec<f64> {
        self.callbacks.iter().map(|r| r.time).collect()
    }

    /// Run the clock forward by `seconds`, firing every callback it crosses.
    ///
    /// Callbacks in `[position, position + seconds)` fire in time order (registration order
    /// for ties). With a loop window the clock wraps to 0 at the loop end.
    pub fn advance(&mut self, seconds: f64) {
        if !self.running || seconds <= 0.0 {
            return;
        }

        let mut remaining = seconds;
        loop {
            let end = self.position + remaining;
            if self.loop_enabled && self.loop_end > 0.0 && end >= self.loop_end {
                self.fire_range(self.position, self.loop_end);
                remaining = end - self.loop_end;
                self.position = 0.0;
                log::trace!("loop wrapped, {:.3}s remaining", remaining);
                if remaining <= 0.0 {
                    break;
                }
            } else {
                self.fire_range(self.position, end);
                self.position = end;
                break;
            }
        }
    }

    /// Advance until the clock reads `time` (no-op when already past it)
    pub fn advance_to(&mut self, time: f64) {
        if time > self.position {
            self.advance(time - self.position);
        }
    }

    fn fire_range(&mut self, from: f64, to: f64) {
        let mut due: Vec<usize> = self
            .callbacks
            .iter()
            .enumerate()
            .filter(|(_, r)| r.time >= from && r.time < to)
            .map(|(i, _)| i)
            .collect();
        due.sort_by(|&a, &b| {
            let (a, b) = (&self.callbacks[a], &self.callbacks[b]);
            a.time.total_cmp(&b.time).then(a.handle.cmp(&b.handle))
        });

        for i in due {
            let registered = &mut self.callbacks[i];
            log::trace!("firing {:?} at {:.3}", registered.handle, registered.time);
            (registered.callback)(registered.time);
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SimulatedBackend {
    fn initialize(&mut self) -> Result<(), String> {
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn instrument(&self) -> Arc<dyn Instrument> {
        self.instrument.clone()
    }

    fn register_timed_callback(&mut self, time: f64, callback: TimedCallback) -> CallbackHandle {
        let handle = CallbackHandle(self.next_handle);
        self.next_handle += 1;
        log::trace!("registered {:?} at {:.3}", handle, time);
        self.callbacks.push(Registered {
            handle,
            time,
            callback,
        });
        handle
    }

    fn cancel_all(&mut self) {
        self.callbacks.clear();
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn stop(&mut self) {
        self.running = false;
        self.position = 0.0;
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_tempo(&mut self, bpm: u32) {
        self.tempo = bpm;
    }

    fn set_loop(&mut self, enabled: bool, loop_end: f64) {
        self.loop_enabled = enabled;
        self.loop_end = loop_end;
    }
}
