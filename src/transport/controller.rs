//! Transport controller
//!
//! Owns the loaded exercise, the playback config and the derived schedule, and drives
//! an [`AudioBackend`] from them.
//!
//! ## State Machine
//! ```text
//!              load: stop + rebuild
//!   ┌─────────┐ play ┌─────────┐ pause ┌────────┐
//!   │ Stopped │─────▶│ Playing │──────▶│ Paused │
//!   └─────────┘      └─────────┘◀──────└────────┘
//!        ▲   stop         │        play     │
//!        └────────────────┴─────────────────┘
//! ```
//!
//! ## Live Changes
//! Tempo, meter, count-in and metronome changes rebuild the schedule. While playing,
//! every backend registration is cancelled and the remaining events are registered
//! again from the same musical position, which the clock is moved to. While paused,
//! the same resync happens on the next `play()`.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::exercise::Exercise;
use crate::playback::{schedule_duration, schedule_exercise, schedule_metronome};
use crate::playback::{MetronomeBeat, ScheduledEvent};

use super::backend::{AudioBackend, PlaybackListener};
use super::progress::SharedProgress;

/// Share of a note's scheduled length that actually sounds
pub const NOTE_LENGTH_RATIO: f64 = 0.9;

/// Transport state (play/pause/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// Stopped or paused
    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped | TransportState::Paused)
    }
}

/// Map a transport position between two timelines, keeping the musical position.
///
/// Position is measured in bars from the end of the count-in, so tempo, meter and
/// count-in changes all land on the same spot in the music.
fn map_position(position: f64, from: &PlaybackConfig, to: &PlaybackConfig) -> f64 {
    if from.tempo == to.tempo
        && from.beats_per_measure == to.beats_per_measure
        && from.beat_unit == to.beat_unit
        && from.count_in == to.count_in
    {
        return position;
    }
    let bars = (position - from.lead_in()) / from.bar_duration();
    (to.lead_in() + bars * to.bar_duration()).max(0.0)
}

/// Quarter-note metronome beats taken up by the count-in
fn lead_in_beats(config: &PlaybackConfig) -> f64 {
    config.count_in as f64 * config.beats_per_measure as f64 * 4.0 / config.beat_unit as f64
}

/// Drives one practice session's playback against a backend.
///
/// # Example
/// ```rust
/// use etude::{
///     Exercise, Note, PlaybackController, SimulatedBackend, TimeSignature, TransportState,
/// };
///
/// let mut exercise = Exercise::new("demo", TimeSignature::new(4, 4), 80);
/// exercise.push_bar(vec![Note::with_code(["c/4"], "w")]);
///
/// let mut controller = PlaybackController::new(SimulatedBackend::new());
/// controller.load(exercise);
/// controller.play()?;
/// assert_eq!(controller.state(), TransportState::Playing);
///
/// controller.backend_mut().advance(0.5);
/// assert_eq!(controller.backend().recorder().notes(), vec![vec!["C4".to_string()]]);
/// # Ok::<(), etude::PlaybackError>(())
/// ```
pub struct PlaybackController<B: AudioBackend> {
    backend: B,
    state: TransportState,
    exercise: Option<Exercise>,
    config: PlaybackConfig,
    events: Arc<[ScheduledEvent]>,
    beats: Arc<[MetronomeBeat]>,
    listener: Option<Arc<dyn PlaybackListener>>,
    progress: Arc<SharedProgress>,
    /// Config the current backend registrations were made with
    registered: Option<PlaybackConfig>,
    /// Note schedule the current backend registrations were made from
    registered_events: Arc<[ScheduledEvent]>,
    /// Some events before the resume point were left unregistered
    partial: bool,
    needs_resync: bool,
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, PlaybackConfig::default())
    }

    /// Start from a host-supplied config; loading an exercise still takes its tempo and meter
    pub fn with_config(backend: B, config: PlaybackConfig) -> Self {
        Self {
            backend,
            state: TransportState::Stopped,
            exercise: None,
            config,
            events: Arc::from(Vec::new()),
            beats: Arc::from(Vec::new()),
            listener: None,
            progress: SharedProgress::new(),
            registered: None,
            registered_events: Arc::from(Vec::new()),
            partial: false,
            needs_resync: false,
        }
    }

    /// Listener for note and beat notifications. Takes effect at the next registration.
    pub fn set_listener(&mut self, listener: Arc<dyn PlaybackListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Initialise the backend's audio output
    pub fn initialize(&mut self) -> Result<(), PlaybackError> {
        self.backend
            .initialize()
            .map_err(PlaybackError::BackendInit)?;
        log::info!("Audio backend initialised");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    pub fn exercise(&self) -> Option<&Exercise> {
        self.exercise.as_ref()
    }

    /// Snapshot of the current note schedule (times relative to the first bar)
    pub fn scheduled_events(&self) -> Arc<[ScheduledEvent]> {
        Arc::clone(&self.events)
    }

    /// Snapshot of the metronome stream, count-in included (transport times)
    pub fn metronome_beats(&self) -> Arc<[MetronomeBeat]> {
        Arc::clone(&self.beats)
    }

    pub fn progress(&self) -> Arc<SharedProgress> {
        Arc::clone(&self.progress)
    }

    /// Transport position in seconds, count-in included
    pub fn position(&self) -> f64 {
        self.backend.position()
    }

    /// Length of the transport timeline: count-in plus every bar
    pub fn total_duration(&self) -> f64 {
        match &self.exercise {
            Some(exercise) => self.config.lead_in() + schedule_duration(exercise, &self.config),
            None => 0.0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Load an exercise, stopping any playback of the previous one first
    pub fn load(&mut self, exercise: Exercise) {
        if self.state != TransportState::Stopped {
            self.stop();
        }

        self.config = self.config.with_exercise(&exercise);
        if let Err(err) = self.config.validate() {
            log::warn!("Exercise '{}' has an unusable meter ({}), using 4/4", exercise.id, err);
            self.config.beats_per_measure = 4;
            self.config.beat_unit = 4;
        }

        log::debug!(
            "Loading exercise '{}' ({} bars, {}/{} at {} BPM)",
            exercise.id,
            exercise.bars.len(),
            self.config.beats_per_measure,
            self.config.beat_unit,
            self.config.tempo
        );

        self.exercise = Some(exercise);
        self.progress.reset();
        self.rebuild();
    }

    /// Start from the beginning, or resume when paused. No-op while playing.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            TransportState::Playing => Ok(()),
            TransportState::Paused => {
                if !self.backend.is_ready() {
                    return Err(PlaybackError::BackendNotReady);
                }
                if self.needs_resync {
                    self.resync();
                } else {
                    self.sync_loop();
                }
                self.backend.start();
                self.state = TransportState::Playing;
                log::debug!("Resumed at {:.3}s", self.backend.position());
                Ok(())
            }
            TransportState::Stopped => {
                if self.exercise.is_none() {
                    return Err(PlaybackError::NoExercise);
                }
                if !self.backend.is_ready() {
                    return Err(PlaybackError::BackendNotReady);
                }

                self.rebuild();
                self.backend.cancel_all();
                self.backend.seek(0.0);
                self.backend.set_tempo(self.config.tempo);
                self.sync_loop();
                self.register_all();
                self.backend.start();
                self.state = TransportState::Playing;
                log::debug!("Playback started");
                Ok(())
            }
        }
    }

    /// Suspend the clock, keeping position and registrations. No-op unless playing.
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.backend.pause();
        self.state = TransportState::Paused;
        log::debug!("Paused at {:.3}s", self.backend.position());
    }

    /// Cancel everything and rewind to the start. No-op when already stopped.
    pub fn stop(&mut self) {
        if self.state == TransportState::Stopped {
            return;
        }
        self.backend.cancel_all();
        self.backend.stop();
        self.state = TransportState::Stopped;
        self.registered = None;
        self.partial = false;
        self.needs_resync = false;
        self.progress.reset();
        log::debug!("Stopped");
    }

    /// Pause when playing, otherwise play
    pub fn toggle_play(&mut self) -> Result<(), PlaybackError> {
        if self.state.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Change tempo. While playing the remaining events are re-registered at the new tempo.
    pub fn set_tempo(&mut self, bpm: u32) -> Result<(), PlaybackError> {
        if bpm == 0 {
            return Err(PlaybackError::InvalidTempo(bpm));
        }
        if bpm == self.config.tempo {
            return Ok(());
        }
        self.config.tempo = bpm;
        self.apply_timing_change();
        Ok(())
    }

    /// Override beats per measure and beat unit (normally taken from the time signature)
    pub fn set_meter(
        &mut self,
        beats_per_measure: u32,
        beat_unit: u32,
    ) -> Result<(), PlaybackError> {
        if beats_per_measure == 0 || beat_unit == 0 {
            return Err(PlaybackError::InvalidMeter {
                beats_per_measure,
                beat_unit,
            });
        }
        if beats_per_measure == self.config.beats_per_measure
            && beat_unit == self.config.beat_unit
        {
            return Ok(());
        }
        self.config.beats_per_measure = beats_per_measure;
        self.config.beat_unit = beat_unit;
        self.apply_timing_change();
        Ok(())
    }

    pub fn set_count_in(&mut self, measures: u32) {
        if measures == self.config.count_in {
            return;
        }
        self.config.count_in = measures;
        self.apply_timing_change();
    }

    /// Add or remove the metronome stream; the note schedule is unaffected
    pub fn set_metronome(&mut self, enabled: bool) {
        if enabled == self.config.metronome_enabled {
            return;
        }
        self.config.metronome_enabled = enabled;
        self.apply_timing_change();
    }

    /// Toggle looping over the whole exercise
    pub fn set_loop(&mut self, enabled: bool) {
        self.config.loop_enabled = enabled;
        match self.state {
            TransportState::Playing => {
                self.sync_loop();
                if enabled && self.partial {
                    // The next pass needs the events a previous resync skipped
                    self.resync();
                }
            }
            TransportState::Paused => {
                if enabled && self.partial {
                    self.needs_resync = true;
                }
            }
            TransportState::Stopped => {}
        }
        log::debug!("Loop {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Push the loop flag and window to the backend
    fn sync_loop(&mut self) {
        let loop_end = self.total_duration();
        self.backend.set_loop(self.config.loop_enabled, loop_end);
    }

    fn apply_timing_change(&mut self) {
        self.rebuild();
        match self.state {
            TransportState::Playing => self.resync(),
            TransportState::Paused => self.needs_resync = true,
            TransportState::Stopped => {}
        }
    }

    /// Re-derive the note and metronome schedules from the exercise and config
    fn rebuild(&mut self) {
        let Some(exercise) = &self.exercise else {
            self.events = Arc::from(Vec::new());
            self.beats = Arc::from(Vec::new());
            return;
        };

        self.events = Arc::from(schedule_exercise(exercise, &self.config));

        // Count-in clicks sound even with the metronome off
        let beats_until = if self.config.metronome_enabled {
            self.total_duration()
        } else {
            self.config.lead_in()
        };
        self.beats = Arc::from(schedule_metronome(
            self.config.beats_per_measure,
            self.config.tempo_bpm(),
            beats_until,
        ));
    }

    /// Cancel all registrations and register again from the current musical position.
    ///
    /// What still has to sound is decided on the timeline the old registrations were
    /// made on, so an event the clock had not reached is never dropped by rounding.
    fn resync(&mut self) {
        let position = self.backend.position();
        let from = self.registered.unwrap_or(self.config);
        let mut resume = map_position(position, &from, &self.config);

        // A looping backend replays earlier events on its next pass
        let (keep_notes, keep_beats) = if self.config.loop_enabled || self.registered.is_none() {
            (vec![true; self.events.len()], vec![true; self.beats.len()])
        } else {
            let keep_notes = self.unplayed_notes(position, &from);
            let keep_beats = self.unplayed_beats(position, &from);

            // The mapped position may land a rounding step after the first kept event
            let lead_in = self.config.lead_in();
            for (event, _) in self.events.iter().zip(&keep_notes).filter(|(_, keep)| **keep) {
                resume = resume.min(lead_in + event.start_time);
            }
            for (beat, _) in self.beats.iter().zip(&keep_beats).filter(|(_, keep)| **keep) {
                resume = resume.min(beat.time);
            }
            (keep_notes, keep_beats)
        };

        self.backend.cancel_all();
        self.backend.set_tempo(self.config.tempo);
        self.backend.seek(resume);
        self.sync_loop();
        self.register(&keep_notes, &keep_beats);
        self.needs_resync = false;

        log::debug!(
            "Resynced at {} BPM: position {:.3}s -> {:.3}s",
            self.config.tempo,
            position,
            resume
        );
    }

    /// Events of the current schedule whose registered counterpart had not fired by `position`
    fn unplayed_notes(&self, position: f64, from: &PlaybackConfig) -> Vec<bool> {
        let lead_in = from.lead_in();
        let pending: HashSet<&str> = self
            .registered_events
            .iter()
            .filter(|event| lead_in + event.start_time >= position)
            .map(|event| event.id.as_str())
            .collect();

        self.events
            .iter()
            .map(|event| pending.contains(event.id.as_str()))
            .collect()
    }

    /// Beats of the current stream whose slot on the old beat grid had not been reached.
    ///
    /// Beat `i` sits `i` quarter notes into the transport, so with an unchanged count-in
    /// this is the same `index * interval` the old stream was generated with.
    fn unplayed_beats(&self, position: f64, from: &PlaybackConfig) -> Vec<bool> {
        let interval = 60.0 / from.tempo_bpm();
        let offset = lead_in_beats(from) - lead_in_beats(&self.config);

        (0..self.beats.len())
            .map(|index| (index as f64 + offset) * interval >= position)
            .collect()
    }

    fn register_all(&mut self) {
        let keep_notes = vec![true; self.events.len()];
        let keep_beats = vec![true; self.beats.len()];
        self.register(&keep_notes, &keep_beats);
    }

    /// Register the sounded notes and metronome beats flagged in `keep_notes` / `keep_beats`
    fn register(&mut self, keep_notes: &[bool], keep_beats: &[bool]) {
        let instrument = self.backend.instrument();
        let lead_in = self.config.lead_in();
        let mut notes = 0usize;
        let mut skipped = 0usize;

        for ((index, event), keep) in self.events.iter().enumerate().zip(keep_notes) {
            if !keep {
                skipped += 1;
                continue;
            }
            if event.is_rest() {
                continue;
            }

            let instrument = Arc::clone(&instrument);
            let listener = self.listener.clone();
            let progress = Arc::clone(&self.progress);
            let pitches = event.pitch_names.clone();
            let id = event.id.clone();
            let length = event.duration * NOTE_LENGTH_RATIO;
            let bar_number = event.bar_number;

            self.backend.register_timed_callback(
                lead_in + event.start_time,
                Box::new(move |at| {
                    instrument.trigger(&pitches, length, at);
                    progress.record_note(index, bar_number);
                    if let Some(listener) = &listener {
                        listener.on_note(&id, index);
                    }
                }),
            );
            notes += 1;
        }

        let mut beats = 0usize;
        for (beat, keep) in self.beats.iter().zip(keep_beats) {
            if !keep {
                skipped += 1;
                continue;
            }
            let instrument = Arc::clone(&instrument);
            let listener = self.listener.clone();
            let progress = Arc::clone(&self.progress);
            let MetronomeBeat {
                beat_number,
                is_downbeat,
                ..
            } = *beat;

            self.backend.register_timed_callback(
                beat.time,
                Box::new(move |at| {
                    instrument.click(is_downbeat, at);
                    progress.record_beat(beat_number);
                    if let Some(listener) = &listener {
                        listener.on_beat(beat_number, is_downbeat);
                    }
                }),
            );
            beats += 1;
        }

        self.registered = Some(self.config);
        self.registered_events = Arc::clone(&self.events);
        self.partial = skipped > 0;
        log::debug!(
            "Registered {} notes and {} beats ({} already played)",
            notes,
            beats,
            skipped
        );
    }
}
