use std::sync::{Arc, Mutex};

use super::*;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::exercise::{Exercise, Note, TimeSignature};

fn quarters(keys: &[&str]) -> Vec<Note> {
    keys.iter().map(|k| Note::with_code([*k], "q")).collect()
}

fn two_bars(tempo: u32) -> Exercise {
    let mut exercise = Exercise::new("ex", TimeSignature::new(4, 4), tempo);
    exercise.push_bar(quarters(&["c/4", "d/4", "e/4", "f/4"]));
    exercise.push_bar(quarters(&["g/4", "f/4", "e/4", "d/4"]));
    exercise
}

fn loaded(exercise: Exercise) -> PlaybackController<SimulatedBackend> {
    let mut controller = PlaybackController::new(SimulatedBackend::new());
    controller.load(exercise);
    controller
}

/// First pitch of every note the instrument played
fn played(controller: &PlaybackController<SimulatedBackend>) -> Vec<String> {
    controller
        .backend()
        .recorder()
        .notes()
        .into_iter()
        .filter_map(|pitches| pitches.into_iter().next())
        .collect()
}

#[derive(Default)]
struct Highlights {
    notes: Mutex<Vec<(String, usize)>>,
    beats: Mutex<Vec<(u32, bool)>>,
}

impl PlaybackListener for Highlights {
    fn on_note(&self, event_id: &str, event_index: usize) {
        self.notes.lock().unwrap().push((event_id.to_string(), event_index));
    }

    fn on_beat(&self, beat_number: u32, is_downbeat: bool) {
        self.beats.lock().unwrap().push((beat_number, is_downbeat));
    }
}

#[test]
fn test_initial_state() {
    let controller = PlaybackController::new(SimulatedBackend::new());
    assert_eq!(controller.state(), TransportState::Stopped);
    assert!(controller.state().is_stopped());
    assert!(controller.exercise().is_none());
    assert!(controller.scheduled_events().is_empty());
    assert_eq!(controller.total_duration(), 0.0);
    assert_eq!(controller.config(), PlaybackConfig::default());
}

#[test]
fn test_play_without_exercise() {
    let mut controller = PlaybackController::new(SimulatedBackend::new());
    assert_eq!(controller.play(), Err(PlaybackError::NoExercise));
    assert_eq!(controller.state(), TransportState::Stopped);
}

#[test]
fn test_play_requires_ready_backend() {
    let mut controller = PlaybackController::new(SimulatedBackend::uninitialized());
    controller.load(two_bars(80));

    assert!(!controller.is_ready());
    assert_eq!(controller.play(), Err(PlaybackError::BackendNotReady));
    assert_eq!(controller.state(), TransportState::Stopped);
    assert_eq!(controller.backend().pending(), 0);
    assert!(!controller.backend().is_running());

    controller.initialize().unwrap();
    assert!(controller.play().is_ok());
    assert_eq!(controller.state(), TransportState::Playing);
}

#[test]
fn test_load_builds_schedule_while_stopped() {
    let controller = loaded(two_bars(80));
    assert_eq!(controller.state(), TransportState::Stopped);
    assert_eq!(controller.scheduled_events().len(), 8);
    assert_eq!(controller.total_duration(), 6.0);
    assert_eq!(controller.config().tempo, 80);
    assert_eq!(controller.backend().pending(), 0);
}

#[test]
fn test_state_transitions() {
    let mut controller = loaded(two_bars(80));

    controller.pause();
    assert_eq!(controller.state(), TransportState::Stopped);

    controller.play().unwrap();
    assert_eq!(controller.state(), TransportState::Playing);
    assert!(controller.backend().is_running());
    assert_eq!(controller.backend().tempo(), 80);
    assert_eq!(controller.backend().pending(), 8);

    // Already playing: nothing registered twice
    controller.play().unwrap();
    assert_eq!(controller.backend().pending(), 8);

    controller.backend_mut().advance(1.0);
    controller.pause();
    assert_eq!(controller.state(), TransportState::Paused);
    assert!(!controller.backend().is_running());
    controller.pause();
    assert_eq!(controller.state(), TransportState::Paused);

    controller.play().unwrap();
    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(controller.position(), 1.0);

    controller.stop();
    assert_eq!(controller.state(), TransportState::Stopped);
    assert_eq!(controller.position(), 0.0);
    assert_eq!(controller.backend().pending(), 0);
    controller.stop();
    assert_eq!(controller.state(), TransportState::Stopped);
}

#[test]
fn test_stop_from_paused() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(2.0);
    controller.pause();
    controller.stop();

    assert_eq!(controller.state(), TransportState::Stopped);
    assert_eq!(controller.position(), 0.0);
    assert_eq!(controller.backend().pending(), 0);
}

#[test]
fn test_toggle_play() {
    let mut controller = loaded(two_bars(80));
    controller.toggle_play().unwrap();
    assert!(controller.state().is_playing());
    controller.toggle_play().unwrap();
    assert_eq!(controller.state(), TransportState::Paused);
    controller.toggle_play().unwrap();
    assert!(controller.state().is_playing());
}

#[test]
fn test_notes_fire_in_order() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(3.0);

    assert_eq!(played(&controller), vec!["C4", "D4", "E4", "F4"]);

    let sounds = controller.backend().recorder().sounds();
    match &sounds[1] {
        Sound::Note { duration, time, .. } => {
            assert!((duration - 0.75 * NOTE_LENGTH_RATIO).abs() < 1e-12);
            assert_eq!(*time, 0.75);
        }
        other => panic!("expected a note, got {:?}", other),
    }
}

#[test]
fn test_replay_after_stop_starts_over() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(1.0);
    controller.stop();
    controller.play().unwrap();
    controller.backend_mut().advance(1.0);

    assert_eq!(played(&controller), vec!["C4", "D4", "C4", "D4"]);
}

#[test]
fn test_rests_are_silent_but_counted() {
    let mut exercise = Exercise::new("r", TimeSignature::new(4, 4), 80);
    exercise.push_bar(vec![
        Note::with_code(["c/4"], "q"),
        Note::with_code(["d/4"], "qr"),
        Note::with_code(["e/4"], "q"),
        Note::with_code(["f/4"], "q"),
    ]);
    let highlights = Arc::new(Highlights::default());
    let mut controller = PlaybackController::new(SimulatedBackend::new());
    controller.set_listener(highlights.clone());
    controller.load(exercise);
    controller.play().unwrap();

    assert_eq!(controller.backend().pending(), 3);
    controller.backend_mut().advance(3.0);

    assert_eq!(played(&controller), vec!["C4", "E4", "F4"]);
    let notes = highlights.notes.lock().unwrap().clone();
    assert_eq!(
        notes,
        vec![
            ("r-bar1-treble-note0".to_string(), 0),
            ("r-bar1-treble-note2".to_string(), 2),
            ("r-bar1-treble-note3".to_string(), 3),
        ]
    );
    assert_eq!(controller.progress().note_index(), Some(3));
}

#[test]
fn test_tempo_change_while_playing() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(1.5);
    assert_eq!(played(&controller), vec!["C4", "D4"]);

    controller.set_tempo(160).unwrap();
    assert_eq!(controller.state(), TransportState::Playing);
    assert_eq!(controller.backend().tempo(), 160);
    // Half a bar in at either tempo
    assert_eq!(controller.position(), 0.75);
    assert_eq!(controller.backend().pending(), 6);
    assert_eq!(controller.scheduled_events()[1].start_time, 0.375);
    assert_eq!(controller.total_duration(), 3.0);

    controller.backend_mut().advance(3.0);
    assert_eq!(
        played(&controller),
        vec!["C4", "D4", "E4", "F4", "G4", "F4", "E4", "D4"]
    );
}

#[test]
fn test_tempo_change_keeps_musical_position_after_count_in() {
    let config = PlaybackConfig {
        count_in: 1,
        ..PlaybackConfig::default()
    };
    let mut controller = PlaybackController::with_config(SimulatedBackend::new(), config);
    controller.load(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(4.5);

    controller.set_tempo(160).unwrap();
    // 1.5s into the music at 80 BPM is half a bar; at 160 BPM that is 1.5 + 0.75
    assert_eq!(controller.position(), 2.25);

    controller.backend_mut().advance(10.0);
    assert_eq!(played(&controller).len(), 8);
}

#[test]
fn test_tempo_change_while_paused_applies_on_resume() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(1.5);
    controller.pause();

    controller.set_tempo(160).unwrap();
    assert_eq!(controller.state(), TransportState::Paused);
    assert_eq!(controller.config().tempo, 160);
    assert_eq!(controller.scheduled_events()[1].start_time, 0.375);
    // The backend is untouched until playback resumes
    assert_eq!(controller.backend().tempo(), 80);
    assert_eq!(controller.position(), 1.5);

    controller.play().unwrap();
    assert_eq!(controller.backend().tempo(), 160);
    assert_eq!(controller.position(), 0.75);

    controller.backend_mut().advance(3.0);
    assert_eq!(played(&controller).len(), 8);
}

#[test]
fn test_tempo_change_while_stopped() {
    let mut controller = loaded(two_bars(80));
    controller.set_tempo(120).unwrap();

    assert_eq!(controller.config().tempo, 120);
    assert_eq!(controller.scheduled_events()[1].start_time, 0.5);
    assert_eq!(controller.backend().pending(), 0);
    assert_eq!(controller.state(), TransportState::Stopped);
}

#[test]
fn test_invalid_tempo_and_meter() {
    let mut controller = loaded(two_bars(80));
    assert_eq!(controller.set_tempo(0), Err(PlaybackError::InvalidTempo(0)));
    assert_eq!(controller.config().tempo, 80);

    assert_eq!(
        controller.set_meter(0, 4),
        Err(PlaybackError::InvalidMeter {
            beats_per_measure: 0,
            beat_unit: 4
        })
    );
    assert_eq!(controller.config().beats_per_measure, 4);
}

#[test]
fn test_meter_override() {
    let mut controller = loaded(two_bars(80));
    controller.set_meter(3, 4).unwrap();

    assert_eq!(controller.scheduled_events()[4].start_time, 2.25);
    assert_eq!(controller.total_duration(), 4.5);
}

#[test]
fn test_snapshot_outlives_rebuild() {
    let mut controller = loaded(two_bars(80));
    let before = controller.scheduled_events();
    controller.set_tempo(160).unwrap();

    assert_eq!(before[1].start_time, 0.75);
    assert_eq!(controller.scheduled_events()[1].start_time, 0.375);
}

#[test]
fn test_load_while_playing_stops_first() {
    let mut controller = loaded(two_bars(80));
    controller.set_loop(true);
    controller.play().unwrap();
    controller.backend_mut().advance(1.0);

    let mut next = Exercise::new("next", TimeSignature::new(3, 4), 120);
    next.push_bar(quarters(&["a/4", "b/4", "c/5"]));
    controller.load(next);

    assert_eq!(controller.state(), TransportState::Stopped);
    assert_eq!(controller.position(), 0.0);
    assert_eq!(controller.backend().pending(), 0);
    assert_eq!(controller.progress().note_index(), None);
    assert_eq!(controller.config().tempo, 120);
    assert_eq!(controller.config().beats_per_measure, 3);
    assert!(controller.config().loop_enabled);
    assert_eq!(controller.exercise().map(|e| e.id.as_str()), Some("next"));

    controller.play().unwrap();
    controller.backend_mut().advance(1.0);
    assert_eq!(played(&controller), vec!["C4", "D4", "A4", "B4"]);
}

#[test]
fn test_load_while_paused_stops_first() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(1.0);
    controller.pause();
    controller.load(two_bars(100));

    assert_eq!(controller.state(), TransportState::Stopped);
    assert_eq!(controller.position(), 0.0);
    assert_eq!(controller.config().tempo, 100);
}

#[test]
fn test_loop_window_and_refire() {
    let mut controller = loaded(two_bars(80));
    controller.set_loop(true);
    assert_eq!(controller.backend().loop_window(), None);

    controller.play().unwrap();
    assert_eq!(controller.backend().loop_window(), Some(6.0));

    controller.backend_mut().advance(6.5);
    let notes = played(&controller);
    assert_eq!(notes.len(), 9);
    assert_eq!(notes[8], "C4");
}

#[test]
fn test_set_loop_while_playing() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    assert_eq!(controller.backend().loop_window(), None);

    controller.set_loop(true);
    assert_eq!(controller.backend().loop_window(), Some(6.0));
    controller.set_loop(false);
    assert_eq!(controller.backend().loop_window(), None);
}

#[test]
fn test_resync_with_loop_registers_everything() {
    let mut controller = loaded(two_bars(80));
    controller.set_loop(true);
    controller.play().unwrap();
    controller.backend_mut().advance(1.5);

    controller.set_tempo(160).unwrap();
    assert_eq!(controller.backend().pending(), 8);
    assert_eq!(controller.backend().loop_window(), Some(3.0));
}

#[test]
fn test_enabling_loop_after_partial_resync() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(1.5);
    controller.set_tempo(160).unwrap();
    assert_eq!(controller.backend().pending(), 6);

    controller.set_loop(true);
    assert_eq!(controller.backend().pending(), 8);

    controller.backend_mut().advance(2.75);
    // E4 F4 G4 F4 E4 D4, wrap, C4 D4
    assert_eq!(played(&controller).len(), 10);
}

#[test]
fn test_metronome_clicks() {
    let mut exercise = Exercise::new("m", TimeSignature::new(4, 4), 80);
    exercise.push_bar(quarters(&["c/4"]));
    let highlights = Arc::new(Highlights::default());
    let mut controller = PlaybackController::new(SimulatedBackend::new());
    controller.set_listener(highlights.clone());
    controller.set_metronome(true);
    controller.load(exercise);

    assert_eq!(controller.metronome_beats().len(), 4);
    controller.play().unwrap();
    controller.backend_mut().advance(3.0);

    assert_eq!(
        controller.backend().recorder().clicks(),
        vec![(true, 0.0), (false, 0.75), (false, 1.5), (false, 2.25)]
    );
    assert_eq!(
        *highlights.beats.lock().unwrap(),
        vec![(0, true), (1, false), (2, false), (3, false)]
    );
    assert_eq!(controller.progress().beats_played(), 4);
    assert_eq!(controller.progress().beat(), 3);
}

#[test]
fn test_metronome_toggle_while_playing() {
    let mut controller = loaded(two_bars(80));
    controller.play().unwrap();
    controller.backend_mut().advance(1.0);
    assert!(controller.metronome_beats().is_empty());

    controller.set_metronome(true);
    assert_eq!(controller.position(), 1.0);
    assert_eq!(controller.metronome_beats().len(), 8);
    // Six notes and six beats remain after 1.0s
    assert_eq!(controller.backend().pending(), 12);

    controller.backend_mut().advance(5.0);
    let clicks = controller.backend().recorder().clicks();
    assert_eq!(clicks.len(), 6);
    assert_eq!(clicks[0], (false, 1.5));
    assert_eq!(clicks[2], (true, 3.0));
    assert_eq!(played(&controller).len(), 8);

    controller.set_metronome(false);
    assert!(controller.metronome_beats().is_empty());
}

#[test]
fn test_count_in() {
    let mut exercise = Exercise::new("c", TimeSignature::new(4, 4), 80);
    exercise.push_bar(quarters(&["c/4", "d/4", "e/4", "f/4"]));
    let mut controller = PlaybackController::new(SimulatedBackend::new());
    controller.set_count_in(1);
    controller.load(exercise);

    assert_eq!(controller.config().lead_in(), 3.0);
    assert_eq!(controller.total_duration(), 6.0);
    // Count-in clicks only, the metronome is off
    assert_eq!(controller.metronome_beats().len(), 4);
    // Note times stay relative to the first bar
    assert_eq!(controller.scheduled_events()[0].start_time, 0.0);

    controller.play().unwrap();
    controller.backend_mut().advance(3.0);
    assert_eq!(controller.backend().recorder().clicks().len(), 4);
    assert!(played(&controller).is_empty());

    controller.backend_mut().advance(3.0);
    assert_eq!(played(&controller), vec!["C4", "D4", "E4", "F4"]);
    let first_note = controller.backend().recorder().sounds()[4].time();
    assert_eq!(first_note, 3.0);
}

#[test]
fn test_count_in_loop_window() {
    let config = PlaybackConfig {
        count_in: 2,
        loop_enabled: true,
        ..PlaybackConfig::default()
    };
    let mut controller = PlaybackController::with_config(SimulatedBackend::new(), config);
    controller.load(two_bars(120));
    controller.play().unwrap();

    assert_eq!(controller.backend().loop_window(), Some(8.0));
}

#[test]
fn test_progress_tracks_measure() {
    let mut controller = loaded(two_bars(80));
    let progress = controller.progress();
    controller.play().unwrap();
    controller.backend_mut().advance(3.5);

    assert_eq!(progress.note_index(), Some(4));
    assert_eq!(progress.measure(), 2);

    controller.stop();
    assert_eq!(progress.note_index(), None);
    assert_eq!(progress.measure(), 1);
}

fn dotted_rhythms(bars: usize) -> Exercise {
    let mut exercise = Exercise::new("dr", TimeSignature::new(4, 4), 80);
    for _ in 0..bars {
        exercise.push_bar(
            [("c/4", "8"), ("d/4", "qd"), ("e/4", "16"), ("f/4", "q"), ("g/4", "8"), ("a/4", "16")]
                .iter()
                .map(|(key, code)| Note::with_code([*key], code))
                .collect(),
        );
    }
    exercise
}

#[test]
fn test_tempo_change_on_a_note_start_loses_nothing() {
    let starts: Vec<f64> = loaded(dotted_rhythms(4))
        .scheduled_events()
        .iter()
        .map(|e| e.start_time)
        .collect();
    assert_eq!(starts.len(), 24);

    for bpm in [47, 61, 70, 73, 97, 111, 133, 157, 199, 213] {
        for &start in &starts {
            let mut controller = loaded(dotted_rhythms(4));
            controller.set_metronome(true);
            controller.play().unwrap();
            // The note at `start` is due but has not fired yet
            controller.backend_mut().advance_to(start);
            controller.set_tempo(bpm).unwrap();
            controller.backend_mut().advance(60.0);

            assert_eq!(played(&controller).len(), 24, "{} BPM at {}s", bpm, start);
            assert_eq!(
                controller.backend().recorder().clicks().len(),
                16,
                "{} BPM at {}s",
                bpm,
                start
            );
        }
    }
}

#[test]
fn test_paused_tempo_change_on_a_note_start_loses_nothing() {
    let start = loaded(dotted_rhythms(2)).scheduled_events()[7].start_time;
    let mut controller = loaded(dotted_rhythms(2));
    controller.play().unwrap();
    controller.backend_mut().advance_to(start);
    controller.pause();
    controller.set_tempo(97).unwrap();
    controller.play().unwrap();
    controller.backend_mut().advance(60.0);

    let notes = played(&controller);
    assert_eq!(notes.len(), 12);
    assert_eq!(notes[7], "D4");
}

#[test]
fn test_registration_times_include_count_in() {
    let mut exercise = Exercise::new("t", TimeSignature::new(4, 4), 80);
    exercise.push_bar(quarters(&["c/4", "d/4", "e/4", "f/4"]));
    let mut controller = PlaybackController::new(SimulatedBackend::new());
    controller.set_count_in(1);
    controller.load(exercise);
    controller.play().unwrap();

    assert_eq!(
        controller.backend().registered_times(),
        vec![3.0, 3.75, 4.5, 5.25, 0.0, 0.75, 1.5, 2.25]
    );
}

#[test]
fn test_clear_listener() {
    let highlights = Arc::new(Highlights::default());
    let mut controller = loaded(two_bars(80));
    controller.set_listener(highlights.clone());
    controller.clear_listener();
    controller.play().unwrap();
    controller.backend_mut().advance(6.0);

    assert_eq!(played(&controller).len(), 8);
    assert!(highlights.notes.lock().unwrap().is_empty());
}
