//! Note scheduling
//!
//! Expands an exercise into a flat, time-ordered list of [`ScheduledEvent`]s.
//!
//! Bars start at multiples of the nominal bar length, whatever their contents add up
//! to: a bar with too few notes leaves a gap and a bar with too many overlaps the next.
//! Within a bar each voice runs its own clock from the bar start, so grand-staff voices
//! sound together.

use crate::config::PlaybackConfig;
use crate::exercise::{Exercise, Note, Voice};
use crate::pitch::resolve_keys;
use crate::timing::bar_duration_seconds;

use super::types::ScheduledEvent;

/// Schedule one voice of one bar starting at `bar_start`
fn schedule_voice(
    notes: &[Note],
    exercise_id: &str,
    bar_number: u32,
    voice: Voice,
    bar_start: f64,
    config: &PlaybackConfig,
    events: &mut Vec<ScheduledEvent>,
) {
    let mut current_time = bar_start;

    for (note_index, note) in notes.iter().enumerate() {
        let duration = note
            .duration
            .seconds(config.tempo_bpm(), config.beat_unit);

        let pitches = if note.is_rest() {
            Vec::new()
        } else {
            resolve_keys(&note.keys)
        };

        events.push(ScheduledEvent {
            id: format!(
                "{}-bar{}-{}-note{}",
                exercise_id,
                bar_number,
                voice.as_str(),
                note_index
            ),
            note: note.clone(),
            bar_number,
            note_index,
            start_time: current_time,
            duration,
            midi_pitches: pitches.iter().map(|p| p.midi()).collect(),
            pitch_names: pitches.iter().map(|p| p.name()).collect(),
            voice,
        });

        current_time += duration;
    }
}

/// Expand an exercise into scheduled events using the config's tempo and meter.
///
/// The result is a pure function of its inputs. Events are sorted by start time with a
/// stable sort, so simultaneous events keep bar, voice (treble first) and index order.
///
/// # Example
/// ```rust
/// use etude::{schedule_exercise, Exercise, Note, PlaybackConfig, TimeSignature};
///
/// let mut exercise = Exercise::new("demo", TimeSignature::new(4, 4), 80);
/// exercise.push_bar(vec![
///     Note::with_code(["c/4"], "q"),
///     Note::with_code(["d/4"], "q"),
///     Note::with_code(["e/4"], "q"),
///     Note::with_code(["f/4"], "q"),
/// ]);
///
/// let events = schedule_exercise(&exercise, &PlaybackConfig::for_exercise(&exercise));
/// let starts: Vec<f64> = events.iter().map(|e| e.start_time).collect();
/// assert_eq!(starts, vec![0.0, 0.75, 1.5, 2.25]);
/// ```
pub fn schedule_exercise(exercise: &Exercise, config: &PlaybackConfig) -> Vec<ScheduledEvent> {
    let bar_duration = config.bar_duration();
    let mut events = Vec::new();

    for (bar_index, bar) in exercise.bars.iter().enumerate() {
        // Multiply rather than accumulate so bar k always starts at exactly k * bar_duration
        let bar_start = bar_index as f64 * bar_duration;

        schedule_voice(
            &bar.notes,
            &exercise.id,
            bar.number,
            Voice::Treble,
            bar_start,
            config,
            &mut events,
        );

        if exercise.grand_staff && !bar.bass_notes.is_empty() {
            schedule_voice(
                &bar.bass_notes,
                &exercise.id,
                bar.number,
                Voice::Bass,
                bar_start,
                config,
                &mut events,
            );
        }
    }

    events.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    log::debug!(
        "Scheduled {} events over {} bars at {} BPM",
        events.len(),
        exercise.bars.len(),
        config.tempo
    );

    events
}

/// Total length of the exercise at `tempo_bpm`, using the exercise's own time signature.
///
/// Equals the start time of a virtual bar after the last one.
pub fn exercise_duration(exercise: &Exercise, tempo_bpm: f64) -> f64 {
    let time_signature = exercise.time_signature;
    exercise.bars.len() as f64
        * bar_duration_seconds(time_signature.beats, time_signature.beat_type, tempo_bpm)
}

/// Total length of the exercise under a config (which may override the meter)
pub fn schedule_duration(exercise: &Exercise, config: &PlaybackConfig) -> f64 {
    exercise.bars.len() as f64 * config.bar_duration()
}
