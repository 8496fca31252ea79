//! Metronome beat generation
//!
//! Produces a click stream independent of the notes. Turning the metronome on or off
//! never changes the note schedule; it only adds or drops this stream.

use super::types::MetronomeBeat;

/// Generate beats every `60 / tempo_bpm` seconds over `[0, total_duration)`.
///
/// Beat times are computed as `index * interval` so long exercises do not drift.
///
/// # Example
/// ```rust
/// use etude::schedule_metronome;
///
/// let beats = schedule_metronome(3, 120.0, 3.0);
/// let times: Vec<f64> = beats.iter().map(|b| b.time).collect();
/// assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
/// assert!(beats[3].is_downbeat);
/// ```
pub fn schedule_metronome(
    beats_per_measure: u32,
    tempo_bpm: f64,
    total_duration: f64,
) -> Vec<MetronomeBeat> {
    if beats_per_measure == 0 || tempo_bpm <= 0.0 || total_duration <= 0.0 {
        return Vec::new();
    }

    let interval = 60.0 / tempo_bpm;
    let mut beats = Vec::new();
    let mut index: u64 = 0;

    loop {
        let time = index as f64 * interval;
        if time >= total_duration {
            break;
        }
        let beat_number = (index % beats_per_measure as u64) as u32;
        beats.push(MetronomeBeat {
            time,
            beat_number,
            is_downbeat: beat_number == 0,
        });
        index += 1;
    }

    beats
}
