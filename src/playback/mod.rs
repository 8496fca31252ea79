//! # Playback Module
//!
//! Turns an [`Exercise`](crate::Exercise) into timed events for audio playback and
//! visual highlighting.
//!
//! ## Sub-modules
//! - `types` - ScheduledEvent, MetronomeBeat type definitions
//! - `scheduler` - Note expansion and exercise length
//! - `metronome` - Click stream generation
//!
//! ## Timing Model
//!
//! All times are seconds from the schedule origin and are derived, never measured:
//! - Bar `k` (0-indexed) starts at `k * bar_duration`
//! - Within a bar, each voice advances by each note's length
//! - Rebuilding with the same exercise and config gives identical output
//!
//! A tempo change rebuilds the whole list; events are never patched in place.
//!
//! ## Example
//! ```rust
//! use etude::playback::{schedule_exercise, exercise_duration};
//! use etude::{Exercise, Note, PlaybackConfig, TimeSignature};
//!
//! let mut exercise = Exercise::new("demo", TimeSignature::new(3, 4), 120);
//! exercise.push_bar(vec![Note::with_code(["g/4"], "hd")]);
//! exercise.push_bar(vec![
//!     Note::with_code(["e/4"], "q"),
//!     Note::with_code(Vec::<String>::new(), "hr"),
//! ]);
//!
//! let config = PlaybackConfig::for_exercise(&exercise);
//! let events = schedule_exercise(&exercise, &config);
//!
//! assert_eq!(events.len(), 3);
//! assert_eq!(events[1].start_time, 1.5);
//! assert!(events[2].is_rest());
//! assert_eq!(exercise_duration(&exercise, 120.0), 3.0);
//! ```

mod metronome;
mod scheduler;
mod types;


pub use metronome::schedule_metronome;
pub use scheduler::{exercise_duration, schedule_duration, schedule_exercise};
pub use types::{MetronomeBeat, ScheduledEvent};
