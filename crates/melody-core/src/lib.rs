//! Note codec: timed MIDI event tracks to `(pitch, duration, step)` tunes and back.
//!
//! Extraction runs [`collect`] → [`vector`] → [`transform`]; re-encoding runs
//! [`voice`] → [`emit`]. [`smf`] adapts both ends to Standard MIDI Files.

pub mod collect;
pub mod emit;
pub mod error;
pub mod event;
pub mod names;
pub mod smf;
pub mod stats;
pub mod transform;
pub mod vector;
pub mod voice;

pub use collect::{is_melodic, parse_track, ChannelFilter, NoteCollection, TrackNotes};
pub use emit::{emit_events, peak_voices, tune_to_events, EmittedEvent, EncodedTune, EndpointKind};
pub use error::{CodecError, Result};
pub use event::{MessageKind, NoteInterval, Tempo, TimedMessage, Tune, VectorNote, PERCUSSION_CHANNEL};
pub use names::{instrument_name, pitch_name};
pub use smf::{decode_smf, encode_smf, DecodedSmf};
pub use stats::TuneStats;
pub use vector::{vectorize, Vectorized};
pub use voice::{AllocatedNote, VoiceAllocator};
