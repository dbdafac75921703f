use serde::{Deserialize, Serialize};

/// Zero-based General MIDI percussion channel.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// 120 BPM.
pub const DEFAULT_MICROS_PER_QUARTER: u32 = 500_000;

/// Decoded message payloads the codec cares about; everything else is `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Tempo { micros_per_quarter: u32 },
    ProgramChange { channel: u8, program: u8 },
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
    Other,
}

/// One message of a track, `delta` ticks after the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedMessage {
    pub delta: u32,
    pub kind: MessageKind,
}

impl TimedMessage {
    pub fn new(delta: u32, kind: MessageKind) -> Self {
        Self { delta, kind }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tempo {
    pub micros_per_quarter: u32,
}

impl Tempo {
    pub fn from_bpm(bpm: f64) -> Self {
        let micros = (60_000_000.0 / bpm.max(1.0)).round() as u32;
        Self { micros_per_quarter: micros.max(1) }
    }

    /// Beats per minute, rounded to a multiple of 1/8192.
    pub fn bpm(&self) -> f64 {
        let raw = 60_000_000.0 / f64::from(self.micros_per_quarter.max(1));
        (raw * 8192.0).round() / 8192.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { micros_per_quarter: DEFAULT_MICROS_PER_QUARTER }
    }
}

/// A closed note: note-on at `tick`, lasting `duration` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInterval {
    pub track: usize,
    pub channel: u8,
    pub tick: u32,
    pub pitch: u8,
    pub velocity: u8,
    pub program: u8,
    pub duration: u32,
}

impl NoteInterval {
    pub fn quarter_length(&self, ticks_per_quarter: u16) -> f64 {
        f64::from(self.duration) / f64::from(ticks_per_quarter)
    }
}

/// One note of a tune, all times in quarter notes.
///
/// `step` is the distance from the previous note's onset; serialized as a
/// `[pitch, duration, step]` triple.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct VectorNote {
    pub pitch: f64,
    pub duration: f64,
    pub step: f64,
}

impl VectorNote {
    pub fn new(pitch: f64, duration: f64, step: f64) -> Self {
        Self { pitch, duration, step }
    }
}

impl From<[f64; 3]> for VectorNote {
    fn from([pitch, duration, step]: [f64; 3]) -> Self {
        Self { pitch, duration, step }
    }
}

impl From<VectorNote> for [f64; 3] {
    fn from(n: VectorNote) -> Self {
        [n.pitch, n.duration, n.step]
    }
}

pub type Tune = Vec<VectorNote>;
