//! Note extraction: pair note-on/note-off messages of each track into
//! [`NoteInterval`]s and gather them per file.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::event::{MessageKind, NoteInterval, Tempo, TimedMessage, PERCUSSION_CHANNEL};

/// Programs 112..120 are the General MIDI percussive instruments.
const PERCUSSIVE_PROGRAMS: std::ops::Range<u8> = 112..120;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackNotes {
    pub notes: Vec<NoteInterval>,
    /// First tempo seen before the track's first note.
    pub tempo: Option<Tempo>,
}

/// Parse one track into closed note intervals.
///
/// The open-note table has a single slot per (channel, pitch): a second
/// note-on for a sounding key replaces the slot, so the earlier note never
/// closes and is dropped along with any other unterminated or zero-length note.
pub fn parse_track(track: usize, messages: &[TimedMessage]) -> TrackNotes {
    let mut programs = [0u8; 16];
    let mut open: HashMap<(u8, u8), usize> = HashMap::new();
    let mut notes: Vec<NoteInterval> = Vec::new();
    let mut tempo = None;
    let mut tick: u32 = 0;

    for msg in messages {
        tick = tick.saturating_add(msg.delta);
        match msg.kind {
            MessageKind::Tempo { micros_per_quarter } => {
                if notes.is_empty() && tempo.is_none() {
                    tempo = Some(Tempo { micros_per_quarter });
                }
            }
            MessageKind::ProgramChange { channel, program } => {
                programs[usize::from(channel & 0x0f)] = program;
            }
            MessageKind::NoteOn { channel, pitch, velocity } if velocity > 0 => {
                open.insert((channel, pitch), notes.len());
                notes.push(NoteInterval {
                    track,
                    channel,
                    tick,
                    pitch,
                    velocity,
                    program: programs[usize::from(channel & 0x0f)],
                    duration: 0,
                });
            }
            MessageKind::NoteOn { channel, pitch, .. } | MessageKind::NoteOff { channel, pitch, .. } => {
                if let Some(idx) = open.remove(&(channel, pitch)) {
                    let note = &mut notes[idx];
                    note.duration = tick - note.tick;
                }
            }
            MessageKind::Other => {}
        }
    }

    notes.retain(|n| n.duration > 0);
    TrackNotes { notes, tempo }
}

/// Notes gathered from all tracks of one file.
#[derive(Clone, Debug)]
pub struct NoteCollection {
    pub ticks_per_quarter: u16,
    pub tempo: Option<Tempo>,
    pub notes: Vec<NoteInterval>,
}

impl NoteCollection {
    pub fn new(ticks_per_quarter: u16) -> Self {
        Self { ticks_per_quarter, tempo: None, notes: Vec::new() }
    }

    /// Parse and append a track. The tempo is only taken while the
    /// collection holds no notes yet, and never replaced once set.
    pub fn collect_track(&mut self, track: usize, messages: &[TimedMessage]) {
        let parsed = parse_track(track, messages);
        if self.tempo.is_none() && self.notes.is_empty() {
            self.tempo = parsed.tempo;
        }
        self.notes.extend(parsed.notes);
    }

    pub fn tempo_or_default(&self) -> Tempo {
        self.tempo.unwrap_or_default()
    }

    pub fn filter_notes(&mut self, pred: impl FnMut(&NoteInterval) -> bool) {
        self.notes.retain(pred);
    }

    /// Drop notes repeating an earlier (tick, pitch, duration); returns how many went.
    pub fn deduplicate(&mut self) -> usize {
        let mut seen = HashSet::new();
        let before = self.notes.len();
        self.notes.retain(|n| seen.insert((n.tick, n.pitch, n.duration)));
        let removed = before - self.notes.len();
        if removed > 0 {
            tracing::debug!(removed, "deduplicated notes");
        }
        removed
    }
}

/// Everything except the percussion channel and percussive programs.
pub fn is_melodic(note: &NoteInterval) -> bool {
    note.channel != PERCUSSION_CHANNEL && !PERCUSSIVE_PROGRAMS.contains(&note.program)
}

/// Channel selection by 1-based channel number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFilter {
    /// When non-empty, only these channels pass.
    pub include: BTreeSet<u8>,
    pub exclude: BTreeSet<u8>,
}

impl ChannelFilter {
    pub fn accepts(&self, note: &NoteInterval) -> bool {
        let ch = note.channel + 1;
        if !self.include.is_empty() && !self.include.contains(&ch) {
            return false;
        }
        !self.exclude.contains(&ch)
    }
}
