use std::cmp::Reverse;

use crate::error::{CodecError, Result};
use crate::event::{NoteInterval, Tune, VectorNote};

#[derive(Clone, Debug, PartialEq)]
pub struct Vectorized {
    pub tune: Tune,
    /// Notes opening a new onset. The first note of the tune always counts
    /// here, even at tick 0.
    pub melodic_notes: usize,
    /// Further notes sharing an onset with the previous note.
    pub chord_notes: usize,
    /// Lowest and highest pitch, `None` for an empty tune.
    pub pitch_range: Option<(u8, u8)>,
}

/// Order notes by tick, then pitch, channel, longest first, then track.
pub fn sort_notes(notes: &mut [NoteInterval]) {
    notes.sort_by_key(|n| (n.tick, n.pitch, n.channel, Reverse(n.duration), n.track));
}

/// Convert note intervals into a tune of quarter-note triples.
pub fn vectorize(notes: &[NoteInterval], ticks_per_quarter: u16) -> Result<Vectorized> {
    if ticks_per_quarter == 0 {
        return Err(CodecError::ZeroTicksPerQuarter);
    }
    let tpq = f64::from(ticks_per_quarter);
    let mut sorted = notes.to_vec();
    sort_notes(&mut sorted);

    let mut tune = Vec::with_capacity(sorted.len());
    let (mut melodic_notes, mut chord_notes) = (0, 0);
    let mut pitch_range: Option<(u8, u8)> = None;
    let mut last_tick = 0;

    for (i, note) in sorted.iter().enumerate() {
        let step = note.tick - last_tick;
        if i == 0 || step != 0 {
            melodic_notes += 1;
        } else {
            chord_notes += 1;
        }
        tune.push(VectorNote::new(
            f64::from(note.pitch),
            note.quarter_length(ticks_per_quarter),
            f64::from(step) / tpq,
        ));
        pitch_range = Some(match pitch_range {
            Some((lo, hi)) => (lo.min(note.pitch), hi.max(note.pitch)),
            None => (note.pitch, note.pitch),
        });
        last_tick = note.tick;
    }

    tracing::debug!(notes = tune.len(), melodic_notes, chord_notes, "vectorized notes");
    Ok(Vectorized { tune, melodic_notes, chord_notes, pitch_range })
}
