//! Pure tune-to-tune transforms.

use crate::event::{Tune, VectorNote};
use crate::stats::TuneStats;

/// Silences are shortened in units of one 4/4 measure.
pub const MEASURE_QUARTERS: f64 = 4.0;

/// Standard note lengths in quarter notes, whole down to sixteenth.
pub const DURATION_LADDER: [f64; 9] = [4.0, 3.0, 2.0, 1.5, 1.0, 0.75, 0.5, 0.375, 0.25];

/// Collapse each chord into one note with its highest pitch and longest duration.
pub fn monophonic(tune: &[VectorNote]) -> Tune {
    let mut out: Tune = Vec::with_capacity(tune.len());
    for note in tune {
        match out.last_mut() {
            Some(lead) if note.step == 0.0 => {
                lead.pitch = lead.pitch.max(note.pitch);
                lead.duration = lead.duration.max(note.duration);
            }
            _ => out.push(*note),
        }
    }
    out
}

/// Clamp durations, then stretch each note up to the next onset.
///
/// Gaps longer than the note are first shortened by whole measures while at
/// least a measure of silence remains.
pub fn contiguous(tune: &[VectorNote], min_duration: f64, max_duration: f64) -> Tune {
    let mut out: Tune = tune
        .iter()
        .map(|n| VectorNote { duration: n.duration.max(min_duration).min(max_duration), ..*n })
        .collect();
    if let Some(first) = out.first_mut() {
        first.step = 0.0;
    }
    for i in 1..out.len() {
        let gap = out[i].step;
        let duration = out[i - 1].duration;
        if gap > duration {
            let mut excess = gap - duration;
            while excess >= MEASURE_QUARTERS {
                out[i].step -= MEASURE_QUARTERS;
                excess -= MEASURE_QUARTERS;
            }
            out[i - 1].duration = out[i].step;
        }
    }
    out
}

/// Transpose so the tonic becomes C, choosing the register with more headroom.
pub fn transpose_to_c(tune: &[VectorNote]) -> Tune {
    let Ok(stats) = TuneStats::new(tune) else {
        return Vec::new();
    };
    if stats.tonic == 0 {
        return tune.to_vec();
    }
    let octave = if 127.0 - stats.min_pitch < stats.max_pitch { 12.0 } else { 0.0 };
    let shift = octave - f64::from(stats.tonic);
    tune.iter()
        .map(|n| VectorNote { pitch: wrap_pitch(n.pitch + shift), ..*n })
        .collect()
}

fn wrap_pitch(mut pitch: f64) -> f64 {
    while pitch < 0.0 {
        pitch += 12.0;
    }
    while pitch > 127.0 {
        pitch -= 12.0;
    }
    pitch
}

/// Snap a duration to the nearest ladder value, splitting at midpoints.
pub fn quantize_duration(duration: f64) -> f64 {
    for pair in DURATION_LADDER.windows(2) {
        if duration >= (pair[0] + pair[1]) / 2.0 {
            return pair[0];
        }
    }
    DURATION_LADDER[DURATION_LADDER.len() - 1]
}

pub fn quantize_durations(tune: &[VectorNote]) -> Tune {
    tune.iter()
        .map(|n| VectorNote { duration: quantize_duration(n.duration), ..*n })
        .collect()
}
