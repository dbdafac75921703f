use serde::Serialize;

use crate::error::{CodecError, Result};
use crate::event::VectorNote;

/// Summary of a non-empty tune.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TuneStats {
    pub min_pitch: f64,
    pub max_pitch: f64,
    pub average_pitch: f64,
    /// Occurrences per MIDI pitch.
    pub pitch_histogram: Vec<usize>,
    /// Occurrences per pitch class, C = 0.
    pub semitone_histogram: [usize; 12],
    /// Most frequent pitch class; the lowest class wins ties.
    pub tonic: u8,
}

impl TuneStats {
    pub fn new(tune: &[VectorNote]) -> Result<Self> {
        if tune.is_empty() {
            return Err(CodecError::EmptyTune);
        }
        let mut min_pitch = f64::INFINITY;
        let mut max_pitch = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut pitch_histogram = vec![0usize; 128];
        let mut semitone_histogram = [0usize; 12];

        for note in tune {
            min_pitch = min_pitch.min(note.pitch);
            max_pitch = max_pitch.max(note.pitch);
            sum += note.pitch;
            let key = note.pitch.round() as i64;
            pitch_histogram[key.clamp(0, 127) as usize] += 1;
            semitone_histogram[key.rem_euclid(12) as usize] += 1;
        }

        let mut tonic = 0;
        for (class, &count) in semitone_histogram.iter().enumerate() {
            if count > semitone_histogram[tonic] {
                tonic = class;
            }
        }

        Ok(Self {
            min_pitch,
            max_pitch,
            average_pitch: sum / tune.len() as f64,
            pitch_histogram,
            semitone_histogram,
            tonic: tonic as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_pitches() {
        let tune: Vec<_> = [62.0, 74.0, 66.0, 69.0, 50.0]
            .iter()
            .map(|&p| VectorNote::new(p, 1.0, 1.0))
            .collect();
        let stats = TuneStats::new(&tune).unwrap();
        assert_eq!(stats.min_pitch, 50.0);
        assert_eq!(stats.max_pitch, 74.0);
        assert_eq!(stats.average_pitch, 64.2);
        assert_eq!(stats.pitch_histogram[62], 1);
        assert_eq!(stats.semitone_histogram[2], 3);
        assert_eq!(stats.tonic, 2);
    }

    #[test]
    fn empty_tune_is_an_error() {
        assert!(matches!(TuneStats::new(&[]), Err(CodecError::EmptyTune)));
    }
}
