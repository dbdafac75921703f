//! Adapter between Standard MIDI Files (via `midly`) and the codec's
//! message and event types.

use midly::{
    num::{u15, u24, u28, u4, u7},
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::emit::{EmittedEvent, EndpointKind};
use crate::error::{CodecError, Result};
use crate::event::{MessageKind, Tempo, TimedMessage};

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSmf {
    pub ticks_per_quarter: u16,
    pub tracks: Vec<Vec<TimedMessage>>,
}

pub fn decode_smf(bytes: &[u8]) -> Result<DecodedSmf> {
    let smf = Smf::parse(bytes)?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int(),
        Timing::Timecode(..) => return Err(CodecError::TimecodeTiming),
    };
    if ticks_per_quarter == 0 {
        return Err(CodecError::ZeroTicksPerQuarter);
    }
    let tracks = smf
        .tracks
        .iter()
        .map(|track| track.iter().map(timed_message).collect())
        .collect();
    Ok(DecodedSmf { ticks_per_quarter, tracks })
}

fn timed_message(event: &TrackEvent) -> TimedMessage {
    let kind = match event.kind {
        TrackEventKind::Meta(MetaMessage::Tempo(micros)) => MessageKind::Tempo { micros_per_quarter: micros.as_int() },
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => MessageKind::NoteOn { channel, pitch: key.as_int(), velocity: vel.as_int() },
                MidiMessage::NoteOff { key, vel } => MessageKind::NoteOff { channel, pitch: key.as_int(), velocity: vel.as_int() },
                MidiMessage::ProgramChange { program } => MessageKind::ProgramChange { channel, program: program.as_int() },
                _ => MessageKind::Other,
            }
        }
        _ => MessageKind::Other,
    };
    TimedMessage::new(event.delta.as_int(), kind)
}

/// Serialize emitted events as a single-track SMF with a tempo event and,
/// optionally, a program change on every channel the events use.
pub fn encode_smf(events: &[EmittedEvent], ticks_per_quarter: u16, tempo: Tempo, program: Option<u8>) -> Result<Vec<u8>> {
    if ticks_per_quarter == 0 {
        return Err(CodecError::ZeroTicksPerQuarter);
    }
    let Some(resolution) = u15::try_from(ticks_per_quarter) else {
        return Err(CodecError::TicksPerQuarterTooLarge(ticks_per_quarter));
    };
    let mut track: Track<'static> = Vec::with_capacity(events.len() + 18);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo.micros_per_quarter.min(0x00ff_ffff)))),
    });

    if let Some(program) = program {
        let mut channels: Vec<u8> = events.iter().map(|e| e.channel & 0x0f).collect();
        channels.sort_unstable();
        channels.dedup();
        for channel in channels {
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel: u4::new(channel),
                    message: MidiMessage::ProgramChange { program: u7::new(program.min(127)) },
                },
            });
        }
    }

    for e in events {
        let key = u7::new(e.pitch.min(127));
        let vel = u7::new(e.velocity.min(127));
        let message = match e.kind {
            EndpointKind::On => MidiMessage::NoteOn { key, vel },
            EndpointKind::Off => MidiMessage::NoteOff { key, vel },
        };
        track.push(TrackEvent {
            delta: u28::new(e.delta.min(0x0fff_ffff)),
            kind: TrackEventKind::Midi { channel: u4::new(e.channel & 0x0f), message },
        });
    }
    track.push(TrackEvent { delta: u28::new(0), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) });

    let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(resolution)));
    smf.tracks.push(track);

    let mut buf = Vec::new();
    smf.write(&mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::tune_to_events;
    use crate::event::VectorNote;

    #[test]
    fn encoded_file_decodes_back() {
        let tune = vec![VectorNote::new(60.0, 1.0, 0.0), VectorNote::new(67.0, 0.5, 1.0)];
        let encoded = tune_to_events(&tune, 480, 2);
        let bytes = encode_smf(&encoded.events, 480, Tempo::from_bpm(100.0), Some(73)).unwrap();

        let decoded = decode_smf(&bytes).unwrap();
        assert_eq!(decoded.ticks_per_quarter, 480);
        assert_eq!(decoded.tracks.len(), 1);
        let track = &decoded.tracks[0];
        assert_eq!(track[0].kind, MessageKind::Tempo { micros_per_quarter: 600_000 });
        assert_eq!(track[1].kind, MessageKind::ProgramChange { channel: 2, program: 73 });
        assert_eq!(track[2].kind, MessageKind::NoteOn { channel: 2, pitch: 60, velocity: 127 });
        assert_eq!(track[3], TimedMessage::new(480, MessageKind::NoteOff { channel: 2, pitch: 60, velocity: 0 }));
        let ons = track.iter().filter(|m| matches!(m.kind, MessageKind::NoteOn { .. })).count();
        assert_eq!(ons, 2);
    }

    #[test]
    fn rejects_resolution_beyond_header_range() {
        let encoded = tune_to_events(&[VectorNote::new(60.0, 1.0, 0.0)], 40_000, 0);
        assert!(matches!(
            encode_smf(&encoded.events, 40_000, Tempo::default(), None),
            Err(CodecError::TicksPerQuarterTooLarge(40_000))
        ));
        assert!(encode_smf(&encoded.events, 0x7fff, Tempo::default(), None).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_smf(b"not a midi file"), Err(CodecError::Midi(_))));
    }
}
