use std::collections::BTreeMap;

use crate::event::VectorNote;
use crate::voice::{AllocatedNote, VoiceAllocator};

pub const NOTE_ON_VELOCITY: u8 = 127;

/// Off sorts before On so a voice is released before its pitch restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EndpointKind {
    Off,
    On,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub tick: u32,
    pub kind: EndpointKind,
    pub velocity: u8,
    pub channel: u8,
    pub pitch: u8,
}

/// A note endpoint `delta` ticks after the previous event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmittedEvent {
    pub delta: u32,
    pub kind: EndpointKind,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
}

/// On/off endpoints of all notes in playback order.
pub fn endpoints(notes: &[AllocatedNote]) -> Vec<Endpoint> {
    let mut out = Vec::with_capacity(notes.len() * 2);
    for n in notes {
        out.push(Endpoint {
            tick: n.on_tick,
            kind: EndpointKind::On,
            velocity: NOTE_ON_VELOCITY,
            channel: n.channel,
            pitch: n.pitch,
        });
        out.push(Endpoint { tick: n.off_tick, kind: EndpointKind::Off, velocity: 0, channel: n.channel, pitch: n.pitch });
    }
    out.sort_by_key(|e| (e.tick, e.kind, e.velocity));
    out
}

pub fn emit_events(notes: &[AllocatedNote]) -> Vec<EmittedEvent> {
    let mut cursor = 0;
    endpoints(notes)
        .into_iter()
        .map(|e| {
            let delta = e.tick - cursor;
            cursor = e.tick;
            EmittedEvent { delta, kind: e.kind, channel: e.channel, pitch: e.pitch, velocity: e.velocity }
        })
        .collect()
}

/// Highest number of simultaneously sounding voices per (channel, pitch).
pub fn peak_voices(notes: &[AllocatedNote]) -> BTreeMap<(u8, u8), u32> {
    let mut current: BTreeMap<(u8, u8), u32> = BTreeMap::new();
    let mut peak: BTreeMap<(u8, u8), u32> = BTreeMap::new();
    for e in endpoints(notes) {
        let key = (e.channel, e.pitch);
        let count = current.entry(key).or_default();
        match e.kind {
            EndpointKind::On => {
                *count += 1;
                let top = peak.entry(key).or_default();
                *top = (*top).max(*count);
            }
            EndpointKind::Off => *count = count.saturating_sub(1),
        }
    }
    peak
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedTune {
    pub events: Vec<EmittedEvent>,
    pub dropped: usize,
}

/// Place a tune on the tick grid, assign channels and emit its events.
pub fn tune_to_events(tune: &[VectorNote], ticks_per_quarter: u16, channel: u8) -> EncodedTune {
    let tpq = f64::from(ticks_per_quarter);
    let mut allocator = VoiceAllocator::new();
    let mut allocated = Vec::with_capacity(tune.len());
    let mut onset = 0.0;
    for note in tune {
        onset += note.step;
        let on_tick = (onset * tpq).round().max(0.0) as u32;
        let off_tick = ((onset + note.duration) * tpq).round().max(0.0) as u32;
        let pitch = note.pitch.round().clamp(0.0, 127.0) as u8;
        if let Some(placed) = allocator.allocate(channel, pitch, on_tick, off_tick) {
            allocated.push(placed);
        }
    }
    let dropped = allocator.dropped();
    if dropped > 0 {
        tracing::info!(dropped, "notes dropped while encoding");
    }
    if tracing::enabled!(tracing::Level::DEBUG) {
        let peak = peak_voices(&allocated).into_values().max().unwrap_or(0);
        tracing::debug!(notes = allocated.len(), peak, "allocated voices");
    }
    EncodedTune { events: emit_events(&allocated), dropped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(channel: u8, pitch: u8, on_tick: u32, off_tick: u32) -> AllocatedNote {
        AllocatedNote { channel, pitch, on_tick, off_tick }
    }

    #[test]
    fn offs_precede_ons_at_same_tick() {
        let evs = emit_events(&[alloc(0, 60, 0, 480), alloc(0, 62, 480, 960)]);
        let summary: Vec<_> = evs.iter().map(|e| (e.delta, e.kind, e.pitch, e.velocity)).collect();
        assert_eq!(
            summary,
            vec![
                (0, EndpointKind::On, 60, 127),
                (480, EndpointKind::Off, 60, 0),
                (0, EndpointKind::On, 62, 127),
                (480, EndpointKind::Off, 62, 0),
            ]
        );
    }

    #[test]
    fn peak_voice_count() {
        let notes = [alloc(0, 60, 0, 480), alloc(0, 60, 100, 200), alloc(1, 60, 0, 480), alloc(0, 60, 480, 500)];
        let peaks = peak_voices(&notes);
        assert_eq!(peaks[&(0, 60)], 2);
        assert_eq!(peaks[&(1, 60)], 1);
    }

    #[test]
    fn repeated_pitch_moves_to_fallback_channel() {
        let tune = vec![
            VectorNote::new(60.0, 1.0, 0.0),
            VectorNote::new(60.0, 1.0, 1.0),
            VectorNote::new(64.0, 0.5, 1.0),
        ];
        let encoded = tune_to_events(&tune, 480, 0);
        assert_eq!(encoded.dropped, 0);
        let ons: Vec<_> = encoded
            .events
            .iter()
            .filter(|e| e.kind == EndpointKind::On)
            .map(|e| (e.channel, e.pitch))
            .collect();
        assert_eq!(ons, vec![(0, 60), (1, 60), (0, 64)]);
        let total: u32 = encoded.events.iter().map(|e| e.delta).sum();
        assert_eq!(total, 1200);
    }

    #[test]
    fn zero_duration_note_is_dropped() {
        let tune = vec![VectorNote::new(60.0, 0.0, 0.0), VectorNote::new(62.0, 1.0, 1.0)];
        let encoded = tune_to_events(&tune, 96, 0);
        assert_eq!(encoded.dropped, 1);
        assert_eq!(encoded.events.len(), 2);
    }
}
