//! Channel assignment for re-encoding: a channel can only sound one note
//! per pitch at a time, since overlapping on/off pairs of the same key
//! cannot be told apart.

use std::collections::HashMap;

use crate::event::PERCUSSION_CHANNEL;

pub const CHANNELS: usize = 16;

/// Channels tried when the requested one is busy; never the percussion channel.
pub const FALLBACK_CHANNELS: [u8; 15] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatedNote {
    pub channel: u8,
    pub pitch: u8,
    pub on_tick: u32,
    pub off_tick: u32,
}

/// Scheduled off-ticks per pitch, per channel. One allocator per encoding run.
#[derive(Debug, Default)]
pub struct VoiceAllocator {
    channels: [HashMap<u8, Vec<u32>>; CHANNELS],
    dropped: usize,
}

impl VoiceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `pitch` is still scheduled on `channel` at `tick` (inclusive).
    pub fn is_active(&self, channel: u8, pitch: u8, tick: u32) -> bool {
        self.channels[usize::from(channel & 0x0f)]
            .get(&pitch)
            .is_some_and(|offs| offs.iter().any(|&off| off >= tick))
    }

    /// Reserve `pitch` on exactly `channel` for `[on_tick, off_tick)`.
    pub fn exclusive(&mut self, channel: u8, pitch: u8, on_tick: u32, off_tick: u32) -> bool {
        if on_tick >= off_tick || self.is_active(channel, pitch, on_tick) {
            return false;
        }
        self.channels[usize::from(channel & 0x0f)]
            .entry(pitch)
            .or_default()
            .push(off_tick);
        true
    }

    /// Reserve on `channel`, or on the first free fallback channel.
    /// Returns `None` and counts the note as dropped when nothing fits.
    pub fn allocate(&mut self, channel: u8, pitch: u8, on_tick: u32, off_tick: u32) -> Option<AllocatedNote> {
        let note = |channel| AllocatedNote { channel, pitch, on_tick, off_tick };
        if self.exclusive(channel, pitch, on_tick, off_tick) {
            return Some(note(channel));
        }
        for &fallback in FALLBACK_CHANNELS.iter() {
            if fallback == channel || self.is_active(fallback, pitch, on_tick) {
                continue;
            }
            if self.exclusive(fallback, pitch, on_tick, off_tick) {
                return Some(note(fallback));
            }
        }
        self.dropped += 1;
        tracing::warn!(channel, pitch, on_tick, off_tick, "no free channel for note, dropping it");
        None
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_rejects_overlap_and_degenerate() {
        let mut va = VoiceAllocator::new();
        assert!(va.exclusive(0, 60, 0, 480));
        assert!(!va.exclusive(0, 60, 240, 720));
        // touching counts as overlapping
        assert!(!va.exclusive(0, 60, 480, 960));
        assert!(va.exclusive(0, 60, 481, 960));
        assert!(va.exclusive(0, 62, 0, 480));
        assert!(!va.exclusive(1, 60, 100, 100));
    }

    #[test]
    fn falls_back_to_next_channel() {
        let mut va = VoiceAllocator::new();
        assert_eq!(va.allocate(0, 60, 0, 960).map(|n| n.channel), Some(0));
        assert_eq!(va.allocate(0, 60, 480, 960).map(|n| n.channel), Some(1));
        assert_eq!(va.allocate(1, 60, 480, 960).map(|n| n.channel), Some(2));
        assert_eq!(va.dropped(), 0);
    }

    #[test]
    fn skips_percussion_and_drops_when_full() {
        let mut va = VoiceAllocator::new();
        for _ in 0..15 {
            let n = va.allocate(0, 60, 0, 100).unwrap();
            assert_ne!(n.channel, PERCUSSION_CHANNEL);
        }
        assert_eq!(va.allocate(0, 60, 50, 100), None);
        assert_eq!(va.allocate(0, 61, 50, 50), None);
        assert_eq!(va.dropped(), 2);
    }

    #[test]
    fn allocated_voices_never_overlap() {
        let mut va = VoiceAllocator::new();
        let mut placed = Vec::new();
        for i in 0..200u32 {
            let on = (i * 37) % 500 + i * 5;
            let off = on + 1 + (i * 53) % 400;
            let pitch = 60 + (i % 4) as u8;
            if let Some(n) = va.allocate((i % 3) as u8, pitch, on, off) {
                placed.push(n);
            }
        }
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                if a.channel == b.channel && a.pitch == b.pitch {
                    assert!(a.off_tick < b.on_tick || b.off_tick < a.on_tick, "{a:?} overlaps {b:?}");
                }
            }
        }
    }
}
