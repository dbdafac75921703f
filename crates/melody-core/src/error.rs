use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to parse MIDI data: {0}")]
    Midi(#[from] midly::Error),
    #[error("failed to encode MIDI data: {0}")]
    Encode(String),
    #[error("timecode-based MIDI timing is not supported")]
    TimecodeTiming,
    #[error("ticks per quarter note must be positive")]
    ZeroTicksPerQuarter,
    #[error("ticks per quarter note {0} exceeds the SMF limit of 32767")]
    TicksPerQuarterTooLarge(u16),
    #[error("tune statistics require at least one note")]
    EmptyTune,
}

pub type Result<T> = std::result::Result<T, CodecError>;
