//! Controllable sampling of pitch sequences: distribution filters, a
//! Mirostat sampler and a sequence builder on top of a [`PitchModel`].

pub mod dataset;
pub mod error;
pub mod filters;
pub mod generate;
pub mod mirostat;

pub use dataset::sequence_segmentation;
pub use error::SamplerError;
pub use generate::{pitch_token, MarkovModel, PitchModel, SamplerConfig, SequenceBuilder};
pub use mirostat::Mirostat;
