use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SamplerError {
    #[error("probability vector has no positive mass")]
    NoProbabilityMass,
    #[error("cannot train a pitch model on an empty corpus")]
    EmptyCorpus,
    #[error("sampling temperature must be a positive finite number, got {0}")]
    InvalidTemperature(f64),
}
