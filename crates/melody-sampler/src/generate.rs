//! Pitch models and the sequence builder that turns sampled pitches into a tune.

use melody_core::{Tune, VectorNote};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SamplerError;
use crate::filters::{normalize, softmax, top_k, top_p};
use crate::mirostat::Mirostat;

pub const PITCHES: usize = 128;

/// Anything that scores the next pitch given the pitches so far.
pub trait PitchModel {
    /// One logit per MIDI pitch.
    fn logits(&self, history: &[usize]) -> Vec<f64>;
}

/// First-order pitch transition counts with additive smoothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkovModel {
    pub smoothing: f64,
    unigram: Vec<f64>,
    transitions: Vec<Vec<f64>>,
}

impl MarkovModel {
    pub const DEFAULT_SMOOTHING: f64 = 0.01;

    pub fn train(tunes: &[Tune]) -> Result<Self, SamplerError> {
        let mut unigram = vec![0.0; PITCHES];
        let mut transitions = vec![vec![0.0; PITCHES]; PITCHES];
        let mut seen = 0usize;
        for tune in tunes {
            let mut prev: Option<usize> = None;
            for note in tune {
                let pitch = pitch_token(note.pitch);
                unigram[pitch] += 1.0;
                if let Some(p) = prev {
                    transitions[p][pitch] += 1.0;
                }
                prev = Some(pitch);
                seen += 1;
            }
        }
        if seen == 0 {
            return Err(SamplerError::EmptyCorpus);
        }
        tracing::debug!(notes = seen, tunes = tunes.len(), "trained markov pitch model");
        Ok(Self { smoothing: Self::DEFAULT_SMOOTHING, unigram, transitions })
    }
}

impl PitchModel for MarkovModel {
    fn logits(&self, history: &[usize]) -> Vec<f64> {
        let row = match history.last() {
            Some(&prev) if prev < PITCHES && self.transitions[prev].iter().any(|&c| c > 0.0) => &self.transitions[prev],
            _ => &self.unigram,
        };
        row.iter().map(|&count| (count + self.smoothing).ln()).collect()
    }
}

pub fn pitch_token(pitch: f64) -> usize {
    pitch.round().clamp(0.0, (PITCHES - 1) as f64) as usize
}

/// Generation settings; every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub temperature: f64,
    pub tau: f64,
    pub eta: f64,
    /// 0 disables top-k.
    pub top_k: usize,
    /// 1.0 disables nucleus filtering.
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub penalty_steps: usize,
    /// Number of notes to generate.
    pub length: usize,
    /// Duration and step of every generated note, in quarter notes.
    pub duration: f64,
    pub step: f64,
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            tau: 3.0,
            eta: 0.1,
            top_k: 0,
            top_p: 1.0,
            repetition_penalty: 1.0,
            penalty_steps: 8,
            length: 32,
            duration: 0.5,
            step: 0.5,
            seed: None,
        }
    }
}

/// Drives logits → filters → Mirostat for one generated sequence.
pub struct SequenceBuilder<'a, M: PitchModel> {
    model: &'a M,
    config: &'a SamplerConfig,
    sampler: Mirostat,
}

impl<'a, M: PitchModel> SequenceBuilder<'a, M> {
    pub fn new(model: &'a M, config: &'a SamplerConfig) -> Self {
        let sampler = Mirostat::new(config.temperature, config.tau, config.eta)
            .with_repetition_penalty(config.repetition_penalty, config.penalty_steps);
        Self { model, config, sampler }
    }

    /// Generate `config.length` notes continuing from the `prime` pitches.
    pub fn build<R: Rng>(&mut self, prime: &[usize], rng: &mut R) -> Result<Tune, SamplerError> {
        let mut history = prime.to_vec();
        let mut tune = Vec::with_capacity(self.config.length);
        for i in 0..self.config.length {
            let mut probs = softmax(&self.model.logits(&history));
            probs = normalize(&top_k(&probs, self.config.top_k));
            if self.config.top_p < 1.0 {
                probs = normalize(&top_p(&probs, self.config.top_p));
            }
            let recent = &history[history.len().saturating_sub(self.config.penalty_steps)..];
            let pitch = self.sampler.sample(&probs, recent, rng)?;
            history.push(pitch);
            let step = if i == 0 { 0.0 } else { self.config.step };
            tune.push(VectorNote::new(pitch as f64, self.config.duration, step));
        }
        tracing::info!(
            notes = tune.len(),
            cross_entropy = self.sampler.average_cross_entropy(),
            "generated sequence"
        );
        Ok(tune)
    }

    pub fn sampler(&self) -> &Mirostat {
        &self.sampler
    }
}
