//! Mirostat sampling: truncate by surprise with a threshold that is
//! adjusted after every draw so the average surprise tracks a target.

use rand::Rng;

use crate::error::SamplerError;
use crate::filters::{apply_repetition_penalty, descending_order, normalize, reweight};

/// Per-run sampler state. Create one per generated sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Mirostat {
    pub temperature: f64,
    /// Target surprise τ in bits.
    pub tau: f64,
    /// Learning rate η.
    pub eta: f64,
    /// Current surprise threshold μ.
    pub mu: f64,
    pub repetition_penalty: f64,
    pub penalty_steps: usize,
    cross_entropy_total: f64,
    count: usize,
}

impl Mirostat {
    pub fn new(temperature: f64, tau: f64, eta: f64) -> Self {
        Self {
            temperature,
            tau,
            eta,
            mu: 2.0 * tau,
            repetition_penalty: 1.0,
            penalty_steps: 1,
            cross_entropy_total: 0.0,
            count: 0,
        }
    }

    pub fn with_repetition_penalty(mut self, penalty: f64, steps: usize) -> Self {
        self.repetition_penalty = penalty;
        self.penalty_steps = steps;
        self
    }

    /// Draw one index from `probs`, penalizing the tokens in `last_tokens`.
    pub fn sample<R: Rng>(&mut self, probs: &[f64], last_tokens: &[usize], rng: &mut R) -> Result<usize, SamplerError> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(SamplerError::InvalidTemperature(self.temperature));
        }
        let min_prob = probs.iter().copied().filter(|&p| p > 0.0).fold(f64::INFINITY, f64::min);
        if !min_prob.is_finite() {
            return Err(SamplerError::NoProbabilityMass);
        }
        let ceiling = -min_prob.log2();

        let mut work = apply_repetition_penalty(probs, last_tokens, self.repetition_penalty, self.penalty_steps);
        if self.temperature != 1.0 {
            work = reweight(&work, self.temperature);
        } else if !last_tokens.is_empty() {
            work = normalize(&work);
        }

        let mut masked = vec![0.0; work.len()];
        for (rank, i) in descending_order(&work).into_iter().enumerate() {
            let p = work[i];
            if p > 0.0 && (rank == 0 || -p.log2() <= self.mu) {
                masked[i] = p;
            }
        }
        let masked = normalize(&masked);

        let index = draw(&masked, rng).ok_or(SamplerError::NoProbabilityMass)?;
        let surprise = -masked[index].log2();
        self.mu = (self.mu - self.eta * (surprise - self.tau)).min(ceiling);

        self.cross_entropy_total += -probs[index].log2();
        self.count += 1;
        Ok(index)
    }

    /// Mean surprise of the drawn tokens under the unmodified input distributions.
    pub fn average_cross_entropy(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.cross_entropy_total / self.count as f64
    }

    pub fn samples(&self) -> usize {
        self.count
    }
}

/// Categorical draw from a normalized distribution. Only positive entries
/// can be drawn; `None` when there are none.
fn draw<R: Rng>(probs: &[f64], rng: &mut R) -> Option<usize> {
    let target: f64 = rng.random();
    let mut cumulative = 0.0;
    let mut last = None;
    for (i, &p) in probs.iter().enumerate() {
        if p.is_nan() || p <= 0.0 {
            continue;
        }
        last = Some(i);
        cumulative += p;
        if target < cumulative {
            return last;
        }
    }
    last
}
