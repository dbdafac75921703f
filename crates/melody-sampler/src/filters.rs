//! Stateless transforms on logit and probability vectors.

use std::cmp::Ordering;

/// Scale to unit sum; vectors without positive mass are returned as is.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v / total).collect()
}

pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let exps: Vec<f64> = logits.iter().map(|v| v.exp()).collect();
    normalize(&exps)
}

/// Sharpen (`t < 1`) or flatten (`t > 1`) a distribution as `p^(1/t)`.
///
/// Non-positive entries stay at zero and take no part in the normalization.
/// `temperature` must be positive and finite.
pub fn reweight(dist: &[f64], temperature: f64) -> Vec<f64> {
    if temperature == 1.0 {
        return dist.to_vec();
    }
    let logs: Vec<Option<f64>> = dist.iter().map(|&p| (p > 0.0).then(|| p.ln() / temperature)).collect();
    let max = logs.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = logs.iter().map(|l| l.map_or(0.0, |l| (l - max).exp())).collect();
    normalize(&weights)
}

/// Indices ordered by descending value.
pub(crate) fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    order
}

/// Zero all but the `k` largest entries; `k == 0` disables the filter.
pub fn top_k(values: &[f64], k: usize) -> Vec<f64> {
    if k == 0 || k >= values.len() {
        return values.to_vec();
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.select_nth_unstable_by(k - 1, |&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    let mut out = vec![0.0; values.len()];
    for &i in &order[..k] {
        out[i] = values[i];
    }
    out
}

/// Keep the smallest set of most likely entries whose mass reaches `p`.
/// The most likely entry always survives. Not renormalized.
pub fn top_p(probs: &[f64], p: f64) -> Vec<f64> {
    let mut out = vec![0.0; probs.len()];
    let mut cumulative = 0.0;
    for i in descending_order(probs) {
        out[i] = probs[i];
        cumulative += probs[i];
        if cumulative >= p {
            break;
        }
    }
    out
}

/// Factor that brings `penalty` down to 1.0 after `steps` multiplications.
pub fn penalty_decay(penalty: f64, steps: usize) -> f64 {
    (1.0 / penalty).powf(1.0 / steps.max(1) as f64)
}

/// Divide the probabilities of recent tokens by a penalty that decays
/// toward 1.0, starting from the most recent token.
pub fn apply_repetition_penalty(probs: &[f64], last_tokens: &[usize], penalty: f64, steps: usize) -> Vec<f64> {
    let mut out = probs.to_vec();
    let decay = penalty_decay(penalty, steps);
    let mut current = penalty;
    for &token in last_tokens.iter().rev() {
        if current <= 1.0 {
            break;
        }
        if let Some(p) = out.get_mut(token) {
            *p /= current;
        }
        current *= decay;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
        assert!(close(&softmax(&[0.0, 0.0]), &[0.5, 0.5]));
    }

    #[test]
    fn reweight_sharpens_and_masks_zeros() {
        let dist = [0.5, 0.25, 0.25, 0.0];
        assert_eq!(reweight(&dist, 1.0), dist.to_vec());
        let sharp = reweight(&dist, 0.5);
        // squares: .25, .0625, .0625 -> /0.375
        assert!(close(&sharp, &[2.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0, 0.0]));
        let flat = reweight(&dist, 1e6);
        assert!((flat[0] - 1.0 / 3.0).abs() < 1e-5);
        assert_eq!(flat[3], 0.0);
    }

    #[test]
    fn top_k_keeps_largest() {
        assert_eq!(top_k(&[0.1, 0.4, 0.2, 0.3], 2), vec![0.0, 0.4, 0.0, 0.3]);
        assert_eq!(top_k(&[0.1, 0.4], 0), vec![0.1, 0.4]);
        assert_eq!(top_k(&[0.1, 0.4], 5), vec![0.1, 0.4]);
    }

    #[test]
    fn top_p_prefix() {
        let probs = [0.1, 0.5, 0.15, 0.25];
        assert_eq!(top_p(&probs, 1.0), probs.to_vec());
        assert_eq!(top_p(&probs, 0.7), vec![0.0, 0.5, 0.0, 0.25]);
        assert_eq!(top_p(&probs, 0.75), vec![0.0, 0.5, 0.0, 0.25]);
        assert_eq!(top_p(&probs, 1e-9), vec![0.0, 0.5, 0.0, 0.0]);
        assert_eq!(top_p(&probs, 0.0), vec![0.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn decay_reaches_one() {
        let decay = penalty_decay(2.0, 4);
        assert!((2.0 * decay.powi(4) - 1.0).abs() < 1e-12);
        assert!((penalty_decay(1.5, 0) - 1.0 / 1.5).abs() < 1e-12);
    }

    #[test]
    fn repetition_penalty_fades() {
        let probs = [0.25; 4];
        let out = apply_repetition_penalty(&probs, &[0, 1, 2, 3], 4.0, 2);
        // most recent token 3 gets 4.0, token 2 gets 2.0, then the penalty is spent
        assert!((out[3] - 0.0625).abs() < 1e-12);
        assert!((out[2] - 0.125).abs() < 1e-12);
        assert_eq!(out[1], 0.25);
        assert_eq!(out[0], 0.25);
        assert_eq!(apply_repetition_penalty(&probs, &[1], 1.0, 4), probs.to_vec());
    }
}
