// src/explore/sampling.rs
use crate::error::{exploration_error, RlResult};
use crate::explore::seed::uniform_draw;

/// Build an epsilon-greedy pdf over `n` actions. The top action gets
/// `1 - epsilon + epsilon/n`, everyone else `epsilon/n`.
pub fn epsilon_greedy(epsilon: f32, top_index: usize, n: usize) -> RlResult<Vec<f32>> {
    if n < 1 {
        return Err(exploration_error("cannot build a pdf over zero actions"));
    }
    if !(0.0..=1.0).contains(&epsilon) || !epsilon.is_finite() {
        return Err(exploration_error(format!(
            "epsilon must be in [0,1], got {epsilon}"
        )));
    }
    if top_index >= n {
        return Err(exploration_error(format!(
            "top index {top_index} out of range for {n} actions"
        )));
    }
    let base = epsilon / n as f32;
    let mut pdf = vec![base; n];
    pdf[top_index] = 1.0 - epsilon + base;
    Ok(pdf)
}

/// Draw one index from `pdf` using the deterministic seed, renormalizing the
/// pdf in place first if floating-point drift left it not summing to 1.
pub fn sample_after_normalizing(seed: u64, pdf: &mut [f32]) -> RlResult<usize> {
    if pdf.is_empty() {
        return Err(exploration_error("cannot sample from an empty pdf"));
    }
    let total: f32 = pdf.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(exploration_error(format!(
            "pdf must have positive finite mass, sum was {total}"
        )));
    }
    if (total - 1.0).abs() > f32::EPSILON {
        for p in pdf.iter_mut() {
            *p /= total;
        }
    }

    let draw = uniform_draw(seed);
    let mut cumulative = 0.0f32;
    for (idx, p) in pdf.iter().enumerate() {
        cumulative += *p;
        if draw < cumulative {
            return Ok(idx);
        }
    }
    // Accumulated rounding can leave the cdf just shy of 1.0.
    Ok(pdf.len() - 1)
}

/// Move the chosen entry to the front so "first ranked" always means "the
/// action actually taken". A single swap: the previous front entry lands at
/// `chosen`.
pub fn swap_chosen<T>(entries: &mut [T], chosen: usize) -> RlResult<()> {
    if chosen >= entries.len() {
        return Err(exploration_error(format!(
            "chosen index {chosen} out of range for {} entries",
            entries.len()
        )));
    }
    entries.swap(0, chosen);
    Ok(())
}
