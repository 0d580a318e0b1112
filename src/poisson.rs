// poisson.rs
//
// Zero-class estimation for a zero-truncated Poisson count distribution.

use crate::error::PopGenError;

use log::{debug, warn};
use std::collections::BTreeMap;

/// Default iteration cap for [`estimate_zero_class`].
pub const DEFAULT_NSIM: usize = 1000;
/// Default convergence tolerance on successive lambda values.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// State of the fixed-point search once it stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoissonFit {
    /// Mean of the observed (truncated) counts.
    pub truncated_mean: f64,
    pub lambda: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Converged fit plus the estimated number of unobserved zero-count units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroClassEstimate {
    pub fit: PoissonFit,
    /// Units observed, i.e. the sum of the frequency table.
    pub n_observed: u64,
    pub zero_class: u64,
}

/// Poisson probability of a zero count.
pub fn dpois_zero(lambda: f64) -> f64 {
    (-lambda).exp()
}

/// Iterates `k <- tmean * (1 - exp(-k))` from `k = tmean` until two successive
/// values differ by at most `tolerance` or `nsim` iterations have run.
pub fn fit_truncated_poisson(truncated_mean: f64, nsim: usize, tolerance: f64) -> PoissonFit {
    let mut k = truncated_mean;
    for iteration in 1..=nsim {
        let next = truncated_mean * (1.0 - (-k).exp());
        if (next - k).abs() <= tolerance {
            return PoissonFit {
                truncated_mean,
                lambda: next,
                converged: true,
                iterations: iteration,
            };
        }
        k = next;
    }
    PoissonFit {
        truncated_mean,
        lambda: k,
        converged: false,
        iterations: nsim,
    }
}

/// Estimates how many units carry zero counts from a table of count -> units with that count.
///
/// Keys must be >= 1; a zero key is rejected. Fails with
/// [`PopGenError::EstimationFailure`] when the search does not converge.
pub fn estimate_zero_class(
    frequencies: &BTreeMap<u64, u64>,
    nsim: usize,
    tolerance: f64,
) -> Result<ZeroClassEstimate, PopGenError> {
    if frequencies.contains_key(&0) {
        return Err(PopGenError::InvalidConfig(
            "truncated frequency table must not contain a zero class".to_string(),
        ));
    }
    let n_observed: u64 = frequencies.values().sum();
    if n_observed == 0 {
        return Err(PopGenError::InvalidConfig("frequency table is empty".to_string()));
    }
    let total: u64 = frequencies.iter().map(|(count, units)| count * units).sum();
    let truncated_mean = total as f64 / n_observed as f64;

    let fit = fit_truncated_poisson(truncated_mean, nsim, tolerance);
    if !fit.converged {
        warn!(
            "Zero-class search stopped after {} iterations at lambda {}",
            fit.iterations, fit.lambda
        );
        return Err(PopGenError::EstimationFailure {
            iterations: fit.iterations,
            last_lambda: fit.lambda,
        });
    }

    let p0 = dpois_zero(fit.lambda);
    let zero_class = (p0 * (n_observed as f64 / (1.0 - p0))).round();
    debug!(
        "Truncated mean {:.4}, lambda {:.5} after {} iterations, zero class {}",
        truncated_mean, fit.lambda, fit.iterations, zero_class
    );
    Ok(ZeroClassEstimate {
        fit,
        n_observed,
        zero_class: if zero_class.is_finite() { zero_class as u64 } else { 0 },
    })
}
