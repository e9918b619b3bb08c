//! Poisson kernel `exp(x ln(mean) - mean - lnΓ(x + 1))`, evaluated for real `x`.
//!
//! Edge handling:
//! - `x < 0` evaluates to `0`
//! - `x == 0` evaluates to `exp(-mean)`
//! - with the protect-negative-mean policy, any `mean < 0` evaluates to `1e-3`
//!
//! The `1e-3` floor is a numerical escape hatch that keeps fits alive when a
//! minimizer probes negative means; it is a policy, not a property of the
//! Poisson distribution.

use pb_core::Bracket;
use statrs::function::gamma::{checked_gamma_lr, checked_gamma_ur, ln_gamma};

/// Value returned for `mean < 0` when negative means are protected.
pub const PROTECTED_NEGATIVE_MEAN_VALUE: f64 = 1e-3;

/// Kernel value at a single point.
#[inline]
pub fn evaluate(x: f64, mean: f64, protect_negative_mean: bool) -> f64 {
    if protect_negative_mean && mean < 0.0 {
        return PROTECTED_NEGATIVE_MEAN_VALUE;
    }
    if x < 0.0 {
        return 0.0;
    }
    if x == 0.0 {
        return (-mean).exp();
    }
    (x * mean.ln() - mean - ln_gamma(x + 1.0)).exp()
}

/// Batch loop. `out.len()` events are computed.
pub fn compute<X: Bracket, M: Bracket>(
    out: &mut [f64],
    x: X,
    mean: M,
    protect_negative_mean: bool,
) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = evaluate(x.at(i), mean.at(i), protect_negative_mean);
    }
}

/// `P(X <= k)` for `X ~ Poisson(mean)`, `0 < mean < inf`.
fn cdf(k: u64, mean: f64) -> f64 {
    checked_gamma_ur(k as f64 + 1.0, mean).unwrap_or(f64::NAN)
}

/// `P(X > k)` for `X ~ Poisson(mean)`, `0 < mean < inf`.
fn cdf_c(k: u64, mean: f64) -> f64 {
    checked_gamma_lr(k as f64 + 1.0, mean).unwrap_or(f64::NAN)
}

/// Sum of the Poisson probabilities for integer `x` in `[low, high]`.
///
/// Non-integer limits are handled as in a histogram over counts: the integer
/// part of `low` is included, every integer up to `floor(high)` is included.
/// An infinite `high` integrates the full distribution (`1`). The tails are
/// taken from the complementary CDF when the lower limit lies above the mean,
/// which avoids cancellation.
///
/// A negative or NaN mean is outside the domain and yields NaN. An infinite
/// mean moves all mass to infinity: finite ranges integrate to `0`.
pub fn integral_x(low: f64, high: f64, mean: f64) -> f64 {
    if mean.is_nan() || mean < 0.0 {
        return f64::NAN;
    }
    let xmin = low.max(0.0);
    let xmax = high;
    if xmax < 0.0 || xmax < xmin {
        return 0.0;
    }
    if xmax.is_infinite() {
        return 1.0;
    }
    if mean.is_infinite() {
        return 0.0;
    }
    // Degenerate distribution: all mass at 0.
    if mean == 0.0 {
        return if xmin < 1.0 { 1.0 } else { 0.0 };
    }

    // ixmin is included, ixmax is the first count outside the range.
    let ixmin = xmin.floor() as u64;
    let ixmax = (xmax + 1.0).min(u32::MAX as f64).floor() as u64;
    if ixmax == 0 {
        return 0.0;
    }

    if ixmin == 0 {
        return cdf(ixmax - 1, mean);
    }
    if (ixmin as f64) <= mean {
        cdf(ixmax - 1, mean) - cdf(ixmin - 1, mean)
    } else {
        cdf_c(ixmin - 1, mean) - cdf_c(ixmax - 1, mean)
    }
}

/// Integral over the mean in `[mean_low, mean_high]` at fixed count `x`.
///
/// This is the difference of two Gamma(`x + 1`, 1) CDFs. Negative limits are
/// clamped to zero, negative counts integrate to zero. An infinite count
/// has no mass at any finite mean.
pub fn integral_mean(x: f64, mean_low: f64, mean_high: f64) -> f64 {
    let shape = x + 1.0;
    if !(shape > 0.0) {
        return 0.0;
    }
    let lo = mean_low.max(0.0);
    let hi = mean_high.max(0.0);
    let gamma_cdf = |m: f64| {
        if m == 0.0 {
            0.0
        } else if m.is_infinite() {
            1.0
        } else if shape.is_infinite() {
            0.0
        } else {
            checked_gamma_lr(shape, m).unwrap_or(f64::NAN)
        }
    };
    gamma_cdf(hi) - gamma_cdf(lo)
}
