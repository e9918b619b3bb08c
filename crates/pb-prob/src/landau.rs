//! Landau kernel `φ((x - mean) / sigma)`, the standard Landau density at the
//! reduced variable (not divided by `sigma`).
//!
//! `φ` is the classic piecewise rational approximation (CERNLIB DENLAN): six
//! rational regions with their own coefficient tables plus two asymptotic
//! expansions for the far tails. Region boundaries in the reduced variable are
//! `-5.5, -1, 1, 5, 12, 50, 300`.
//!
//! `sigma <= 0` (or NaN) is out of domain and evaluates to `0`.

use crate::math::horner5;
use pb_core::Bracket;

const P1: [f64; 5] = [0.4259894875, -0.1249762550, 0.03984243700, -0.006298287635, 0.001511162253];
const Q1: [f64; 5] = [1.0, -0.3388260629, 0.09594393323, -0.01608042283, 0.003778942063];

const P2: [f64; 5] = [0.1788541609, 0.1173957403, 0.01488850518, -0.001394989411, 0.0001283617211];
const Q2: [f64; 5] = [1.0, 0.7428795082, 0.3153932961, 0.06694219548, 0.008790609714];

const P3: [f64; 5] =
    [0.1788544503, 0.09359161662, 0.006325387654, 0.00006611667319, -0.000002031049101];
const Q3: [f64; 5] = [1.0, 0.6097809921, 0.2560616665, 0.04746722384, 0.006957301675];

const P4: [f64; 5] = [0.9874054407, 118.6723273, 849.2794360, -743.7792444, 427.0262186];
const Q4: [f64; 5] = [1.0, 106.8615961, 337.6496214, 2016.712389, 1597.063511];

const P5: [f64; 5] = [1.003675074, 167.5702434, 4789.711289, 21217.86767, -22324.94910];
const Q5: [f64; 5] = [1.0, 156.9424537, 3745.310488, 9834.698876, 66924.28357];

const P6: [f64; 5] = [1.000827619, 664.9143136, 62972.92665, 475554.6998, -5743609.109];
const Q6: [f64; 5] = [1.0, 651.4101098, 56974.73333, 165917.4725, -2815759.939];

const A1: [f64; 3] = [0.04166666667, -0.01996527778, 0.02709538966];
const A2: [f64; 2] = [-1.845568670, -4.284640743];

/// `1/sqrt(2π)` as used by the left asymptotic expansion.
const INV_SQRT_2PI: f64 = 0.3989422803;

/// Piece of the approximation that applies to a reduced variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    /// `v <= -5.5`: asymptotic expansion.
    FarLeft,
    /// `-5.5 < v < -1`
    Left,
    /// `-1 <= v <= 1`
    Core,
    /// `1 < v < 5`
    Right,
    /// `5 <= v < 12`
    Tail1,
    /// `12 <= v < 50`
    Tail2,
    /// `50 <= v < 300`
    Tail3,
    /// `v >= 300`: asymptotic expansion.
    FarRight,
}

impl Region {
    fn of(v: f64) -> Self {
        if v > 1.0 {
            if v < 5.0 {
                Self::Right
            } else if v < 12.0 {
                Self::Tail1
            } else if v < 50.0 {
                Self::Tail2
            } else if v < 300.0 {
                Self::Tail3
            } else {
                Self::FarRight
            }
        } else if v < -1.0 {
            if v > -5.5 { Self::Left } else { Self::FarLeft }
        } else {
            Self::Core
        }
    }
}

#[inline(always)]
fn ratio(p: &[f64; 5], q: &[f64; 5], v: f64) -> f64 {
    horner5(p, v) / horner5(q, v)
}

fn region_value(region: Region, v: f64) -> f64 {
    match region {
        Region::FarLeft => {
            let u = (v + 1.0).exp();
            if u < 1e-10 {
                return 0.0;
            }
            let ue = (-1.0 / u).exp();
            let us = u.sqrt();
            INV_SQRT_2PI * (ue / us) * (1.0 + (A1[0] + (A1[1] + A1[2] * u) * u) * u)
        }
        Region::Left => {
            let u = (-v - 1.0).exp();
            (-u).exp() * u.sqrt() * ratio(&P1, &Q1, v)
        }
        Region::Core => ratio(&P2, &Q2, v),
        Region::Right => ratio(&P3, &Q3, v),
        Region::Tail1 => {
            let u = 1.0 / v;
            u * u * ratio(&P4, &Q4, u)
        }
        Region::Tail2 => {
            let u = 1.0 / v;
            u * u * ratio(&P5, &Q5, u)
        }
        Region::Tail3 => {
            let u = 1.0 / v;
            u * u * ratio(&P6, &Q6, u)
        }
        Region::FarRight => {
            let u = 1.0 / (v - v * v.ln() / (v + 1.0));
            u * u * (1.0 + (A2[0] + A2[1] * u) * u)
        }
    }
}

/// Standard Landau density at the reduced variable `v`.
///
/// NaN input propagates to NaN.
#[inline]
pub fn standard(v: f64) -> f64 {
    if v.is_nan() {
        return f64::NAN;
    }
    region_value(Region::of(v), v)
}

/// Kernel value at a single point.
#[inline]
pub fn evaluate(x: f64, mean: f64, sigma: f64) -> f64 {
    if sigma.is_nan() || sigma <= 0.0 {
        return 0.0;
    }
    standard((x - mean) / sigma)
}

/// Batch loop. `out.len()` events are computed.
pub fn compute<X: Bracket, M: Bracket, S: Bracket>(out: &mut [f64], x: X, mean: M, sigma: S) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = evaluate(x.at(i), mean.at(i), sigma.at(i));
    }
}
