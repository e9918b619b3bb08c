//! Romberg-style 1-D integration.
//!
//! Successive refinements of a composite rule (Trapezoid or Midpoint) form the
//! first column of a Romberg table; Richardson extrapolation fills the rest.
//! New integrand points of a refinement step are requested in chunks, so a
//! batch-capable integrand sees a handful of large calls instead of millions
//! of scalar ones.

use crate::config::{IntegratorConfig, SummationRule};
use pb_core::{Error, Result};
use pb_prob::math::NeumaierSum;

/// Upper bound on the number of abscissae handed to the integrand per call.
const CHUNK: usize = 4096;

/// Result of one integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integral {
    /// Best estimate of the integral.
    pub value: f64,
    /// Absolute change between the last two estimates (`inf` after one step).
    pub error: f64,
    /// Number of refinement steps performed.
    pub steps: u32,
    /// False if the step budget ran out before the tolerance was met.
    pub converged: bool,
}

/// Integrator over a finite interval.
///
/// Holds the last two rows of the Romberg table and the point buffers, so one
/// instance can be reused for many integrals without reallocating.
#[derive(Debug, Clone)]
pub struct Integrator1D {
    config: IntegratorConfig,
    prev: Vec<f64>,
    curr: Vec<f64>,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Integrator1D {
    /// Create an integrator. The configuration is validated.
    pub fn new(config: IntegratorConfig) -> Result<Self> {
        config.validate()?;
        let row = config.max_steps as usize;
        Ok(Self {
            config,
            prev: Vec::with_capacity(row),
            curr: Vec::with_capacity(row),
            xs: Vec::new(),
            ys: Vec::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Integrate a scalar function over `[a, b]`.
    pub fn integral<F>(&mut self, mut f: F, a: f64, b: f64) -> Result<Integral>
    where
        F: FnMut(f64) -> f64,
    {
        self.integral_batch(
            |xs, ys| {
                for (x, y) in xs.iter().zip(ys.iter_mut()) {
                    *y = f(*x);
                }
                Ok(())
            },
            a,
            b,
        )
    }

    /// Integrate a fallible scalar function over `[a, b]`.
    pub fn try_integral<F>(&mut self, mut f: F, a: f64, b: f64) -> Result<Integral>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        self.integral_batch(
            |xs, ys| {
                for (x, y) in xs.iter().zip(ys.iter_mut()) {
                    *y = f(*x)?;
                }
                Ok(())
            },
            a,
            b,
        )
    }

    /// Integrate over `[a, b]` with an integrand that fills `ys[i] = f(xs[i])`.
    ///
    /// `a > b` returns the negated integral over `[b, a]`; `a == b` returns 0.
    /// Non-convergence is not an error: the best estimate is returned with
    /// `converged == false` and a warning is logged. A NaN or infinite sum
    /// ends the refinement and is returned as the value.
    pub fn integral_batch<F>(&mut self, mut f: F, a: f64, b: f64) -> Result<Integral>
    where
        F: FnMut(&[f64], &mut [f64]) -> Result<()>,
    {
        if !(a.is_finite() && b.is_finite()) {
            return Err(Error::Validation(format!(
                "integration limits must be finite, got [{a}, {b}]"
            )));
        }
        if a == b {
            return Ok(Integral { value: 0.0, error: 0.0, steps: 0, converged: true });
        }
        if a > b {
            return self
                .integral_batch(f, b, a)
                .map(|r| Integral { value: -r.value, ..r });
        }

        let cfg = self.config;
        let range = b - a;
        let factor = cfg.rule.extrapolation_factor();

        self.prev.clear();
        self.curr.clear();
        let mut s = 0.0;
        let mut estimate = 0.0;
        let mut previous = f64::NAN;
        let mut error = f64::INFINITY;

        for step in 0..cfg.max_steps {
            s = self.refine(&mut f, cfg.rule, step, s, a, range)?;

            self.curr.clear();
            self.curr.push(s);
            if cfg.series_acceleration {
                let mut p = factor;
                for m in 1..=step as usize {
                    let lower = self.curr[m - 1];
                    let v = lower + (lower - self.prev[m - 1]) / (p - 1.0);
                    self.curr.push(v);
                    p *= factor;
                }
            }
            estimate = self.curr[self.curr.len() - 1];
            if !estimate.is_finite() {
                // Further refinement cannot recover a NaN or infinite sum.
                log::warn!(
                    "Integrator1D: estimate is {estimate} on [{a}, {b}] after {} steps",
                    step + 1
                );
                return Ok(Integral {
                    value: estimate,
                    error: f64::NAN,
                    steps: step + 1,
                    converged: false,
                });
            }
            if step > 0 {
                error = (estimate - previous).abs();
            }

            let n_steps = step + 1;
            if cfg.fixed_steps > 0 {
                if n_steps == cfg.fixed_steps {
                    return Ok(Integral { value: estimate, error, steps: n_steps, converged: true });
                }
            } else if step > 0 && n_steps >= cfg.min_steps {
                let converged = if estimate == 0.0 {
                    error <= cfg.eps_abs
                } else {
                    error <= cfg.eps_rel * estimate.abs()
                };
                if converged {
                    return Ok(Integral { value: estimate, error, steps: n_steps, converged: true });
                }
            }

            previous = estimate;
            std::mem::swap(&mut self.prev, &mut self.curr);
        }

        log::warn!(
            "Integrator1D: no convergence after {} {:?} steps on [{a}, {b}]: estimate {estimate:e}, last change {error:e}",
            cfg.max_steps,
            cfg.rule
        );
        Ok(Integral { value: estimate, error, steps: cfg.max_steps, converged: false })
    }

    /// Composite-rule sum after refinement `step` (0-based), given the sum of
    /// the previous step.
    fn refine<F>(
        &mut self,
        f: &mut F,
        rule: SummationRule,
        step: u32,
        previous: f64,
        a: f64,
        range: f64,
    ) -> Result<f64>
    where
        F: FnMut(&[f64], &mut [f64]) -> Result<()>,
    {
        match (rule, step) {
            (SummationRule::Trapezoid, 0) => {
                let ends = self.sum_points(f, 2, |i| if i == 0 { a } else { a + range })?;
                Ok(0.5 * range * ends)
            }
            (SummationRule::Trapezoid, _) => {
                // 2^(step-1) new points at the odd multiples of h.
                let n_new = 1u64 << (step - 1);
                let h = range / (1u64 << step) as f64;
                let new = self.sum_points(f, n_new, |i| a + (2 * i + 1) as f64 * h)?;
                Ok(0.5 * previous + h * new)
            }
            (SummationRule::Midpoint, 0) => {
                let mid = self.sum_points(f, 1, |_| a + 0.5 * range)?;
                Ok(range * mid)
            }
            (SummationRule::Midpoint, _) => {
                // Each old interval of width d gains points at d/6 and 5d/6.
                let n_old = 3u64.pow(step - 1);
                let d = range / n_old as f64;
                let (near, far) = (d / 6.0, 5.0 * d / 6.0);
                let new = self.sum_points(f, 2 * n_old, |i| {
                    let x0 = a + (i / 2) as f64 * d;
                    if i % 2 == 0 { x0 + near } else { x0 + far }
                })?;
                Ok(previous / 3.0 + d / 3.0 * new)
            }
        }
    }

    /// Compensated sum of `f` over `n` abscissae produced by `point`.
    fn sum_points<F, P>(&mut self, f: &mut F, n: u64, point: P) -> Result<f64>
    where
        F: FnMut(&[f64], &mut [f64]) -> Result<()>,
        P: Fn(u64) -> f64,
    {
        let mut acc = NeumaierSum::new();
        let mut start = 0u64;
        while start < n {
            let len = (n - start).min(CHUNK as u64) as usize;
            self.xs.clear();
            self.xs.extend((0..len as u64).map(|j| point(start + j)));
            self.ys.clear();
            self.ys.resize(len, 0.0);
            f(&self.xs, &mut self.ys)?;
            for &y in &self.ys {
                acc.add(y);
            }
            start += len as u64;
        }
        Ok(acc.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// `P(0 < Z < 1)` for a standard normal `Z`.
    const GAUSSIAN_0_1: f64 = 0.341_344_746_068_542_95;

    fn unit_gaussian(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    #[test]
    fn test_single_step_is_plain_trapezoid() {
        let f = |x: f64| 0.1 + 0.2 * x + 0.3 * x * x;
        let cfg = IntegratorConfig { fixed_steps: 1, ..IntegratorConfig::trapezoid(1, 1e-7) };
        let r = Integrator1D::new(cfg).unwrap().integral(f, -100.0, 100.0).unwrap();
        assert_eq!(r.steps, 1);
        assert_eq!(r.value, 0.5 * 200.0 * (f(-100.0) + f(100.0)));
    }

    #[test]
    fn test_quadratic_after_twenty_steps() {
        let cases = [(0.5, -0.2, -1.0, 2.0), (3.0, 1.5, 0.0, 10.0), (-2.0, 0.25, -50.0, 20.0)];
        for (a, b, lo, hi) in cases {
            let f = |x: f64| 0.1 + x * (a + b * x);
            let anti = |x: f64| 0.1 * x + a * x * x / 2.0 + b * x * x * x / 3.0;
            let cfg = IntegratorConfig { fixed_steps: 20, ..IntegratorConfig::trapezoid(20, 1e-7) };
            let r = Integrator1D::new(cfg).unwrap().integral(f, lo, hi).unwrap();
            assert_eq!(r.steps, 20);
            assert_relative_eq!(r.value, anti(hi) - anti(lo), max_relative = 1e-13);
        }
    }

    #[test]
    fn test_two_steps_without_acceleration() {
        let f = |x: f64| (x - 3.0).abs();
        let cfg = IntegratorConfig {
            fixed_steps: 2,
            series_acceleration: false,
            ..IntegratorConfig::trapezoid(2, 1e-7)
        };
        let r = Integrator1D::new(cfg).unwrap().integral(f, -100.0, 100.0).unwrap();
        let expected = 0.25 * 200.0 * (f(-100.0) + f(100.0)) + 0.5 * 200.0 * f(0.0);
        assert_relative_eq!(r.value, expected, max_relative = 1e-14);
    }

    #[test]
    fn test_polynomials_are_exact() {
        for rule in [SummationRule::Trapezoid, SummationRule::Midpoint] {
            let cfg = IntegratorConfig { rule, eps_rel: 1e-12, ..IntegratorConfig::default() };
            let mut integrator = Integrator1D::new(cfg).unwrap();

            let quad = integrator.integral(|x| 3.0 * x * x - x + 2.0, -1.0, 2.0).unwrap();
            assert!(quad.converged);
            assert_relative_eq!(quad.value, 13.5, max_relative = 1e-12);

            let quartic = integrator.integral(|x| x.powi(4), 0.0, 2.0).unwrap();
            assert!(quartic.converged);
            assert_relative_eq!(quartic.value, 32.0 / 5.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_gaussian_error_shrinks_with_steps() {
        let exact = GAUSSIAN_0_1;
        let mut previous_err = f64::INFINITY;
        for steps in 2..=6 {
            let cfg =
                IntegratorConfig { fixed_steps: steps, ..IntegratorConfig::trapezoid(steps, 1e-7) };
            let r = Integrator1D::new(cfg).unwrap().integral(unit_gaussian, 0.0, 1.0).unwrap();
            let err = (r.value - exact).abs();
            assert!(err <= previous_err.max(1e-15), "steps={steps}: {err} > {previous_err}");
            previous_err = err;
        }
        assert!(previous_err < 1e-14);
    }

    #[test]
    fn test_midpoint_gaussian() {
        let exact = GAUSSIAN_0_1;
        let cfg = IntegratorConfig { fixed_steps: 4, ..IntegratorConfig::midpoint(4, 1e-7) };
        let r = Integrator1D::new(cfg).unwrap().integral(unit_gaussian, 0.0, 1.0).unwrap();
        assert!((r.value - exact).abs() < 1e-10);
    }

    #[test]
    fn test_log_within_requested_tolerance() {
        let exact = {
            let anti = |x: f64| x * (0.2 * x).ln() - x;
            anti(50.0) - anti(0.1)
        };
        for eps in [1e-1, 1e-3, 1e-6, 1e-8] {
            let cfg = IntegratorConfig::trapezoid(20, eps);
            let r = Integrator1D::new(cfg).unwrap().integral(|x| (0.2 * x).ln(), 0.1, 50.0).unwrap();
            assert!(r.converged);
            assert!(((r.value - exact) / exact).abs() < eps, "eps={eps}: {} vs {exact}", r.value);
        }
    }

    #[test]
    fn test_midpoint_avoids_endpoints() {
        let cfg = IntegratorConfig::midpoint(12, 1e-6);
        let r = Integrator1D::new(cfg)
            .unwrap()
            .integral(|x| if x == 0.0 || x == 1.0 { f64::NAN } else { 2.0 * x }, 0.0, 1.0)
            .unwrap();
        assert_relative_eq!(r.value, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_degenerate_and_reversed_limits() {
        let mut integrator = Integrator1D::new(IntegratorConfig::default()).unwrap();
        let zero = integrator.integral(|x| x, 2.0, 2.0).unwrap();
        assert_eq!(zero.value, 0.0);
        assert!(zero.converged);

        let forward = integrator.integral(|x| x * x, 0.0, 3.0).unwrap();
        let backward = integrator.integral(|x| x * x, 3.0, 0.0).unwrap();
        assert_relative_eq!(backward.value, -forward.value, max_relative = 1e-15);
    }

    #[test]
    fn test_non_finite_limits_rejected() {
        let mut integrator = Integrator1D::new(IntegratorConfig::default()).unwrap();
        let err = integrator.integral(|x| x, 0.0, f64::INFINITY).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_non_finite_integrand_propagates() {
        let mut integrator = Integrator1D::new(IntegratorConfig::default()).unwrap();
        let pole = integrator.integral(|x| 1.0 / x, 0.0, 1.0).unwrap();
        assert!(pole.value.is_infinite());
        assert!(!pole.converged);
        assert_eq!(pole.steps, 1);

        let mut calls = 0;
        let nan = integrator
            .integral(
                |x| {
                    calls += 1;
                    if x > 0.5 { f64::NAN } else { x }
                },
                0.0,
                1.0,
            )
            .unwrap();
        assert!(nan.value.is_nan());
        assert!(!nan.converged);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_non_convergence_returns_best_estimate() {
        let cfg = IntegratorConfig { eps_rel: 0.0, ..IntegratorConfig::trapezoid(6, 0.0) };
        let r = Integrator1D::new(cfg).unwrap().integral(|x| x.sqrt(), 0.0, 1.0).unwrap();
        assert!(!r.converged);
        assert_eq!(r.steps, 6);
        assert!((r.value - 2.0 / 3.0).abs() < 1e-2);
    }

    #[test]
    fn test_zero_integral_uses_absolute_tolerance() {
        let mut integrator = Integrator1D::new(IntegratorConfig::default()).unwrap();
        let r = integrator.integral(|x| x, -1.0, 1.0).unwrap();
        assert!(r.converged);
        assert_eq!(r.steps, 3);
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn test_integrand_errors_propagate() {
        let mut integrator = Integrator1D::new(IntegratorConfig::default()).unwrap();
        let failing = |x: f64| {
            if x > 0.5 { Err(Error::Validation("outside the allowed range".into())) } else { Ok(x) }
        };
        let err = integrator.try_integral(failing, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_batch_integrand_sees_chunks() {
        let mut calls = 0usize;
        let mut max_len = 0usize;
        let cfg = IntegratorConfig { fixed_steps: 15, ..IntegratorConfig::trapezoid(15, 1e-7) };
        let r = Integrator1D::new(cfg)
            .unwrap()
            .integral_batch(
                |xs, ys| {
                    calls += 1;
                    max_len = max_len.max(xs.len());
                    for (x, y) in xs.iter().zip(ys.iter_mut()) {
                        *y = x.exp();
                    }
                    Ok(())
                },
                0.0,
                1.0,
            )
            .unwrap();
        assert_relative_eq!(r.value, 1f64.exp() - 1.0, max_relative = 1e-14);
        assert!(max_len <= CHUNK);
        // 2 + 1 + 2 + ... + 2^13 points; the largest step is split in two.
        assert!(calls >= 15);
    }
}
