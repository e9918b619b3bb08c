//! Integrator configuration.

use pb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported number of Trapezoid refinement steps (`2^39` subintervals).
pub const MAX_TRAPEZOID_STEPS: u32 = 40;
/// Largest supported number of Midpoint refinement steps (`3^24` subintervals).
pub const MAX_MIDPOINT_STEPS: u32 = 25;

/// Composite rule refined at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummationRule {
    /// Closed rule; each step halves the subinterval width.
    #[default]
    Trapezoid,
    /// Open rule; each step divides the subinterval width by three. Never
    /// evaluates the integrand at the limits.
    Midpoint,
}

impl SummationRule {
    /// Ratio between the leading error terms of two successive steps.
    pub(crate) fn extrapolation_factor(self) -> f64 {
        match self {
            Self::Trapezoid => 4.0,
            Self::Midpoint => 9.0,
        }
    }

    fn max_steps_limit(self) -> u32 {
        match self {
            Self::Trapezoid => MAX_TRAPEZOID_STEPS,
            Self::Midpoint => MAX_MIDPOINT_STEPS,
        }
    }
}

/// Configuration of the Romberg-style 1-D integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Summation rule.
    pub rule: SummationRule,
    /// Maximum number of refinement steps.
    pub max_steps: u32,
    /// Convergence is not tested before this many steps.
    pub min_steps: u32,
    /// If non-zero, return after exactly this many steps without testing convergence.
    pub fixed_steps: u32,
    /// Relative tolerance on the change between successive estimates.
    pub eps_rel: f64,
    /// Absolute tolerance, used when the estimate is exactly zero.
    pub eps_abs: f64,
    /// Apply Richardson extrapolation across refinement levels.
    pub series_acceleration: bool,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rule: SummationRule::Trapezoid,
            max_steps: 20,
            min_steps: 3,
            fixed_steps: 0,
            eps_rel: 1e-7,
            eps_abs: 1e-10,
            series_acceleration: true,
        }
    }
}

impl IntegratorConfig {
    /// Trapezoid rule with the given step budget and relative tolerance.
    pub fn trapezoid(max_steps: u32, eps_rel: f64) -> Self {
        Self { rule: SummationRule::Trapezoid, max_steps, eps_rel, ..Self::default() }
    }

    /// Midpoint rule with the given step budget and relative tolerance.
    pub fn midpoint(max_steps: u32, eps_rel: f64) -> Self {
        Self { rule: SummationRule::Midpoint, max_steps, eps_rel, ..Self::default() }
    }

    /// Check that the configuration can be run.
    pub fn validate(&self) -> Result<()> {
        let limit = self.rule.max_steps_limit();
        if self.max_steps == 0 || self.max_steps > limit {
            return Err(Error::Validation(format!(
                "max_steps must be in [1, {limit}] for {:?}, got {}",
                self.rule, self.max_steps
            )));
        }
        if self.fixed_steps > self.max_steps {
            return Err(Error::Validation(format!(
                "fixed_steps ({}) exceeds max_steps ({})",
                self.fixed_steps, self.max_steps
            )));
        }
        if !self.eps_rel.is_finite() || self.eps_rel < 0.0 {
            return Err(Error::Validation(format!(
                "eps_rel must be finite and >= 0, got {}",
                self.eps_rel
            )));
        }
        if !self.eps_abs.is_finite() || self.eps_abs < 0.0 {
            return Err(Error::Validation(format!(
                "eps_abs must be finite and >= 0, got {}",
                self.eps_abs
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
