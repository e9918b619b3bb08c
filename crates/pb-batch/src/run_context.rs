//! Owned evaluation state and scoped views over it.
//!
//! [`RunContext`] maps variable names to scalar values, per-event columns,
//! observable bounds and binnings. PDFs only see it through
//! [`ValueSource`], which also lets integrators substitute a single variable
//! without touching the shared context ([`ScopedBinding`], [`ColumnBinding`],
//! [`EventBinding`]).

use pb_core::{Binning, Error, Result, ValueSource};
use std::collections::HashMap;

/// Observable definition: name, support and optional binning.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableSpec {
    /// Variable name.
    pub name: String,
    /// Support `(low, high)`.
    pub bounds: (f64, f64),
    /// Binning used by bin-sampled PDFs.
    pub binning: Option<Binning>,
}

impl ObservableSpec {
    /// Observable without a binning.
    pub fn new(name: impl Into<String>, bounds: (f64, f64)) -> Self {
        Self { name: name.into(), bounds, binning: None }
    }

    /// Observable with `n_bins` equal-width bins over its bounds.
    pub fn uniform(name: impl Into<String>, bounds: (f64, f64), n_bins: usize) -> Result<Self> {
        let binning = Binning::uniform(n_bins, bounds.0, bounds.1)?;
        Ok(Self { name: name.into(), bounds, binning: Some(binning) })
    }

    /// Observable with explicit bin edges; the bounds are the outer edges.
    pub fn with_edges(name: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        let binning = Binning::from_edges(edges)?;
        let b = binning.boundaries();
        let bounds = (b[0], b[b.len() - 1]);
        Ok(Self { name: name.into(), bounds, binning: Some(binning) })
    }

    fn validate(&self) -> Result<()> {
        let (lo, hi) = self.bounds;
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            return Err(Error::Validation(format!(
                "observable '{}' requires low < high, got ({lo}, {hi})",
                self.name
            )));
        }
        Ok(())
    }
}

/// Scalar values, event columns and observable metadata for one run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    values: HashMap<String, f64>,
    columns: HashMap<String, Vec<f64>>,
    bounds: HashMap<String, (f64, f64)>,
    binnings: HashMap<String, Binning>,
}

impl RunContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from observables and their event columns.
    ///
    /// All columns must have the same length and every value must lie inside
    /// the bounds of its observable.
    pub fn from_observables(
        observables: Vec<ObservableSpec>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let mut ctx = Self::new();
        for obs in observables {
            ctx.add_observable(obs)?;
        }

        let mut n_events: Option<usize> = None;
        for (name, column) in columns {
            match n_events {
                None => n_events = Some(column.len()),
                Some(n) if n != column.len() => {
                    return Err(Error::Validation(format!(
                        "column length mismatch for '{name}': expected {n}, got {}",
                        column.len()
                    )));
                }
                Some(_) => {}
            }
            if let Some(&(lo, hi)) = ctx.bounds.get(&name) {
                if let Some((i, v)) =
                    column.iter().enumerate().find(|(_, v)| !(**v >= lo && **v <= hi))
                {
                    return Err(Error::Validation(format!(
                        "column '{name}' event {i} = {v} outside bounds ({lo}, {hi})"
                    )));
                }
            }
            ctx.columns.insert(name, column);
        }
        Ok(ctx)
    }

    /// Register an observable. Its scalar value starts at the center of its
    /// bounds (or the finite bound, if the other is infinite).
    pub fn add_observable(&mut self, obs: ObservableSpec) -> Result<()> {
        obs.validate()?;
        let (lo, hi) = obs.bounds;
        let start = match (lo.is_finite(), hi.is_finite()) {
            (true, true) => 0.5 * (lo + hi),
            (true, false) => lo,
            (false, true) => hi,
            (false, false) => 0.0,
        };
        self.values.entry(obs.name.clone()).or_insert(start);
        self.bounds.insert(obs.name.clone(), obs.bounds);
        if let Some(binning) = obs.binning {
            self.binnings.insert(obs.name, binning);
        }
        Ok(())
    }

    /// Set the scalar value of a variable.
    pub fn set_value(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Attach per-event data to a variable. Replaces any previous column.
    pub fn set_column(&mut self, name: impl Into<String>, column: Vec<f64>) {
        self.columns.insert(name.into(), column);
    }

    /// Detach per-event data; the variable falls back to its scalar value.
    pub fn remove_column(&mut self, name: &str) -> Option<Vec<f64>> {
        self.columns.remove(name)
    }

    /// Full column of a variable.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Set the support of an observable.
    pub fn set_bounds(&mut self, name: impl Into<String>, bounds: (f64, f64)) -> Result<()> {
        let name = name.into();
        let (lo, hi) = bounds;
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            return Err(Error::Validation(format!(
                "bounds of '{name}' require low < high, got ({lo}, {hi})"
            )));
        }
        self.bounds.insert(name, bounds);
        Ok(())
    }

    /// Replace the binning of an observable.
    pub fn set_binning(&mut self, name: impl Into<String>, binning: Binning) {
        self.binnings.insert(name.into(), binning);
    }

    /// Number of events: the shortest attached column (0 without columns).
    pub fn n_events(&self) -> usize {
        self.columns.values().map(Vec::len).min().unwrap_or(0)
    }
}

impl ValueSource for RunContext {
    fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    fn batch(&self, name: &str, begin: usize, size: usize) -> Option<&[f64]> {
        let column = self.columns.get(name)?;
        let start = begin.min(column.len());
        let end = begin.saturating_add(size).min(column.len());
        Some(&column[start..end])
    }

    fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        self.bounds.get(name).copied()
    }

    fn binning(&self, name: &str) -> Option<&Binning> {
        self.binnings.get(name)
    }
}

/// View of a source in which one variable is pinned to a scalar value and
/// has no batch data. Everything else is delegated.
#[derive(Clone, Copy)]
pub struct ScopedBinding<'a> {
    base: &'a dyn ValueSource,
    name: &'a str,
    value: f64,
}

impl<'a> ScopedBinding<'a> {
    /// Pin `name` to `value` on top of `base`.
    pub fn new(base: &'a dyn ValueSource, name: &'a str, value: f64) -> Self {
        Self { base, name, value }
    }
}

impl ValueSource for ScopedBinding<'_> {
    fn value(&self, name: &str) -> Option<f64> {
        if name == self.name { Some(self.value) } else { self.base.value(name) }
    }

    fn batch(&self, name: &str, begin: usize, size: usize) -> Option<&[f64]> {
        if name == self.name { None } else { self.base.batch(name, begin, size) }
    }

    fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        self.base.bounds(name)
    }

    fn binning(&self, name: &str) -> Option<&Binning> {
        self.base.binning(name)
    }
}

/// View of a source in which one variable takes its batch data from a
/// borrowed slice and every other variable is scalar-only.
///
/// Used to evaluate a PDF at many abscissae of one variable while all other
/// parameters stay at their current values.
#[derive(Clone, Copy)]
pub struct ColumnBinding<'a> {
    base: &'a dyn ValueSource,
    name: &'a str,
    column: &'a [f64],
}

impl<'a> ColumnBinding<'a> {
    /// Bind `column` to `name` on top of `base`.
    pub fn new(base: &'a dyn ValueSource, name: &'a str, column: &'a [f64]) -> Self {
        Self { base, name, column }
    }
}

impl ValueSource for ColumnBinding<'_> {
    fn value(&self, name: &str) -> Option<f64> {
        self.base.value(name)
    }

    fn batch(&self, name: &str, begin: usize, size: usize) -> Option<&[f64]> {
        if name != self.name {
            return None;
        }
        let start = begin.min(self.column.len());
        let end = begin.saturating_add(size).min(self.column.len());
        Some(&self.column[start..end])
    }

    fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        self.base.bounds(name)
    }

    fn binning(&self, name: &str) -> Option<&Binning> {
        self.base.binning(name)
    }
}

/// View of a source with several variables pinned to the values of one
/// event. Pinned variables have no batch data.
#[derive(Clone, Copy)]
pub struct EventBinding<'a> {
    base: &'a dyn ValueSource,
    names: &'a [&'a str],
    values: &'a [f64],
}

impl<'a> EventBinding<'a> {
    /// Pin `names[k]` to `values[k]` on top of `base`.
    pub fn new(base: &'a dyn ValueSource, names: &'a [&'a str], values: &'a [f64]) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { base, names, values }
    }

    fn pinned(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| *n == name).map(|k| self.values[k])
    }
}

impl ValueSource for EventBinding<'_> {
    fn value(&self, name: &str) -> Option<f64> {
        self.pinned(name).or_else(|| self.base.value(name))
    }

    fn batch(&self, name: &str, begin: usize, size: usize) -> Option<&[f64]> {
        if self.pinned(name).is_some() { None } else { self.base.batch(name, begin, size) }
    }

    fn bounds(&self, name: &str) -> Option<(f64, f64)> {
        self.base.bounds(name)
    }

    fn binning(&self, name: &str) -> Option<&Binning> {
        self.base.binning(name)
    }
}
