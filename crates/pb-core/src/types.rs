//! Common data types for pdfbatch

use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Ordered bin edges of one observable.
///
/// Every constructed binning carries a process-unique generation stamp.
/// Clones keep the stamp (same shape); building a new binning always yields a
/// new one. Caches derived from a binning store the stamp and compare it
/// instead of relying on dirty flags.
#[derive(Debug, Clone)]
pub struct Binning {
    edges: Vec<f64>,
    generation: u64,
}

impl PartialEq for Binning {
    fn eq(&self, other: &Self) -> bool {
        self.edges == other.edges
    }
}

impl Binning {
    /// `n_bins` equal-width bins on `[low, high]`.
    pub fn uniform(n_bins: usize, low: f64, high: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Validation("Binning requires at least 1 bin".into()));
        }
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::Validation(format!(
                "Binning range must be finite with low < high, got ({low}, {high})"
            )));
        }
        let width = (high - low) / n_bins as f64;
        let mut edges: Vec<f64> = (0..n_bins).map(|i| low + i as f64 * width).collect();
        edges.push(high);
        Self::from_edges(edges)
    }

    /// Variable-width bins from explicit edges.
    pub fn from_edges(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Validation(format!(
                "Binning requires at least 2 bin edges, got {}",
                edges.len()
            )));
        }
        for (i, e) in edges.iter().enumerate() {
            if !e.is_finite() {
                return Err(Error::Validation(format!("bin edge [{i}] must be finite, got {e}")));
            }
            if i > 0 && edges[i - 1] >= *e {
                return Err(Error::Validation(format!(
                    "bin edges must be strictly increasing, got edges[{}]={} and edges[{}]={}",
                    i - 1,
                    edges[i - 1],
                    i,
                    e
                )));
            }
        }
        Ok(Self { edges, generation: next_generation() })
    }

    /// All bin boundaries, ascending.
    pub fn boundaries(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Lower edge of bin `i`.
    pub fn bin_low(&self, i: usize) -> f64 {
        self.edges[i]
    }

    /// Upper edge of bin `i`.
    pub fn bin_high(&self, i: usize) -> f64 {
        self.edges[i + 1]
    }

    /// Width of bin `i`.
    pub fn bin_width(&self, i: usize) -> f64 {
        self.edges[i + 1] - self.edges[i]
    }

    /// Bin containing `x`, or `None` outside `[first edge, last edge]`.
    ///
    /// Bins are half-open `[low, high)` except the last, which includes its
    /// upper edge.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        bin_index_in(&self.edges, x)
    }

    /// Generation stamp of this binning.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Upper-bound lookup of `x` in sorted `edges`.
///
/// Shared by [`Binning::bin_index`] and caches holding a copy of the edges.
pub fn bin_index_in(edges: &[f64], x: f64) -> Option<usize> {
    let (&first, &last) = (edges.first()?, edges.last()?);
    if !(x >= first && x <= last) {
        return None;
    }
    let n_bins = edges.len() - 1;
    if x >= last {
        return Some(n_bins - 1);
    }
    // `k` is the number of edges <= x, so the bin index is k-1.
    let k = edges.partition_point(|e| *e <= x);
    Some(k - 1)
}
