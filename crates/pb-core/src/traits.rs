//! Core traits for pdfbatch
//!
//! PDFs never own their inputs. Every evaluation receives a [`ValueSource`]
//! which resolves variable names to the current scalar value, to per-event
//! batch data, and to observable metadata (bounds, binning). Keeping this seam
//! in the core crate lets numeric code stay independent of how the data is
//! stored or scoped.

use crate::types::Binning;

/// Source of parameter and observable values for one evaluation.
///
/// Implementations must be shareable across threads: disjoint batch windows of
/// the same source may be evaluated concurrently.
pub trait ValueSource: Sync {
    /// Current scalar value of `name`, if known.
    fn value(&self, name: &str) -> Option<f64>;

    /// Per-event data of `name` for the event range `[begin, begin + size)`.
    ///
    /// Returns `None` when the variable has no batch data (scalar mode). The
    /// returned slice may be shorter than `size` if the column ends early.
    fn batch(&self, name: &str, begin: usize, size: usize) -> Option<&[f64]>;

    /// Support `(low, high)` of an observable, if defined.
    fn bounds(&self, name: &str) -> Option<(f64, f64)>;

    /// Binning of an observable, if defined.
    fn binning(&self, name: &str) -> Option<&Binning>;
}
