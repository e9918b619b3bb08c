//! Numeric kernels for pdfbatch.
//!
//! Every kernel comes in two shapes:
//! - a scalar `evaluate(..)` for a single point
//! - a generic `compute(out, ..)` loop over [`pb_core::Bracket`] inputs, so the
//!   compiler emits one specialization per batched/broadcast combination
//!
//! Both shapes share the same per-element arithmetic, so batch results are
//! bit-identical to scalar evaluations. Kernels are pure and hold no state;
//! disjoint output ranges may be computed concurrently.
//!
//! Domain violations (e.g. `sigma <= 0`) are not errors here: they propagate as
//! NaN/inf or are masked to zero as documented per kernel.

pub mod exponential;
pub mod gaussian;
pub mod landau;
pub mod math;
pub mod poisson;
