//! # pb-batch
//!
//! Batched evaluation of probability density functions.
//!
//! This crate provides:
//! - A [`RunContext`] holding scalar values, event columns and observable
//!   metadata, plus scoped views that substitute a single variable.
//! - Shape dispatch ([`dispatch`]) that turns any mix of per-event spans and
//!   scalars into one specialized kernel loop.
//! - Gaussian, Landau, Poisson and Exponential PDFs implementing [`BatchPdf`]
//!   with identical scalar and batch results.
//! - A Romberg-style integrator ([`Integrator1D`]) and PDF normalization.
//! - [`BinSamplingPdf`], which replaces point values by bin averages.
//! - Parallel evaluation over event windows ([`evaluate_batch_parallel`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bin_sampling;
pub mod config;
pub mod dispatch;
pub mod integrator;
pub mod parallel;
pub mod pdf;
pub mod run_context;

pub use bin_sampling::BinSamplingPdf;
pub use config::{IntegratorConfig, SummationRule};
pub use integrator::{Integral, Integrator1D};
pub use parallel::evaluate_batch_parallel;
pub use pdf::{
    BatchPdf, ExponentialPdf, GaussianPdf, LandauPdf, PdfIntegrand, PoissonPdf, Proxy,
    normalization_integral, normalized_batch, normalized_value,
};
pub use run_context::{ColumnBinding, EventBinding, ObservableSpec, RunContext, ScopedBinding};
