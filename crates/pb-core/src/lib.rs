//! # pb-core
//!
//! Core types, traits, and error handling for pdfbatch.
//!
//! This crate provides:
//! - Common error types
//! - The [`ValueSource`] seam through which PDFs pull scalar and per-event inputs
//! - Span/adapter types used by the batch kernels ([`BatchInput`], [`Bracket`], [`Broadcast`])
//! - Observable binnings with generation stamps ([`Binning`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod span;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use span::{BatchInput, Bracket, Broadcast, EvaluateInfo};
pub use traits::ValueSource;
pub use types::Binning;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
