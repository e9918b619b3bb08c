//! Read-only views over per-event values and the constant broadcast adapter.
//!
//! Kernels are written against [`Bracket`], so the same loop body serves
//! per-event slices and scalars that are constant over a batch. Which of the
//! two an input is gets decided once per batch call through [`BatchInput`].

use crate::{Error, Result};

/// Indexed read access to per-event values.
pub trait Bracket: Copy {
    /// Value for event `i` of the current batch.
    fn at(&self, i: usize) -> f64;
}

impl Bracket for &[f64] {
    #[inline(always)]
    fn at(&self, i: usize) -> f64 {
        self[i]
    }
}

/// A scalar presented as if it were a per-event array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Broadcast(pub f64);

impl Bracket for Broadcast {
    #[inline(always)]
    fn at(&self, _i: usize) -> f64 {
        self.0
    }
}

/// One input of a batch computation: either span data or a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchInput<'a> {
    /// Per-event values for the requested range.
    Batched(&'a [f64]),
    /// Value constant over the whole batch.
    Scalar(f64),
}

impl<'a> BatchInput<'a> {
    /// True if this input carries non-empty span data.
    pub fn is_batched(&self) -> bool {
        matches!(self, Self::Batched(s) if !s.is_empty())
    }

    /// Span length (`0` for scalars).
    pub fn len(&self) -> usize {
        match self {
            Self::Batched(s) => s.len(),
            Self::Scalar(_) => 0,
        }
    }

    /// True if there is no span data.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value for event `i`. Scalars and length-1 spans broadcast.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        match self {
            Self::Batched(s) if s.len() == 1 => s[0],
            Self::Batched(s) => s[i],
            Self::Scalar(v) => *v,
        }
    }

    /// Collapse trivially broadcastable spans (length 1) into scalars.
    ///
    /// Empty spans cannot be collapsed and are returned unchanged; callers are
    /// expected to have resolved them to a scalar value already.
    pub fn broadcast_trivial(self) -> Self {
        match self {
            Self::Batched(s) if s.len() == 1 => Self::Scalar(s[0]),
            other => other,
        }
    }
}

impl Bracket for BatchInput<'_> {
    #[inline]
    fn at(&self, i: usize) -> f64 {
        self.get(i)
    }
}

/// Shape of a batch call derived from its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluateInfo {
    /// Number of events that can be evaluated.
    pub size: usize,
    /// Number of inputs that supplied span data.
    pub n_batched: usize,
}

impl EvaluateInfo {
    /// Inspect a set of inputs.
    ///
    /// `size` is the minimum length over spans longer than one element. If only
    /// length-1 spans are present, `size` is 1. Scalars do not constrain it.
    pub fn of(inputs: &[BatchInput<'_>]) -> Self {
        let mut n_batched = 0usize;
        let mut size: Option<usize> = None;
        for input in inputs {
            if !input.is_batched() {
                continue;
            }
            n_batched += 1;
            let n = input.len();
            if n > 1 {
                size = Some(size.map_or(n, |s| s.min(n)));
            }
        }
        let size = match size {
            Some(s) => s,
            None if n_batched > 0 => 1,
            None => 0,
        };
        Self { size, n_batched }
    }

    /// Fail with a logic error if no input supplied batch data.
    pub fn require_batch(self) -> Result<Self> {
        if self.n_batched == 0 {
            return Err(Error::Logic(
                "requested a batch computation, but no batch data available".into(),
            ));
        }
        Ok(self)
    }
}

/// True if the two slices share any memory.
pub fn overlaps(a: &[f64], b: &[f64]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let a0 = a.as_ptr() as usize;
    let a1 = a0 + std::mem::size_of_val(a);
    let b0 = b.as_ptr() as usize;
    let b1 = b0 + std::mem::size_of_val(b);
    a0 < b1 && b0 < a1
}
