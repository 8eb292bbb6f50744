//! This library gathers the statistics utilities used around lagged surrogate
//! models:
//!
//! * streaming mean and variance with O(1) memory, see [`recursive_moments`] and [`MomentState`],
//! * equal-width discretization of continuous targets for classification
//!   surrogates, see [`Binning`] and [`discretize`],
//! * column-wise standardization of training data, see [`NormalizedData`].
//!
//! None of these utilities keeps hidden state: moments are threaded by the
//! caller and binnings are rebuilt from scratch on each call.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod binning;
mod errors;
mod moments;
mod normalization;

pub use binning::*;
pub use errors::*;
pub use moments::*;
pub use normalization::*;
