//! This library connects lagged features to regression backends for online use
//! inside a running simulation.
//!
//! * [`Surrogate`] is the `fit` / `predict` contract a backend has to fulfill,
//!   predictions coming with an uncertainty estimate.
//! * [`GpConfig`] describes a Gaussian process backend from a closed set of
//!   [`Backend`]s; unsupported combinations are rejected at validation.
//! * [`GaussianProcess`] is the Gaussian process driven by such a configuration.
//! * [`OnlineSurrogate`] trains a model on lagged data and predicts at each
//!   simulation step from the streaming feature history.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod backend;
mod errors;
mod gp;
mod online;
mod surrogate;

pub use backend::*;
pub use errors::*;
pub use gp::*;
pub use online::*;
pub use surrogate::*;
