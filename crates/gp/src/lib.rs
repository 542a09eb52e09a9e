//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! able to learn from function values *and* derivatives observations.
//!
//! Derivative observations are handled by augmenting inputs with a flag column telling whether
//! an output is a function value or a partial derivative at the given location
//! (see [`DerivativeDataset`]). A derivative-aware kernel then computes the joint covariance
//! of values and derivatives:
//! * [`DerivativeKernel`] derives it from any twice differentiable kernel
//!   (see [`kernels`] module: squared exponential, matern 5/2),
//! * [`RbfDerivativeKernel`] computes it in closed form for the squared exponential kernel.
//!
//! GP regression is implemented by [GaussianProcess] parameterized by [GpParams].
//! Hyperparameters are trained by maximizing the log marginal likelihood, each optimizer
//! iteration being recorded in a [TrainingTrace].
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod dataset;
pub mod derivative_kernels;
mod errors;
pub mod kernels;

mod parameters;
mod utils;

mod optimization;

pub use algorithm::*;
pub use dataset::*;
pub use derivative_kernels::{AugmentedKernel, DerivativeKernel, RbfDerivativeKernel};
pub use errors::*;
pub use kernels::{DifferentiableKernel, Kernel, Matern52Kernel, SquaredExponentialKernel};
pub use optimization::TrainingTrace;
pub use parameters::*;
pub use utils::{augment, pairwise_differences};
