use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::GP_OPTIM_MAX_ITERS;
use linfa::{Float, ParamGuard};

use ndarray::{array, Array1};

/// An enum to represent a scalar hyper parameter tuning
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamTuning<F: Float> {
    /// Constant parameter (ie given not estimated)
    Fixed(F),
    /// Parameter is optimized between given bounds (lower, upper) starting from the inital guess
    Optimized {
        /// Initial guess for the parameter
        init: F,
        /// Bounds for the parameter (lower, upper)
        bounds: (F, F),
    },
}

impl<F: Float> Default for ParamTuning<F> {
    fn default() -> Self {
        ParamTuning::Optimized {
            init: F::cast(ParamTuning::<F>::DEFAULT_INIT),
            bounds: (
                F::cast(ParamTuning::<F>::DEFAULT_BOUNDS.0),
                F::cast(ParamTuning::<F>::DEFAULT_BOUNDS.1),
            ),
        }
    }
}

impl<F: Float> ParamTuning<F> {
    /// Default initial noise variance
    pub const DEFAULT_INIT: f64 = 1.;
    /// Default bounds for noise variance
    pub const DEFAULT_BOUNDS: (f64, f64) = (1e-6, 1e1);

    /// Get initial value
    pub fn init(&self) -> F {
        match self {
            ParamTuning::Optimized { init, bounds: _ } => *init,
            ParamTuning::Fixed(value) => *value,
        }
    }

    /// Get bounds if the parameter is to be optimized
    pub fn bounds(&self) -> Option<(F, F)> {
        match self {
            ParamTuning::Optimized { init: _, bounds } => Some(*bounds),
            ParamTuning::Fixed(_) => None,
        }
    }

    /// Whether the parameter is tuned by likelihood maximization
    pub fn is_trainable(&self) -> bool {
        matches!(self, ParamTuning::Optimized { .. })
    }
}

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct GpValidParams<F: Float, K: Kernel<F>> {
    /// Covariance kernel, its hyperparameters being the optimization starting point
    pub(crate) kernel: K,
    /// Likelihood (observation noise) variance tuning
    pub(crate) noise_tuning: ParamTuning<F>,
    /// Bounds of kernel hyperparameters, one pair for all or one pair per hyperparameter
    pub(crate) kernel_bounds: Array1<(F, F)>,
    /// Max number of optimizer iterations
    pub(crate) max_iters: usize,
    /// Parameter to improve numerical stability
    pub(crate) nugget: F,
}

impl<F: Float, K: Kernel<F>> GpValidParams<F, K> {
    /// Default bounds for kernel hyperparameters
    pub const DEFAULT_KERNEL_BOUNDS: (f64, f64) = (1e-3, 1e3);

    /// Get the kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get noise variance tuning
    pub fn noise_tuning(&self) -> &ParamTuning<F> {
        &self.noise_tuning
    }

    /// Get bounds of kernel hyperparameters
    pub fn kernel_bounds(&self) -> &Array1<(F, F)> {
        &self.kernel_bounds
    }

    /// Get the max number of optimizer iterations
    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Get nugget
    pub fn nugget(&self) -> F {
        self.nugget
    }

    /// Bounds of each kernel hyperparameter
    pub(crate) fn expanded_kernel_bounds(&self) -> Vec<(F, F)> {
        let n = self.kernel.hyperparameters().len();
        if self.kernel_bounds.len() == 1 {
            vec![self.kernel_bounds[0]; n]
        } else {
            self.kernel_bounds.to_vec()
        }
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
pub struct GpParams<F: Float, K: Kernel<F>>(GpValidParams<F, K>);

impl<F: Float, K: Kernel<F>> GpParams<F, K> {
    /// A constructor for GP parameters given the covariance kernel
    pub fn new(kernel: K) -> GpParams<F, K> {
        let bounds = GpValidParams::<F, K>::DEFAULT_KERNEL_BOUNDS;
        Self(GpValidParams {
            kernel,
            noise_tuning: ParamTuning::default(),
            kernel_bounds: array![(F::cast(bounds.0), F::cast(bounds.1))],
            max_iters: GP_OPTIM_MAX_ITERS,
            nugget: F::cast(100.0) * F::epsilon(),
        })
    }

    /// Set the kernel.
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set noise variance tuning
    pub fn noise_tuning(mut self, noise_tuning: ParamTuning<F>) -> Self {
        self.0.noise_tuning = noise_tuning;
        self
    }

    /// Set noise variance to a constant value excluded from training
    pub fn fixed_noise_variance(mut self, variance: F) -> Self {
        self.0.noise_tuning = ParamTuning::Fixed(variance);
        self
    }

    /// Set kernel hyperparameters search space.
    ///
    /// Either one (lower, upper) pair applied to every hyperparameter or
    /// one pair per hyperparameter.
    pub fn kernel_bounds(mut self, kernel_bounds: Array1<(F, F)>) -> Self {
        self.0.kernel_bounds = kernel_bounds;
        self
    }

    /// Set the max number of optimizer iterations, 0 disables training
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.0.max_iters = max_iters;
        self
    }

    /// Set nugget.
    ///
    /// Nugget is used to improve numerical stability
    pub fn nugget(mut self, nugget: F) -> Self {
        self.0.nugget = nugget;
        self
    }
}

fn check_bounds<F: Float>(name: &str, bounds: (F, F)) -> Result<()> {
    let (lo, up) = bounds;
    if !(lo > F::zero() && lo <= up && up.is_finite()) {
        return Err(GpError::InvalidValueError(format!(
            "Bounds of {name} should verify 0 < lower <= upper < inf, got ({lo}, {up})"
        )));
    }
    Ok(())
}

impl<F: Float, K: Kernel<F>> ParamGuard for GpParams<F, K> {
    type Checked = GpValidParams<F, K>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let hyperparameters = self.0.kernel.hyperparameters();
        if hyperparameters.iter().any(|v| !(*v > F::zero() && v.is_finite())) {
            return Err(GpError::InvalidValueError(format!(
                "Kernel hyperparameters should be positive, got {hyperparameters}"
            )));
        }

        let nb = self.0.kernel_bounds.len();
        if nb != 1 && nb != hyperparameters.len() {
            return Err(GpError::InvalidValueError(format!(
                "Expected 1 or {} kernel bounds, got {}",
                hyperparameters.len(),
                nb
            )));
        }
        for bounds in self.0.kernel_bounds.iter() {
            check_bounds("kernel hyperparameters", *bounds)?;
        }

        match self.0.noise_tuning {
            ParamTuning::Fixed(value) => {
                if !(value >= F::zero() && value.is_finite()) {
                    return Err(GpError::InvalidValueError(format!(
                        "Noise variance should be non negative, got {value}"
                    )));
                }
            }
            ParamTuning::Optimized { init, bounds } => {
                check_bounds("noise variance", bounds)?;
                if init < bounds.0 || init > bounds.1 {
                    return Err(GpError::InvalidValueError(format!(
                        "Initial noise variance {init} out of bounds ({}, {})",
                        bounds.0, bounds.1
                    )));
                }
            }
        }

        if !(self.0.nugget >= F::zero()) {
            return Err(GpError::InvalidValueError(
                "`nugget` should be non negative".to_string(),
            ));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
