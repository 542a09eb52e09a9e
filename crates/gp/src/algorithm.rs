use crate::derivative_kernels::AugmentedKernel;
use crate::errors::{GpError, Result};
use crate::kernels::Kernel;
use crate::optimization::{optimize_params, NelderMeadParams, TrainingTrace};
use crate::parameters::{GpParams, GpValidParams, ParamTuning};
use crate::utils::augment;
use crate::ObservationKind;

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use linfa::ParamGuard;
use linfa_linalg::{cholesky::*, eigh::*, triangular::*};
use ndarray::{Array, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

use log::debug;
use std::fmt;
use std::time::Instant;

/// Default maximum number of hyperparameters optimizer iterations
pub const GP_OPTIM_MAX_ITERS: usize = 100;

/// Internal parameters computed during training
/// used later on in prediction computations
#[derive(Clone, Debug)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Cholesky decomposition of the covariance matrix [K + noise I]
    chol: Array2<F>,
    /// Solution of the linear equation system: [K + noise I] alpha = y
    alpha: Array1<F>,
}

/// A zero-mean GP regression model, its covariance being given by a kernel
/// and outputs being corrupted by an independent gaussian noise:
///
/// `y = f(x) + e` with `f ~ GP(0, k(x, x'))` and `e ~ Normal(0, noise_variance)`
///
/// Kernel hyperparameters and noise variance (when not fixed) are obtained by
/// maximizing the log marginal likelihood of training outputs.
///
/// Inputs may be augmented with an observation flag (see [`DerivativeDataset`](crate::DerivativeDataset))
/// when using a derivative-aware kernel, values and derivatives being then
/// regressed jointly.
///
/// # Example
///
/// ```no_run
/// use dgpr_gp::{DerivativeDataset, GaussianProcess, RbfDerivativeKernel};
/// use linfa::prelude::*;
/// use ndarray::{Array, Axis};
///
/// let x = Array::linspace(0., 1., 10).insert_axis(Axis(1));
/// let values = x.column(0).mapv(|v: f64| (12. * v).sin());
/// let derivs = x.mapv(|v: f64| 12. * (12. * v).cos());
/// let ds = DerivativeDataset::new(&x, &values, &derivs).expect("valid data");
///
/// let (gp, trace) = GaussianProcess::params(RbfDerivativeKernel::new(1))
///     .fixed_noise_variance(1e-3)
///     .max_iters(10)
///     .fit_with_trace(&ds.to_dataset())
///     .expect("GP trained");
/// println!("{gp}");
/// println!("{} iterations, log likelihood {}", trace.len(), gp.log_likelihood());
///
/// let xtest = Array::linspace(0., 1., 50).insert_axis(Axis(1));
/// let dy = gp.predict_derivatives(&xtest, 0).expect("derivatives");
/// ```
#[derive(Clone, Debug)]
pub struct GaussianProcess<F: Float, K: Kernel<F>> {
    /// Trained kernel
    kernel: K,
    /// Trained likelihood (noise) variance
    noise_variance: F,
    /// Log marginal likelihood of training outputs
    likelihood: F,
    /// Gaussian process internal fitted params
    inner_params: GpInnerParams<F>,
    /// Training dataset (input, output)
    pub(crate) training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F, K>,
}

impl<F: Float, K: Kernel<F>> fmt::Display for GaussianProcess<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "GaussianProcess(kernel={})", self.kernel)?;
        writeln!(f, "{:<32}{:>16}  {}", "name", "value", "trainable")?;
        for (name, value) in self
            .kernel
            .hyperparameter_names()
            .iter()
            .zip(self.kernel.hyperparameters().iter())
        {
            writeln!(
                f,
                "{:<32}{:>16.6e}  {}",
                format!("kernel.{name}"),
                value.to_f64().unwrap_or(f64::NAN),
                self.params.max_iters() > 0
            )?;
        }
        writeln!(
            f,
            "{:<32}{:>16.6e}  {}",
            "likelihood.variance",
            self.noise_variance.to_f64().unwrap_or(f64::NAN),
            self.params.max_iters() > 0 && self.params.noise_tuning().is_trainable()
        )?;
        write!(f, "log likelihood: {}", self.likelihood)
    }
}

impl<F: Float, K: Kernel<F>> GaussianProcess<F, K> {
    /// Gp parameters contructor
    pub fn params(kernel: K) -> GpParams<F, K> {
        GpParams::new(kernel)
    }

    /// Predict latent function mean and variance at n given `x` points specified as a (n, input_dim) matrix.
    pub fn predict_f(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let (mean, v) = self._compute_mean_v(x)?;
        let var = self.kernel.diagonal(x) - v.mapv(|v| v * v).sum_axis(Axis(0));
        // Variance might be slightly negative depending on
        // machine precision: set to zero in that case
        Ok((mean, var.mapv(|v| if v < F::zero() { F::zero() } else { v })))
    }

    /// Predict observation mean and variance (latent variance plus noise variance)
    /// at n given `x` points specified as a (n, input_dim) matrix.
    pub fn predict_y(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        let (mean, var) = self.predict_f(x)?;
        let noise = self.noise_variance;
        Ok((mean, var.mapv(|v| v + noise)))
    }

    /// Predict output values at n given `x` points specified as a (n, input_dim) matrix.
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self._compute_mean_v(x).map(|(mean, _)| mean)
    }

    /// Predict latent variance at n given `x` points specified as a (n, input_dim) matrix.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.predict_f(x).map(|(_, var)| var)
    }

    /// Predict latent function mean (n,) and full covariance matrix (n, n)
    pub fn predict_f_full_cov(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array2<F>)> {
        let (mean, v) = self._compute_mean_v(x)?;
        let cov = self.kernel.covariance(x, x) - v.t().dot(&v);
        Ok((mean, cov))
    }

    /// Compute posterior mean and `v = L^-1 k(xt, x)` factorizing mean and
    /// variance computations
    fn _compute_mean_v(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array2<F>)> {
        self.kernel.check_inputs(x)?;
        let kxs = self.kernel.covariance(&self.training_data.0, x);
        let mean = kxs.t().dot(&self.inner_params.alpha);
        let v = self
            .inner_params
            .chol
            .solve_triangular(&kxs, UPLO::Lower)?;
        Ok((mean, v))
    }

    /// Sample the posterior latent process at `x` for `n_traj` trajectories.
    ///
    /// Returns a (n, n_traj) matrix. The posterior covariance square root is computed
    /// with an eigenvalues decomposition, robust to the ill-conditioning occuring
    /// when the number of x locations increase.
    pub fn sample(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        n_traj: usize,
        seed: u64,
    ) -> Result<Array2<F>> {
        let (mean, cov) = self.predict_f_full_cov(x)?;
        let (eigvals, eigvecs) = cov.eigh_into()?;
        let sqrt_vals = eigvals.mapv(|v| {
            // We lower bound the float value at 1e-9
            if v < F::cast(1e-9) {
                F::zero()
            } else {
                v.sqrt()
            }
        });
        let c = eigvecs.dot(&Array2::from_diag(&sqrt_vals));
        let mut rng = Xoshiro256Plus::seed_from_u64(seed);
        let normal = Normal::new(0., 1.).map_err(|e| GpError::InvalidValueError(e.to_string()))?;
        let ary = Array::random_using((x.nrows(), n_traj), normal, &mut rng).mapv(F::cast);
        Ok(mean.insert_axis(Axis(1)) + c.dot(&ary))
    }

    /// Trained kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Trained kernel hyperparameters
    pub fn hyperparameters(&self) -> Array1<F> {
        self.kernel.hyperparameters()
    }

    /// Trained likelihood (noise) variance
    pub fn noise_variance(&self) -> F {
        self.noise_variance
    }

    /// Log marginal likelihood of training outputs
    pub fn log_likelihood(&self) -> F {
        self.likelihood
    }

    /// Training inputs and outputs
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    /// Parameters used to fit this model
    pub fn params_used(&self) -> &GpValidParams<F, K> {
        &self.params
    }
}

impl<F: Float, K: AugmentedKernel<F>> GaussianProcess<F, K> {
    /// Predict latent partial derivative along location dimension `dim`
    /// at n given `locations` specified as a (n, nx) matrix (no flag column).
    ///
    /// Returns mean (n,) and variance (n,) of the derivative.
    pub fn predict_derivatives(
        &self,
        locations: &ArrayBase<impl Data<Elem = F>, Ix2>,
        dim: usize,
    ) -> Result<(Array1<F>, Array1<F>)> {
        if dim >= self.kernel.location_dim() {
            return Err(GpError::InvalidValueError(format!(
                "Derivative dimension {} should be lower than location dimension {}",
                dim,
                self.kernel.location_dim()
            )));
        }
        self.predict_f(&augment(locations, ObservationKind::Derivative(dim)))
    }

    /// Predict latent function values and variances at plain `locations` (no flag column)
    pub fn predict_values(
        &self,
        locations: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<(Array1<F>, Array1<F>)> {
        self.predict_f(&augment(locations, ObservationKind::Value))
    }
}

impl<F, D, K> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for GaussianProcess<F, K>
where
    F: Float,
    D: Data<Elem = F>,
    K: Kernel<F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

impl<F: Float, K: Kernel<F>> GpValidParams<F, K> {
    /// Fit GP parameters using maximum likelihood, returning the trained model
    /// and the trace of the optimizer iterations.
    pub fn fit_with_trace<D: Data<Elem = F>>(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<(GaussianProcess<F, K>, TrainingTrace)> {
        let x = dataset.records();
        let y = dataset.targets();
        if x.nrows() == 0 {
            return Err(GpError::InvalidValueError(
                "GP training requires at least one observation".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(GpError::InvalidValueError(format!(
                "Training inputs ({}) and outputs ({}) sizes mismatch",
                x.nrows(),
                y.len()
            )));
        }
        self.kernel().check_inputs(x)?;

        let kernel0 = self.kernel().to_owned();
        let n_kernel = kernel0.hyperparameters().len();
        let noise_tuning = *self.noise_tuning();
        let nugget = self.nugget();

        // Use log10 hyperparameters as optimization parameters
        let mut param0 = kernel0.hyperparameters().to_vec();
        let mut bounds = self.expanded_kernel_bounds();
        if let ParamTuning::Optimized { init, bounds: b } = noise_tuning {
            param0.push(init);
            bounds.push(b);
        }
        let param0 = Array1::from_vec(param0).mapv(|v| v.log10());
        let bounds: Vec<(F, F)> = bounds
            .iter()
            .map(|(lo, up)| (lo.log10(), up.log10()))
            .collect();

        let base: f64 = 10.;
        let decode = |p: &[f64]| -> (K, F) {
            let values: Array1<F> = p.iter().map(|v| F::cast(base.powf(*v))).collect();
            let kernel = kernel0.with_hyperparameters(&values.slice(ndarray::s![..n_kernel]).to_owned());
            let noise = match noise_tuning {
                ParamTuning::Fixed(noise) => noise,
                ParamTuning::Optimized { .. } => values[n_kernel],
            };
            (kernel, noise)
        };
        let objfn = |p: &[f64]| -> f64 {
            let (kernel, noise) = decode(p);
            match marginal_likelihood(&kernel, x, y, noise, nugget) {
                Ok((lkh, _)) => -lkh.to_f64().unwrap_or(f64::NAN),
                Err(_) => f64::INFINITY,
            }
        };

        debug!("Optimize with params0 = {param0} and log10 bounds = {bounds:?}");
        let now = Instant::now();
        let (fmin, opt_params, trace) = optimize_params(
            objfn,
            &param0,
            &bounds,
            NelderMeadParams {
                max_iters: self.max_iters(),
                ..NelderMeadParams::default()
            },
        )?;
        debug!(
            "elapsed optim = {:?}ms, {} iterations, -loglik = {}",
            now.elapsed().as_millis(),
            trace.len(),
            fmin
        );

        let (kernel, noise_variance) = decode(&opt_params.to_vec());
        let (likelihood, inner_params) = marginal_likelihood(&kernel, x, y, noise_variance, nugget)?;
        Ok((
            GaussianProcess {
                kernel,
                noise_variance,
                likelihood,
                inner_params,
                training_data: (x.to_owned(), y.to_owned()),
                params: self.clone(),
            },
            trace,
        ))
    }
}

impl<F: Float, K: Kernel<F>> GpParams<F, K> {
    /// Check parameters then fit GP returning the trained model and
    /// the trace of the optimizer iterations, see [`GpValidParams::fit_with_trace`].
    pub fn fit_with_trace<D: Data<Elem = F>>(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<(GaussianProcess<F, K>, TrainingTrace)> {
        self.check_ref()?.fit_with_trace(dataset)
    }
}

impl<F: Float, K: Kernel<F>, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError>
    for GpValidParams<F, K>
{
    type Object = GaussianProcess<F, K>;

    /// Fit GP parameters using maximum likelihood
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        self.fit_with_trace(dataset).map(|(gp, _)| gp)
    }
}

/// Compute log marginal likelihood of `y` outputs at `x` inputs
/// kernel: prior covariance,
/// noise: likelihood variance,
/// nugget: factor to improve numerical stability
pub(crate) fn marginal_likelihood<F: Float, K: Kernel<F>>(
    kernel: &K,
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    noise: F,
    nugget: F,
) -> Result<(F, GpInnerParams<F>)> {
    let mut k_mx = kernel.covariance(x, x);
    k_mx.diag_mut().mapv_inplace(|v| v + noise + nugget);

    // K = L.Lt cholesky decomposition
    let chol = k_mx.cholesky()?;
    let v = chol.solve_triangular(&y.to_owned().insert_axis(Axis(1)), UPLO::Lower)?;
    let alpha = chol
        .t()
        .solve_triangular_into(v.to_owned(), UPLO::Upper)?
        .remove_axis(Axis(1));

    // The determinant of K is equal to the squared product of
    // the diagonal elements of its Cholesky decomposition
    let n_obs: F = F::cast(x.nrows());
    let half_logdet = chol.diag().mapv(|v| v.ln()).sum();
    let quad = v.mapv(|v| v * v).sum();
    let log_2pi = F::cast(2. * std::f64::consts::PI).ln();
    let likelihood = -F::cast(0.5) * quad - half_logdet - F::cast(0.5) * n_obs * log_2pi;

    if !likelihood.is_finite() {
        return Err(GpError::LikelihoodComputationError(format!(
            "Non finite log likelihood ({likelihood}) with {kernel} kernel and noise {noise}"
        )));
    }
    Ok((likelihood, GpInnerParams { chol, alpha }))
}
