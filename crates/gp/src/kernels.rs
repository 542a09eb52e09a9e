//! A module for covariance kernels of the GP model.
//!
//! The following stationary kernels are implemented, both with one lengthscale
//! per input dimension:
//! * squared exponential (aka RBF),
//! * matern 5/2.
//!
//! They work on plain locations and are twice differentiable, thus they can be used as
//! base kernels of [`DerivativeKernel`](crate::derivative_kernels::DerivativeKernel)
//! to model function values and derivatives jointly.

use crate::errors::{GpError, Result};
use crate::utils::{pairwise_differences, scaled_sq_distances};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use std::fmt;

/// A trait for covariance functions used in GP regression
pub trait Kernel<F: Float>: Clone + fmt::Debug + fmt::Display {
    /// Number of columns expected in input matrices
    fn input_dim(&self) -> usize;

    /// Hyperparameters (all positive): variance followed by lengthscales
    fn hyperparameters(&self) -> Array1<F>;

    /// Names of hyperparameters in the same order as [`Kernel::hyperparameters`]
    fn hyperparameter_names(&self) -> Vec<String>;

    /// Copy of the kernel with the given hyperparameters
    fn with_hyperparameters(&self, params: &Array1<F>) -> Self;

    /// Covariance matrix (n, m) between `x` (n, input_dim) and `y` (m, input_dim)
    fn covariance(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F>;

    /// Diagonal of the covariance matrix of `x` with itself
    fn diagonal(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F>;

    /// Check given inputs can be handled by the kernel
    fn check_inputs(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.ncols() != self.input_dim() {
            return Err(GpError::InvalidValueError(format!(
                "{} kernel expects {} input columns, got {}",
                self,
                self.input_dim(),
                x.ncols()
            )));
        }
        Ok(())
    }
}

/// A kernel with analytic first and mixed second partial derivatives
/// wrt its input locations
pub trait DifferentiableKernel<F: Float>: Kernel<F> {
    /// k(x, y)
    fn value(&self, x: &ArrayView1<F>, y: &ArrayView1<F>) -> F;

    /// dk(x, y)/dx_p
    fn dvalue_dx(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize) -> F;

    /// dk(x, y)/dy_q, defaults to the stationary case `-dk/dx_q`
    fn dvalue_dy(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, q: usize) -> F {
        -self.dvalue_dx(x, y, q)
    }

    /// d2k(x, y)/dx_p dy_q
    fn d2value_dxdy(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize, q: usize) -> F;
}

/// Variance and lengthscales shared by stationary kernels
#[derive(Clone, Debug, PartialEq)]
pub struct StationaryParams<F: Float> {
    pub(crate) variance: F,
    pub(crate) lengthscales: Array1<F>,
}

impl<F: Float> StationaryParams<F> {
    /// Unit variance and lengthscales
    pub fn new(input_dim: usize) -> Self {
        StationaryParams {
            variance: F::one(),
            lengthscales: Array1::ones(input_dim),
        }
    }

    fn as_array(&self) -> Array1<F> {
        let mut params = Array1::zeros(self.lengthscales.len() + 1);
        params[0] = self.variance;
        params
            .slice_mut(ndarray::s![1..])
            .assign(&self.lengthscales);
        params
    }

    fn from_array(params: &Array1<F>) -> Self {
        StationaryParams {
            variance: params[0],
            lengthscales: params.slice(ndarray::s![1..]).to_owned(),
        }
    }

    fn names(&self) -> Vec<String> {
        let mut names = vec!["variance".to_string()];
        names.extend((0..self.lengthscales.len()).map(|i| format!("lengthscales[{i}]")));
        names
    }

    /// Scaled distance r between two locations
    fn distance(&self, x: &ArrayView1<F>, y: &ArrayView1<F>) -> F {
        let mut r2 = F::zero();
        for ((xk, yk), lk) in x.iter().zip(y.iter()).zip(self.lengthscales.iter()) {
            let d = (*xk - *yk) / *lk;
            r2 += d * d;
        }
        r2.sqrt()
    }

    /// (x_p - y_p) / l_p^2
    fn scaled_diff(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize) -> F {
        let lp = self.lengthscales[p];
        (x[p] - y[p]) / (lp * lp)
    }
}

/// Radial profile of a stationary kernel at scaled distance r:
/// `(k(r), k'(r) / r, (k'(r) / r)' / r)`, all terms being finite at r = 0.
fn radial_derivatives<F: Float>(
    params: &StationaryParams<F>,
    profile: impl Fn(F) -> (F, F, F),
    x: &ArrayView1<F>,
    y: &ArrayView1<F>,
    p: usize,
    q: usize,
) -> F {
    let (_, h, c) = profile(params.distance(x, y));
    let dp = params.scaled_diff(x, y, p);
    let dq = params.scaled_diff(x, y, q);
    let delta = if p == q {
        let lp = params.lengthscales[p];
        F::one() / (lp * lp)
    } else {
        F::zero()
    };
    -c * dp * dq - h * delta
}

/// Squared exponential kernel
///
/// `k(x, y) = variance * exp(-r^2 / 2)` with `r^2 = sum_k ((x_k - y_k) / l_k)^2`
#[derive(Clone, Debug, PartialEq)]
pub struct SquaredExponentialKernel<F: Float> {
    params: StationaryParams<F>,
}

impl<F: Float> SquaredExponentialKernel<F> {
    /// Kernel over `input_dim`-dimensional locations with unit variance and lengthscales
    pub fn new(input_dim: usize) -> Self {
        SquaredExponentialKernel {
            params: StationaryParams::new(input_dim),
        }
    }

    /// Set the variance
    pub fn variance(mut self, variance: F) -> Self {
        self.params.variance = variance;
        self
    }

    /// Set the lengthscales, a 1-dim array is broadcast to every dimension
    pub fn lengthscales(mut self, lengthscales: Array1<F>) -> Self {
        self.params.lengthscales = broadcast_lengthscales(lengthscales, self.input_dim());
        self
    }

    fn profile(&self, r: F) -> (F, F, F) {
        let k = self.params.variance * F::exp(F::cast(-0.5) * r * r);
        (k, -k, k)
    }
}

impl<F: Float> fmt::Display for SquaredExponentialKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

impl<F: Float> Kernel<F> for SquaredExponentialKernel<F> {
    fn input_dim(&self) -> usize {
        self.params.lengthscales.len()
    }

    fn hyperparameters(&self) -> Array1<F> {
        self.params.as_array()
    }

    fn hyperparameter_names(&self) -> Vec<String> {
        self.params.names()
    }

    fn with_hyperparameters(&self, params: &Array1<F>) -> Self {
        SquaredExponentialKernel {
            params: StationaryParams::from_array(params),
        }
    }

    fn covariance(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let d = pairwise_differences(x, y);
        let r2 = scaled_sq_distances(&d, &self.params.lengthscales);
        let variance = self.params.variance;
        r2.mapv(|v| variance * F::exp(F::cast(-0.5) * v))
            .into_shape((x.nrows(), y.nrows()))
            .expect("covariance shape")
    }

    fn diagonal(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.params.variance)
    }
}

impl<F: Float> DifferentiableKernel<F> for SquaredExponentialKernel<F> {
    fn value(&self, x: &ArrayView1<F>, y: &ArrayView1<F>) -> F {
        self.profile(self.params.distance(x, y)).0
    }

    fn dvalue_dx(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize) -> F {
        let (_, h, _) = self.profile(self.params.distance(x, y));
        h * self.params.scaled_diff(x, y, p)
    }

    fn d2value_dxdy(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize, q: usize) -> F {
        radial_derivatives(&self.params, |r| self.profile(r), x, y, p, q)
    }
}

/// Matern 5/2 kernel
///
/// `k(x, y) = variance * (1 + sqrt(5) r + 5 r^2 / 3) exp(-sqrt(5) r)`
#[derive(Clone, Debug, PartialEq)]
pub struct Matern52Kernel<F: Float> {
    params: StationaryParams<F>,
}

impl<F: Float> Matern52Kernel<F> {
    /// Kernel over `input_dim`-dimensional locations with unit variance and lengthscales
    pub fn new(input_dim: usize) -> Self {
        Matern52Kernel {
            params: StationaryParams::new(input_dim),
        }
    }

    /// Set the variance
    pub fn variance(mut self, variance: F) -> Self {
        self.params.variance = variance;
        self
    }

    /// Set the lengthscales, a 1-dim array is broadcast to every dimension
    pub fn lengthscales(mut self, lengthscales: Array1<F>) -> Self {
        self.params.lengthscales = broadcast_lengthscales(lengthscales, self.input_dim());
        self
    }

    fn profile(&self, r: F) -> (F, F, F) {
        let variance = self.params.variance;
        let s = F::cast(5.).sqrt() * r;
        let e = F::exp(-s);
        let k = variance * (F::one() + s + s * s / F::cast(3.)) * e;
        let h = -variance * F::cast(5. / 3.) * (F::one() + s) * e;
        let c = variance * F::cast(25. / 3.) * e;
        (k, h, c)
    }
}

impl<F: Float> fmt::Display for Matern52Kernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

impl<F: Float> Kernel<F> for Matern52Kernel<F> {
    fn input_dim(&self) -> usize {
        self.params.lengthscales.len()
    }

    fn hyperparameters(&self) -> Array1<F> {
        self.params.as_array()
    }

    fn hyperparameter_names(&self) -> Vec<String> {
        self.params.names()
    }

    fn with_hyperparameters(&self, params: &Array1<F>) -> Self {
        Matern52Kernel {
            params: StationaryParams::from_array(params),
        }
    }

    fn covariance(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let d = pairwise_differences(x, y);
        let r2 = scaled_sq_distances(&d, &self.params.lengthscales);
        r2.mapv(|v| self.profile(v.sqrt()).0)
            .into_shape((x.nrows(), y.nrows()))
            .expect("covariance shape")
    }

    fn diagonal(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        Array1::from_elem(x.nrows(), self.params.variance)
    }
}

impl<F: Float> DifferentiableKernel<F> for Matern52Kernel<F> {
    fn value(&self, x: &ArrayView1<F>, y: &ArrayView1<F>) -> F {
        self.profile(self.params.distance(x, y)).0
    }

    fn dvalue_dx(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize) -> F {
        let (_, h, _) = self.profile(self.params.distance(x, y));
        h * self.params.scaled_diff(x, y, p)
    }

    fn d2value_dxdy(&self, x: &ArrayView1<F>, y: &ArrayView1<F>, p: usize, q: usize) -> F {
        radial_derivatives(&self.params, |r| self.profile(r), x, y, p, q)
    }
}

pub(crate) fn broadcast_lengthscales<F: Float>(
    lengthscales: Array1<F>,
    input_dim: usize,
) -> Array1<F> {
    if lengthscales.len() == 1 {
        Array1::from_elem(input_dim, lengthscales[0])
    } else {
        lengthscales
    }
}
