//! Kernels over augmented inputs modelling function values and derivatives jointly.
//!
//! Each input row is `(location, flag)` where flag 0 stands for a function value
//! and flag `d + 1` for the partial derivative along dimension `d`, see
//! [`DerivativeDataset`](crate::DerivativeDataset).
//!
//! * [`DerivativeKernel`] builds the joint covariance from any [`DifferentiableKernel`],
//! * [`RbfDerivativeKernel`] computes the squared exponential case in closed form.

use crate::dataset::ObservationKind;
use crate::errors::Result;
use crate::kernels::{
    broadcast_lengthscales, DifferentiableKernel, Kernel, SquaredExponentialKernel,
};
use crate::utils::{kinds_unchecked, observation_kinds, split_augmented};

use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use std::fmt;
use std::marker::PhantomData;

/// Kernel working on augmented inputs
pub trait AugmentedKernel<F: Float>: Kernel<F> {
    /// Dimension of locations (augmented inputs have one more column for the flag)
    fn location_dim(&self) -> usize {
        self.input_dim() - 1
    }
}

/// Covariance between two observations given their kinds, delegating to base kernel derivatives
fn observation_covariance<F: Float, K: DifferentiableKernel<F>>(
    base: &K,
    x: &ArrayView1<F>,
    kx: ObservationKind,
    y: &ArrayView1<F>,
    ky: ObservationKind,
) -> F {
    match (kx, ky) {
        (ObservationKind::Value, ObservationKind::Value) => base.value(x, y),
        (ObservationKind::Value, ObservationKind::Derivative(q)) => base.dvalue_dy(x, y, q),
        (ObservationKind::Derivative(p), ObservationKind::Value) => base.dvalue_dx(x, y, p),
        (ObservationKind::Derivative(p), ObservationKind::Derivative(q)) => {
            base.d2value_dxdy(x, y, p, q)
        }
    }
}

/// Derivative-aware kernel built upon a twice differentiable base kernel
#[derive(Clone, Debug, PartialEq)]
pub struct DerivativeKernel<F: Float, K: DifferentiableKernel<F>> {
    base: K,
    phantom: PhantomData<F>,
}

impl<F: Float, K: DifferentiableKernel<F>> DerivativeKernel<F, K> {
    /// Wrap `base` kernel defined on plain locations
    pub fn new(base: K) -> Self {
        DerivativeKernel {
            base,
            phantom: PhantomData,
        }
    }

    /// The underlying kernel on locations
    pub fn base(&self) -> &K {
        &self.base
    }
}

impl<F: Float, K: DifferentiableKernel<F>> fmt::Display for DerivativeKernel<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Derivative({})", self.base)
    }
}

impl<F: Float, K: DifferentiableKernel<F>> Kernel<F> for DerivativeKernel<F, K> {
    fn input_dim(&self) -> usize {
        self.base.input_dim() + 1
    }

    fn hyperparameters(&self) -> Array1<F> {
        self.base.hyperparameters()
    }

    fn hyperparameter_names(&self) -> Vec<String> {
        self.base.hyperparameter_names()
    }

    fn with_hyperparameters(&self, params: &Array1<F>) -> Self {
        DerivativeKernel::new(self.base.with_hyperparameters(params))
    }

    fn covariance(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let (xloc, xflags) = split_augmented(x);
        let (yloc, yflags) = split_augmented(y);
        let xkinds = kinds_unchecked(&xflags);
        let ykinds = kinds_unchecked(&yflags);
        Array2::from_shape_fn((x.nrows(), y.nrows()), |(i, j)| {
            observation_covariance(
                &self.base,
                &xloc.row(i),
                xkinds[i],
                &yloc.row(j),
                ykinds[j],
            )
        })
    }

    fn diagonal(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        let (xloc, xflags) = split_augmented(x);
        let kinds = kinds_unchecked(&xflags);
        Array1::from_shape_fn(x.nrows(), |i| {
            let row = xloc.row(i);
            observation_covariance(&self.base, &row, kinds[i], &row, kinds[i])
        })
    }

    fn check_inputs(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        observation_kinds(x, self.location_dim()).map(|_| ())
    }
}

impl<F: Float, K: DifferentiableKernel<F>> AugmentedKernel<F> for DerivativeKernel<F, K> {}

/// Squared exponential derivative kernel computed in closed form
///
/// Same hyperparameters as [`SquaredExponentialKernel`]: variance and one lengthscale
/// per location dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct RbfDerivativeKernel<F: Float> {
    variance: F,
    lengthscales: Array1<F>,
}

impl<F: Float> RbfDerivativeKernel<F> {
    /// Kernel over `location_dim`-dimensional locations with unit variance and lengthscales
    pub fn new(location_dim: usize) -> Self {
        RbfDerivativeKernel {
            variance: F::one(),
            lengthscales: Array1::ones(location_dim),
        }
    }

    /// Set the variance
    pub fn variance(mut self, variance: F) -> Self {
        self.variance = variance;
        self
    }

    /// Set the lengthscales, a 1-dim array is broadcast to every dimension
    pub fn lengthscales(mut self, lengthscales: Array1<F>) -> Self {
        self.lengthscales = broadcast_lengthscales(lengthscales, self.lengthscales.len());
        self
    }

    fn entry(
        &self,
        x: &ArrayView1<F>,
        kx: ObservationKind,
        y: &ArrayView1<F>,
        ky: ObservationKind,
    ) -> F {
        let inv_l2 = self.lengthscales.mapv(|l| F::one() / (l * l));
        let d = x - y;
        let r2 = (&d * &d * &inv_l2).sum();
        let k = self.variance * F::exp(F::cast(-0.5) * r2);
        match (kx, ky) {
            (ObservationKind::Value, ObservationKind::Value) => k,
            (ObservationKind::Value, ObservationKind::Derivative(q)) => k * d[q] * inv_l2[q],
            (ObservationKind::Derivative(p), ObservationKind::Value) => -k * d[p] * inv_l2[p],
            (ObservationKind::Derivative(p), ObservationKind::Derivative(q)) => {
                let delta = if p == q { inv_l2[p] } else { F::zero() };
                k * (delta - d[p] * d[q] * inv_l2[p] * inv_l2[q])
            }
        }
    }
}

impl<F: Float> fmt::Display for RbfDerivativeKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RbfDerivative")
    }
}

impl<F: Float> Kernel<F> for RbfDerivativeKernel<F> {
    fn input_dim(&self) -> usize {
        self.lengthscales.len() + 1
    }

    fn hyperparameters(&self) -> Array1<F> {
        SquaredExponentialKernel::new(self.lengthscales.len())
            .variance(self.variance)
            .lengthscales(self.lengthscales.to_owned())
            .hyperparameters()
    }

    fn hyperparameter_names(&self) -> Vec<String> {
        SquaredExponentialKernel::<F>::new(self.lengthscales.len()).hyperparameter_names()
    }

    fn with_hyperparameters(&self, params: &Array1<F>) -> Self {
        RbfDerivativeKernel {
            variance: params[0],
            lengthscales: params.slice(ndarray::s![1..]).to_owned(),
        }
    }

    fn covariance(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let (xloc, xflags) = split_augmented(x);
        let (yloc, yflags) = split_augmented(y);
        let xkinds = kinds_unchecked(&xflags);
        let ykinds = kinds_unchecked(&yflags);
        Array2::from_shape_fn((x.nrows(), y.nrows()), |(i, j)| {
            self.entry(&xloc.row(i), xkinds[i], &yloc.row(j), ykinds[j])
        })
    }

    fn diagonal(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array1<F> {
        let (_, flags) = split_augmented(x);
        kinds_unchecked(&flags)
            .iter()
            .map(|kind| match kind {
                ObservationKind::Value => self.variance,
                ObservationKind::Derivative(p) => {
                    let lp = self.lengthscales[*p];
                    self.variance / (lp * lp)
                }
            })
            .collect()
    }

    fn check_inputs(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        observation_kinds(x, self.location_dim()).map(|_| ())
    }
}

impl<F: Float> AugmentedKernel<F> for RbfDerivativeKernel<F> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Matern52Kernel;
    use crate::utils::augment;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate, Array, Axis};

    fn augmented_inputs() -> Array2<f64> {
        let x = Array::linspace(0., 1., 6).insert_axis(Axis(1));
        concatenate![
            Axis(0),
            augment(&x, ObservationKind::Value),
            augment(&x, ObservationKind::Derivative(0))
        ]
    }

    #[test]
    fn test_value_block_matches_base_kernel() {
        let base = Matern52Kernel::new(1).variance(1.3).lengthscales(array![0.2]);
        let kernel = DerivativeKernel::new(base.clone());
        let xa = augmented_inputs();
        let k = kernel.covariance(&xa, &xa);
        let x = Array::linspace(0., 1., 6).insert_axis(Axis(1));
        assert_abs_diff_eq!(
            k.slice(ndarray::s![..6, ..6]).to_owned(),
            base.covariance(&x, &x),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_generic_and_closed_form_agree() {
        let generic = DerivativeKernel::new(
            SquaredExponentialKernel::new(1)
                .variance(0.7)
                .lengthscales(array![0.15]),
        );
        let closed = RbfDerivativeKernel::new(1)
            .variance(0.7)
            .lengthscales(array![0.15]);
        let xa = augmented_inputs();
        let ya = augmented_inputs().slice(ndarray::s![2..9, ..]).to_owned();
        assert_abs_diff_eq!(
            generic.covariance(&xa, &ya),
            closed.covariance(&xa, &ya),
            epsilon = 1e-10
        );
        assert_abs_diff_eq!(generic.diagonal(&xa), closed.diagonal(&xa), epsilon = 1e-10);
        assert_eq!(generic.hyperparameters(), closed.hyperparameters());
    }

    #[test]
    fn test_generic_and_closed_form_agree_in_2d() {
        let generic = DerivativeKernel::new(
            SquaredExponentialKernel::new(2)
                .variance(1.1)
                .lengthscales(array![0.4, 0.9]),
        );
        let closed = RbfDerivativeKernel::new(2)
            .variance(1.1)
            .lengthscales(array![0.4, 0.9]);
        let x = array![[0.1, 0.3], [0.5, 0.2], [0.9, 0.7]];
        let xa = concatenate![
            Axis(0),
            augment(&x, ObservationKind::Value),
            augment(&x, ObservationKind::Derivative(0)),
            augment(&x, ObservationKind::Derivative(1))
        ];
        assert_abs_diff_eq!(
            generic.covariance(&xa, &xa),
            closed.covariance(&xa, &xa),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_covariance_is_symmetric() {
        let kernel = DerivativeKernel::new(Matern52Kernel::new(1).lengthscales(array![0.3]));
        let xa = augmented_inputs();
        let k = kernel.covariance(&xa, &xa);
        assert_abs_diff_eq!(k.t().to_owned(), k, epsilon = 1e-12);
        assert_abs_diff_eq!(k.diag().to_owned(), kernel.diagonal(&xa), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_augmented_inputs() {
        let kernel = RbfDerivativeKernel::<f64>::new(1);
        assert!(kernel.check_inputs(&array![[0.1, 0.], [0.2, 1.]]).is_ok());
        assert!(kernel.check_inputs(&array![[0.1, 2.]]).is_err());
        assert!(kernel.check_inputs(&array![[0.1]]).is_err());
        let kernel = DerivativeKernel::new(SquaredExponentialKernel::<f64>::new(1));
        assert!(kernel.check_inputs(&array![[0.1, 0.5]]).is_err());
        assert_eq!(kernel.location_dim(), 1);
    }
}
