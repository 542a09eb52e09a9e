//! Training data with derivative observations.
//!
//! A derivative-aware GP is trained on *augmented* inputs: each row holds a location
//! followed by a flag telling whether the matching output is a function value (flag 0)
//! or a partial derivative along dimension `d` (flag `d + 1`) at that location.
//!
//! [`DerivativeDataset`] stacks all value rows first, then the derivative rows
//! dimension after dimension, reusing the same locations for every block:
//!
//! ```
//! use dgpr_gp::DerivativeDataset;
//! use ndarray::array;
//!
//! let x = array![[0.1], [0.4], [0.9]];
//! let values = array![1., 2., 3.];
//! let derivs = array![[10.], [20.], [30.]];
//! let ds = DerivativeDataset::new(&x, &values, &derivs).unwrap();
//!
//! assert_eq!(ds.records(), &array![[0.1, 0.], [0.4, 0.], [0.9, 0.], [0.1, 1.], [0.4, 1.], [0.9, 1.]]);
//! assert_eq!(ds.targets(), &array![1., 2., 3., 10., 20., 30.]);
//! ```
use crate::errors::{GpError, Result};
use crate::utils::{augment, kinds_unchecked, split_augmented};

use linfa::dataset::Dataset;
use linfa::Float;
use ndarray::{concatenate, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};

/// Role of an output with regard to its location
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObservationKind {
    /// Function value
    Value,
    /// Partial derivative along the given location dimension
    Derivative(usize),
}

impl ObservationKind {
    /// Decode a flag value, returns `None` when the flag is not a non-negative integer
    pub fn from_flag<F: Float>(flag: F) -> Option<Self> {
        if !flag.is_finite() || flag < F::zero() || flag.fract() != F::zero() {
            return None;
        }
        match flag.to_usize()? {
            0 => Some(ObservationKind::Value),
            d => Some(ObservationKind::Derivative(d - 1)),
        }
    }

    /// Flag value encoding this kind in augmented inputs
    pub fn flag<F: Float>(&self) -> F {
        match self {
            ObservationKind::Value => F::zero(),
            ObservationKind::Derivative(d) => F::cast(d + 1),
        }
    }
}

/// Augmented training data: (location, flag) records and aligned outputs
#[derive(Clone, Debug, PartialEq)]
pub struct DerivativeDataset<F: Float> {
    /// Augmented inputs (n_rows, nx + 1)
    records: Array2<F>,
    /// Values or derivatives (n_rows,)
    targets: Array1<F>,
}

impl<F: Float> DerivativeDataset<F> {
    /// Build augmented data from `n` locations (n, nx), their function `values` (n,)
    /// and their partial `derivatives` (n, nx).
    ///
    /// Result holds `n * (1 + nx)` rows: `n` value rows then `n` rows per derivative dimension.
    pub fn new(
        locations: &ArrayBase<impl Data<Elem = F>, Ix2>,
        values: &ArrayBase<impl Data<Elem = F>, Ix1>,
        derivatives: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Result<Self> {
        let n = locations.nrows();
        if n == 0 {
            return Err(GpError::InvalidValueError(
                "At least one observation is required".to_string(),
            ));
        }
        if values.len() != n || derivatives.nrows() != n {
            return Err(GpError::InvalidValueError(format!(
                "Observation count mismatch: {} locations, {} values, {} derivatives",
                n,
                values.len(),
                derivatives.nrows()
            )));
        }
        if derivatives.ncols() != locations.ncols() {
            return Err(GpError::InvalidValueError(format!(
                "Expected one derivative per location dimension ({}), got {}",
                locations.ncols(),
                derivatives.ncols()
            )));
        }

        let mut records = augment(locations, ObservationKind::Value);
        let mut targets = values.to_owned();
        for (d, column) in derivatives.columns().into_iter().enumerate() {
            let block = augment(locations, ObservationKind::Derivative(d));
            records = concatenate![Axis(0), records, block];
            targets = concatenate![Axis(0), targets, column];
        }
        Ok(DerivativeDataset { records, targets })
    }

    /// Augmented inputs as a (n_rows, nx + 1) matrix
    pub fn records(&self) -> &Array2<F> {
        &self.records
    }

    /// Outputs aligned with [`records`](Self::records)
    pub fn targets(&self) -> &Array1<F> {
        &self.targets
    }

    /// Number of augmented rows
    pub fn nrows(&self) -> usize {
        self.records.nrows()
    }

    /// Dimension of locations
    pub fn location_dim(&self) -> usize {
        self.records.ncols() - 1
    }

    /// Kind of each row
    pub fn kinds(&self) -> Vec<ObservationKind> {
        let (_, flags) = split_augmented(&self.records);
        kinds_unchecked(&flags)
    }

    /// Keep value rows only (flag 0), order preserved
    pub fn values_only(&self) -> Self {
        let selected: Vec<usize> = self
            .kinds()
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind == ObservationKind::Value)
            .map(|(i, _)| i)
            .collect();
        DerivativeDataset {
            records: self.records.select(Axis(0), &selected),
            targets: self.targets.select(Axis(0), &selected),
        }
    }

    /// Plain (location, value) pairs, flag column removed
    pub fn locations_and_values(&self) -> (Array2<F>, Array1<F>) {
        let values = self.values_only();
        let (locations, _) = split_augmented(&values.records);
        (locations.to_owned(), values.targets)
    }

    /// Convert into a linfa dataset to be used with [`Fit`](linfa::traits::Fit)
    pub fn to_dataset(&self) -> Dataset<F, F, Ix1> {
        Dataset::new(self.records.to_owned(), self.targets.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};

    #[test]
    fn test_observation_kind_flags() {
        assert_eq!(ObservationKind::from_flag(0.), Some(ObservationKind::Value));
        assert_eq!(
            ObservationKind::from_flag(1.),
            Some(ObservationKind::Derivative(0))
        );
        assert_eq!(
            ObservationKind::from_flag(3.),
            Some(ObservationKind::Derivative(2))
        );
        assert_eq!(ObservationKind::from_flag(0.5), None);
        assert_eq!(ObservationKind::from_flag(-1.), None);
        assert_eq!(ObservationKind::from_flag(f64::NAN), None);
        assert_eq!(ObservationKind::Derivative(1).flag::<f64>(), 2.);
        assert_eq!(ObservationKind::Value.flag::<f64>(), 0.);
    }

    #[test]
    fn test_augmented_three_observations() {
        let x = array![[0.1], [0.4], [0.9]];
        let values = array![1.5, -0.3, 0.7];
        let derivs = array![[4.], [-2.], [8.]];
        let ds = DerivativeDataset::new(&x, &values, &derivs).expect("valid data");

        assert_eq!(
            ds.records(),
            &array![
                [0.1, 0.],
                [0.4, 0.],
                [0.9, 0.],
                [0.1, 1.],
                [0.4, 1.],
                [0.9, 1.]
            ]
        );
        assert_eq!(ds.targets(), &array![1.5, -0.3, 0.7, 4., -2., 8.]);
        assert_eq!(ds.location_dim(), 1);
    }

    #[test]
    fn test_augmented_row_count_and_flags() {
        for n in 1..8 {
            let x = Array::linspace(0., 1., n).insert_axis(Axis(1));
            let values = x.column(0).mapv(|v| v * v);
            let derivs = x.mapv(|v| 2. * v);
            let ds = DerivativeDataset::new(&x, &values, &derivs).expect("valid data");
            assert_eq!(ds.nrows(), 2 * n);
            assert_eq!(ds.targets().len(), 2 * n);
            let kinds = ds.kinds();
            assert!(kinds[..n].iter().all(|k| *k == ObservationKind::Value));
            assert!(kinds[n..]
                .iter()
                .all(|k| *k == ObservationKind::Derivative(0)));
        }
    }

    #[test]
    fn test_values_only_projection() {
        let x = array![[0.9], [0.1], [0.4]];
        let values = array![3., 1., 2.];
        let derivs = array![[-3.], [-1.], [-2.]];
        let ds = DerivativeDataset::new(&x, &values, &derivs).expect("valid data");

        let values_only = ds.values_only();
        assert_eq!(values_only.nrows(), 3);
        assert!(values_only
            .kinds()
            .iter()
            .all(|k| *k == ObservationKind::Value));

        let (xv, yv) = ds.locations_and_values();
        assert_eq!(xv, x);
        assert_eq!(yv, values);
    }

    #[test]
    fn test_two_dimensional_locations() {
        let x = array![[0., 1.], [2., 3.]];
        let values = array![1., 2.];
        let derivs = array![[10., 100.], [20., 200.]];
        let ds = DerivativeDataset::new(&x, &values, &derivs).expect("valid data");
        assert_eq!(ds.nrows(), 6);
        assert_eq!(ds.targets(), &array![1., 2., 10., 20., 100., 200.]);
        assert_eq!(ds.records().column(2), array![0., 0., 1., 1., 2., 2.]);
    }

    #[test]
    fn test_invalid_shapes() {
        let x = array![[0.1], [0.4]];
        assert!(DerivativeDataset::new(&x, &array![1.], &array![[1.], [2.]]).is_err());
        assert!(DerivativeDataset::new(&x, &array![1., 2.], &array![[1.]]).is_err());
        assert!(DerivativeDataset::new(&x, &array![1., 2.], &array![[1., 0.], [2., 0.]]).is_err());
        let empty = Array2::<f64>::zeros((0, 1));
        assert!(DerivativeDataset::new(&empty, &Array1::zeros(0), &empty).is_err());
    }
}
