use linfa::Float;
use ndarray::{concatenate, s, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};

use crate::dataset::ObservationKind;
use crate::errors::{GpError, Result};

/// Computes differences between each element of x and each element of y
/// resulting in a 2d array of shape (nrows(x) * nrows(y), ncols(x));
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let nx = x.nrows();
    let ny = y.nrows();
    let ncols = x.ncols();
    let mut result = Array2::zeros((nx * ny, ncols));

    for (i, x_row) in x.rows().into_iter().enumerate() {
        for (j, y_row) in y.rows().into_iter().enumerate() {
            let idx = i * ny + j;
            for k in 0..ncols {
                result[[idx, k]] = x_row[k] - y_row[k];
            }
        }
    }

    result
}

/// Squared distances scaled by lengthscales: `sum_k (d_k / l_k)^2` for each row of
/// differences `d` given as a (n, nx) matrix.
pub(crate) fn scaled_sq_distances<F: Float>(
    d: &ArrayBase<impl Data<Elem = F>, Ix2>,
    lengthscales: &Array1<F>,
) -> Array1<F> {
    let inv_l2 = lengthscales.mapv(|l| F::one() / (l * l));
    (d.mapv(|v| v * v) * &inv_l2).sum_axis(Axis(1))
}

/// Split augmented inputs (n, nx + 1) into locations (n, nx) and flags (n,)
pub(crate) fn split_augmented<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (ArrayView2<F>, ArrayView1<F>) {
    let nx = x.ncols() - 1;
    (x.slice(s![.., ..nx]), x.slice(s![.., nx]))
}

/// Decode flags of augmented inputs, erroring out on values which do not encode
/// a value or a derivative along one of the `location_dim` dimensions.
pub(crate) fn observation_kinds<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    location_dim: usize,
) -> Result<Vec<ObservationKind>> {
    if x.ncols() != location_dim + 1 {
        return Err(GpError::InvalidValueError(format!(
            "Augmented inputs should have {} columns (locations + flag), got {}",
            location_dim + 1,
            x.ncols()
        )));
    }
    let (_, flags) = split_augmented(x);
    flags
        .iter()
        .map(|&flag| match ObservationKind::from_flag(flag) {
            Some(ObservationKind::Derivative(d)) if d >= location_dim => {
                Err(GpError::InvalidValueError(format!(
                    "Derivative flag {} refers to dimension {} out of {} location dimensions",
                    flag,
                    d,
                    location_dim
                )))
            }
            Some(kind) => Ok(kind),
            None => Err(GpError::InvalidValueError(format!(
                "Flag {flag} is not a valid observation kind (expected 0 or a dimension index + 1)"
            ))),
        })
        .collect()
}

/// Decode flags already validated with [`observation_kinds`]
pub(crate) fn kinds_unchecked<F: Float>(flags: &ArrayView1<F>) -> Vec<ObservationKind> {
    flags
        .iter()
        .map(|&flag| ObservationKind::from_flag(flag).unwrap_or(ObservationKind::Value))
        .collect()
}

/// Append a constant `kind` flag column to locations given as a (n, nx) matrix
pub fn augment<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    kind: ObservationKind,
) -> Array2<F> {
    let flags = Array2::from_elem((x.nrows(), 1), kind.flag::<F>());
    concatenate![Axis(1), x.view(), flags.view()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_differences() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![
            [-1.26491106],
            [-0.63245553],
            [0.],
            [0.63245553],
            [1.26491106]
        ];
        assert_abs_diff_eq!(
            &array![
                [0.31622777],
                [-0.31622777],
                [-0.9486833],
                [-1.58113883],
                [-2.21359436],
                [0.44271887],
                [-0.18973666],
                [-0.82219219],
                [-1.45464772],
                [-2.08710326]
            ],
            &pairwise_differences(&x, &y),
            epsilon = 1e-6
        )
    }

    #[test]
    fn test_scaled_sq_distances() {
        let d = array![[1., 2.], [0.5, 0.]];
        let r2 = scaled_sq_distances(&d, &array![0.5, 2.]);
        assert_abs_diff_eq!(r2, array![5., 1.], epsilon = 1e-12);
    }

    #[test]
    fn test_augment() {
        let x = array![[0.1], [0.4]];
        let xa = augment(&x, ObservationKind::Derivative(0));
        assert_eq!(xa, array![[0.1, 1.], [0.4, 1.]]);
        let (locations, flags) = split_augmented(&xa);
        assert_eq!(locations, x);
        assert_eq!(flags, array![1., 1.]);
    }

    #[test]
    fn test_observation_kinds() {
        let x = array![[0.1, 0.], [0.4, 1.]];
        let kinds = observation_kinds(&x, 1).expect("valid flags");
        assert_eq!(
            kinds,
            vec![ObservationKind::Value, ObservationKind::Derivative(0)]
        );
        assert!(observation_kinds(&array![[0.1, 2.]], 1).is_err());
        assert!(observation_kinds(&array![[0.1, 0.5]], 1).is_err());
        assert!(observation_kinds(&array![[0.1, -1.]], 1).is_err());
        assert!(observation_kinds(&array![[0.1, 0.2, 0.]], 1).is_err());
    }
}
