//! Function used to generate the demo training data.

use ndarray::{Array1, ArrayBase, Data, Ix1};

/// Ground truth function value and derivative at `x`:
///
/// * `f(x) = sin(12x) + 0.66 cos(25x)`
/// * `f'(x) = 12 cos(12x) - 16.5 sin(25x)`
pub fn ground_truth(x: f64) -> (f64, f64) {
    let f = (12. * x).sin() + 0.66 * (25. * x).cos();
    let df = 12. * (12. * x).cos() - 16.5 * (25. * x).sin();
    (f, df)
}

/// Ground truth values and derivatives at each of the given locations
pub fn ground_truth_at(x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> (Array1<f64>, Array1<f64>) {
    let (f, df): (Vec<f64>, Vec<f64>) = x.iter().map(|v| ground_truth(*v)).unzip();
    (Array1::from_vec(f), Array1::from_vec(df))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_ground_truth_at_origin() {
        assert_eq!(ground_truth(0.), (0.66, 12.));
    }

    #[test]
    fn test_ground_truth_at_0_2() {
        let (f, df) = ground_truth(0.2);
        assert_abs_diff_eq!(f, 2.4f64.sin() + 0.66 * 5f64.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(df, 12. * 2.4f64.cos() - 16.5 * 5f64.sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(f, 0.8627, epsilon = 1e-4);
        assert_abs_diff_eq!(df, 6.97, epsilon = 1e-2);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let h = 1e-6;
        for x in [-0.1, 0.05, 0.33, 0.71, 1.1] {
            let fd = (ground_truth(x + h).0 - ground_truth(x - h).0) / (2. * h);
            assert_abs_diff_eq!(ground_truth(x).1, fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_ground_truth_at_locations() {
        let x = array![0., 0.2];
        let (f, df) = ground_truth_at(&x);
        assert_eq!(f.len(), 2);
        assert_eq!((f[1], df[1]), ground_truth(0.2));
        // deterministic
        assert_eq!(ground_truth_at(&x), (f, df));
    }
}
