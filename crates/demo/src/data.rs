//! Training data and evaluation grid of the demo.
use crate::config::DemoConfig;
use crate::errors::Result;
use crate::ground_truth::ground_truth_at;

use dgpr_gp::DerivativeDataset;
use ndarray::{Array, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;

/// Observations of the ground truth at random locations
#[derive(Clone, Debug)]
pub struct DemoData {
    /// Training locations (n, 1)
    pub locations: Array2<f64>,
    /// Function values at training locations (n,)
    pub values: Array1<f64>,
    /// Derivatives at training locations (n, 1)
    pub derivatives: Array2<f64>,
    /// Augmented training data: values then derivatives
    pub dataset: DerivativeDataset<f64>,
    /// Evaluation grid (n_grid,)
    pub grid: Array1<f64>,
}

impl DemoData {
    /// Draw training locations uniformly in [0, 1) with the configured seed,
    /// observe ground truth values and derivatives there and build the evaluation grid.
    pub fn generate(config: &DemoConfig) -> Result<Self> {
        let mut rng = Xoshiro256Plus::seed_from_u64(config.seed);
        let locations = Array::random_using((config.n_points, 1), Uniform::new(0., 1.), &mut rng);
        let (values, derivatives) = ground_truth_at(&locations.column(0));
        let derivatives = derivatives.insert_axis(Axis(1));
        let dataset = DerivativeDataset::new(&locations, &values, &derivatives)?;

        let (xmin, xmax) = (*locations.min()?, *locations.max()?);
        let grid = Array1::linspace(
            xmin - config.grid_margin,
            xmax + config.grid_margin,
            config.n_grid,
        );
        log::debug!("Training locations {}", locations.column(0));

        Ok(DemoData {
            locations,
            values,
            derivatives,
            dataset,
            grid,
        })
    }

    /// Number of training locations
    pub fn n_points(&self) -> usize {
        self.locations.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground_truth::ground_truth;
    use dgpr_gp::ObservationKind;

    #[test]
    fn test_generate() {
        let config = DemoConfig::default();
        let data = DemoData::generate(&config).expect("data");
        assert_eq!(data.n_points(), 10);
        assert!(data.locations.iter().all(|x| (0. ..1.).contains(x)));
        assert_eq!(data.dataset.nrows(), 20);
        let kinds = data.dataset.kinds();
        assert!(kinds[..10].iter().all(|k| *k == ObservationKind::Value));
        assert!(kinds[10..]
            .iter()
            .all(|k| *k == ObservationKind::Derivative(0)));
        for (i, x) in data.locations.column(0).iter().enumerate() {
            let (f, df) = ground_truth(*x);
            assert_eq!(data.dataset.targets()[i], f);
            assert_eq!(data.dataset.targets()[i + 10], df);
        }
    }

    #[test]
    fn test_grid() {
        let data = DemoData::generate(&DemoConfig::default()).expect("data");
        let xmin = *data.locations.min().expect("min location");
        let xmax = *data.locations.max().expect("max location");
        assert_eq!(data.grid.len(), 50);
        assert!((data.grid[0] - (xmin - 0.2)).abs() < 1e-12);
        assert!((data.grid[49] - (xmax + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let config = DemoConfig::default().n_points(4);
        let d1 = DemoData::generate(&config).expect("data");
        let d2 = DemoData::generate(&config).expect("data");
        assert_eq!(d1.locations, d2.locations);
        let d3 = DemoData::generate(&config.seed(7)).expect("data");
        assert_ne!(d1.locations, d3.locations);
    }

    #[test]
    fn test_single_point() {
        let data = DemoData::generate(&DemoConfig::default().n_points(1)).expect("data");
        assert_eq!(data.dataset.nrows(), 2);
        assert!((data.grid[49] - data.grid[0] - 0.4).abs() < 1e-12);
    }
}
