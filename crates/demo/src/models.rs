//! GP model configurations compared by the demo.
use crate::config::DemoConfig;
use crate::errors::{DemoError, Result};
use crate::plot::PlotGrid;

use dgpr_gp::{
    DerivativeKernel, GaussianProcess, RbfDerivativeKernel, SquaredExponentialKernel,
};
use ndarray::{Array1, Array2};
use std::fmt;

/// Kernel used by a model configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelChoice {
    /// Squared exponential kernel on plain locations
    SquaredExponential,
    /// Closed-form squared exponential derivative kernel on augmented inputs
    RbfDerivative,
    /// Derivative kernel built upon the squared exponential kernel on augmented inputs
    DerivativeSquaredExponential,
}

impl KernelChoice {
    /// Whether the kernel works on augmented (location, flag) inputs
    pub fn is_augmented(&self) -> bool {
        !matches!(self, KernelChoice::SquaredExponential)
    }
}

/// Training rows used by a model configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainingRows {
    /// Plain (location, value) pairs
    Plain,
    /// Augmented values and derivatives rows
    Augmented,
    /// Augmented rows restricted to function values (flag 0)
    ValuesOnly,
}

/// A GP model configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Display name
    pub name: String,
    /// Kernel to use
    pub kernel: KernelChoice,
    /// Training rows to use
    pub rows: TrainingRows,
    /// Fixed likelihood variance
    pub noise_variance: f64,
    /// Whether the configuration is run
    pub enabled: bool,
}

impl ModelConfig {
    /// Check kernel and training rows are compatible
    pub fn check(&self) -> Result<()> {
        let augmented_rows = self.rows != TrainingRows::Plain;
        if self.kernel.is_augmented() != augmented_rows {
            return Err(DemoError::InvalidConfigError(format!(
                "Model '{}': kernel {:?} cannot be trained on {:?} rows",
                self.name, self.kernel, self.rows
            )));
        }
        Ok(())
    }

    /// Name usable as a file name
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .filter_map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' => Some(c.to_ascii_lowercase()),
                ' ' | '-' | '_' => Some('_'),
                _ => None,
            })
            .collect()
    }
}

/// Model configurations in run order.
///
/// The derivative kernel model trained on values only is disabled unless
/// [`DemoConfig::values_only_model`] is set.
pub fn model_configs(config: &DemoConfig) -> Vec<ModelConfig> {
    let noise_variance = config.noise_variance;
    vec![
        ModelConfig {
            name: "no derivatives".to_string(),
            kernel: KernelChoice::SquaredExponential,
            rows: TrainingRows::Plain,
            noise_variance,
            enabled: true,
        },
        ModelConfig {
            name: "closed-form rbf derivative".to_string(),
            kernel: KernelChoice::RbfDerivative,
            rows: TrainingRows::Augmented,
            noise_variance,
            enabled: true,
        },
        ModelConfig {
            name: "derivative kernel".to_string(),
            kernel: KernelChoice::DerivativeSquaredExponential,
            rows: TrainingRows::Augmented,
            noise_variance,
            enabled: true,
        },
        ModelConfig {
            name: "derivative kernel, values only".to_string(),
            kernel: KernelChoice::DerivativeSquaredExponential,
            rows: TrainingRows::ValuesOnly,
            noise_variance,
            enabled: config.values_only_model,
        },
    ]
}

/// A trained GP, one variant per kernel type
#[derive(Clone, Debug)]
pub enum TrainedModel {
    /// Squared exponential GP on plain locations
    Plain(GaussianProcess<f64, SquaredExponentialKernel<f64>>),
    /// Closed-form derivative GP
    RbfDerivative(GaussianProcess<f64, RbfDerivativeKernel<f64>>),
    /// Derivative kernel GP
    Derivative(GaussianProcess<f64, DerivativeKernel<f64, SquaredExponentialKernel<f64>>>),
}

impl TrainedModel {
    /// Grid to be given to the model for predictions at `locations`
    pub fn plot_grid(&self, locations: &Array1<f64>) -> PlotGrid {
        match self {
            TrainedModel::Plain(_) => PlotGrid::Plain(locations.to_owned()),
            TrainedModel::RbfDerivative(_) | TrainedModel::Derivative(_) => {
                PlotGrid::Augmented(locations.to_owned(), Array1::zeros(locations.len()))
            }
        }
    }

    /// Predictive mean and variance (noise included) at the grid points
    pub fn predict_y(&self, grid: &PlotGrid) -> Result<(Array1<f64>, Array1<f64>)> {
        let x: Array2<f64> = grid.model_inputs()?;
        let pred = match self {
            TrainedModel::Plain(gp) => gp.predict_y(&x),
            TrainedModel::RbfDerivative(gp) => gp.predict_y(&x),
            TrainedModel::Derivative(gp) => gp.predict_y(&x),
        }?;
        Ok(pred)
    }

    /// Log marginal likelihood of the training data
    pub fn log_likelihood(&self) -> f64 {
        match self {
            TrainedModel::Plain(gp) => gp.log_likelihood(),
            TrainedModel::RbfDerivative(gp) => gp.log_likelihood(),
            TrainedModel::Derivative(gp) => gp.log_likelihood(),
        }
    }

    /// Trained noise variance
    pub fn noise_variance(&self) -> f64 {
        match self {
            TrainedModel::Plain(gp) => gp.noise_variance(),
            TrainedModel::RbfDerivative(gp) => gp.noise_variance(),
            TrainedModel::Derivative(gp) => gp.noise_variance(),
        }
    }
}

impl fmt::Display for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrainedModel::Plain(gp) => write!(f, "{gp}"),
            TrainedModel::RbfDerivative(gp) => write!(f, "{gp}"),
            TrainedModel::Derivative(gp) => write!(f, "{gp}"),
        }
    }
}
