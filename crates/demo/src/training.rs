//! Training of the model configurations.
use crate::data::DemoData;
use crate::errors::Result;
use crate::models::{KernelChoice, ModelConfig, TrainedModel, TrainingRows};

use dgpr_gp::{
    DerivativeKernel, GaussianProcess, Kernel, RbfDerivativeKernel, SquaredExponentialKernel,
    TrainingTrace,
};
use linfa::dataset::Dataset;
use log::info;
use ndarray::Ix1;
use std::time::Instant;

/// Outcome of a model configuration training
#[derive(Clone, Debug)]
pub struct TrainingReport {
    /// Name of the model configuration
    pub name: String,
    /// Trained model
    pub model: TrainedModel,
    /// Instants of the optimizer iterations
    pub trace: TrainingTrace,
}

impl TrainingReport {
    /// Summary printed after training: parameter table ending with the log likelihood,
    /// then intervals between optimizer steps
    pub fn summary(&self) -> String {
        format!(
            "=== {} ===\n{}\nsteps intervals (s): {}",
            self.name,
            self.model,
            self.trace.intervals_secs()
        )
    }

    /// Print the training [summary](Self::summary)
    pub fn print(&self) {
        println!("{}", self.summary());
    }
}

fn fit<K: Kernel<f64>>(
    kernel: K,
    noise_variance: f64,
    max_iters: usize,
    dataset: &Dataset<f64, f64, Ix1>,
) -> Result<(GaussianProcess<f64, K>, TrainingTrace)> {
    let res = GaussianProcess::params(kernel)
        .fixed_noise_variance(noise_variance)
        .max_iters(max_iters)
        .fit_with_trace(dataset)?;
    Ok(res)
}

/// Train the model described by `config` on `data` with at most `max_iters`
/// hyperparameters optimizer iterations
pub fn train(config: &ModelConfig, data: &DemoData, max_iters: usize) -> Result<TrainingReport> {
    config.check()?;
    let dataset = match config.rows {
        TrainingRows::Plain => {
            let (x, y) = data.dataset.locations_and_values();
            Dataset::new(x, y)
        }
        TrainingRows::Augmented => data.dataset.to_dataset(),
        TrainingRows::ValuesOnly => data.dataset.values_only().to_dataset(),
    };
    let dim = data.locations.ncols();

    info!("Train '{}' on {} rows", config.name, dataset.records().nrows());
    let now = Instant::now();
    let (model, trace) = match config.kernel {
        KernelChoice::SquaredExponential => {
            let (gp, trace) = fit(
                SquaredExponentialKernel::new(dim),
                config.noise_variance,
                max_iters,
                &dataset,
            )?;
            (TrainedModel::Plain(gp), trace)
        }
        KernelChoice::RbfDerivative => {
            let (gp, trace) = fit(
                RbfDerivativeKernel::new(dim),
                config.noise_variance,
                max_iters,
                &dataset,
            )?;
            (TrainedModel::RbfDerivative(gp), trace)
        }
        KernelChoice::DerivativeSquaredExponential => {
            let (gp, trace) = fit(
                DerivativeKernel::new(SquaredExponentialKernel::new(dim)),
                config.noise_variance,
                max_iters,
                &dataset,
            )?;
            (TrainedModel::Derivative(gp), trace)
        }
    };
    info!(
        "'{}' trained in {:?}ms ({} optimizer steps)",
        config.name,
        now.elapsed().as_millis(),
        trace.len()
    );

    Ok(TrainingReport {
        name: config.name.to_owned(),
        model,
        trace,
    })
}
