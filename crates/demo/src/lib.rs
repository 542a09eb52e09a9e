//! Demo of GP regression using derivative observations.
//!
//! A one dimensional ground truth function is observed (values and derivatives)
//! at a few random locations, then several GP models are trained and compared:
//! a plain squared exponential GP using values only and derivative-aware GPs
//! using values and derivatives (see [`models::model_configs`]).
//!
//! Each trained model summary is printed, its predictions being drawn as a SVG figure.
#![warn(missing_docs)]
pub mod config;
pub mod data;
mod errors;
pub mod ground_truth;
pub mod models;
pub mod plot;
pub mod training;

pub use errors::*;

use config::DemoConfig;
use data::DemoData;
use env_logger::{Builder, Env};
use log::info;
use models::{model_configs, TrainedModel};
use ndarray::Array1;
use plot::{plot_prediction, save_predictions, PlotGrid};
use std::path::Path;
use std::time::{Duration, Instant};
use training::{train, TrainingReport};

/// Environment variable controlling the log level
pub const DGPR_LOG: &str = "DGPR_LOG";

/// Initialize logging on stdout, level given by `DGPR_LOG` (default: info)
pub fn init_logger() {
    let env = Env::new().filter_or(DGPR_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();
}

/// Predictive mean and variance of `model` on `grid` with the time taken to compute them
fn predict_on_grid(
    model: &TrainedModel,
    grid: &PlotGrid,
) -> Result<(Array1<f64>, Array1<f64>, Duration)> {
    let now = Instant::now();
    let (mean, var) = model.predict_y(grid)?;
    Ok((mean, var, now.elapsed()))
}

/// Train enabled model configurations in order, print their summaries and
/// write their figures and predictions in the output directory if any.
pub fn run(config: DemoConfig) -> Result<Vec<TrainingReport>> {
    let config = config.check()?;
    info!("{:?}", config);
    if let Some(dir) = config.get_config_dir() {
        config.save(dir)?;
    }

    let data = DemoData::generate(&config)?;
    let mut reports = vec![];
    for model_config in model_configs(&config).iter().filter(|c| c.enabled) {
        let report = train(model_config, &data, config.get_max_iters())?;
        report.print();

        let grid = report.model.plot_grid(&data.grid);
        let (mean, var, elapsed) = predict_on_grid(&report.model, &grid)?;
        info!(
            "'{}' predictions at {} grid points made in {:?}ms",
            model_config.name,
            grid.locations().len(),
            elapsed.as_millis()
        );
        if let Some(outdir) = config.get_outdir() {
            let outdir = Path::new(outdir);
            std::fs::create_dir_all(outdir)?;
            let name = model_config.slug();
            let path = outdir.join(format!("{name}.svg"));
            plot_prediction(&path, &data, &grid, &mean, &var, config.arrow_dx)?;
            save_predictions(outdir, &name, &grid, &mean, &var)?;
            info!("Figure written in {}", path.display());
        }
        reports.push(report);
    }
    Ok(reports)
}
