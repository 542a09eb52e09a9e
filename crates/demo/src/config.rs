//! Demo configuration.
use crate::errors::{DemoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the file where configuration used by a run is saved
pub const CONFIG_FILE: &str = "derivative_gps_config.json";

/// Demo configuration
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DemoConfig {
    /// Number of training locations drawn uniformly in [0, 1)
    pub(crate) n_points: usize,
    /// Seed of the random generator drawing training locations
    pub(crate) seed: u64,
    /// Number of evaluation grid points
    pub(crate) n_grid: usize,
    /// Evaluation grid spans [min - margin, max + margin] of training locations
    pub(crate) grid_margin: f64,
    /// Likelihood variance, fixed during training
    pub(crate) noise_variance: f64,
    /// Max number of hyperparameters optimizer iterations per model
    pub(crate) max_iters: usize,
    /// Whether the derivative kernel model trained on values only is run
    pub(crate) values_only_model: bool,
    /// Step used to draw derivative arrows
    pub(crate) arrow_dx: f64,
    /// Directory where figures and predictions are written
    pub(crate) outdir: Option<String>,
    /// Whether the configuration is also written in the output directory
    #[serde(default)]
    pub(crate) save_config: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            n_points: 10,
            seed: 100,
            n_grid: 50,
            grid_margin: 0.2,
            noise_variance: 1e-3,
            max_iters: 10,
            values_only_model: false,
            arrow_dx: 0.05,
            outdir: Some("derivative_gps_output".to_string()),
            save_config: false,
        }
    }
}

impl DemoConfig {
    /// Sets the number of training locations
    pub fn n_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    /// Sets the random generator seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of evaluation grid points
    pub fn n_grid(mut self, n_grid: usize) -> Self {
        self.n_grid = n_grid;
        self
    }

    /// Sets the evaluation grid margin around training locations
    pub fn grid_margin(mut self, grid_margin: f64) -> Self {
        self.grid_margin = grid_margin;
        self
    }

    /// Sets the fixed likelihood variance
    pub fn noise_variance(mut self, noise_variance: f64) -> Self {
        self.noise_variance = noise_variance;
        self
    }

    /// Sets max number of optimizer iterations per model
    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Enables the derivative kernel model trained on function values only
    pub fn values_only_model(mut self, enabled: bool) -> Self {
        self.values_only_model = enabled;
        self
    }

    /// Sets derivative arrows step
    pub fn arrow_dx(mut self, arrow_dx: f64) -> Self {
        self.arrow_dx = arrow_dx;
        self
    }

    /// Sets the output directory
    pub fn outdir(mut self, outdir: impl Into<String>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    /// Do not write any file
    pub fn no_outdir(mut self) -> Self {
        self.outdir = None;
        self
    }

    /// Also write the configuration as json in the output directory
    pub fn save_config(mut self, enabled: bool) -> Self {
        self.save_config = enabled;
        self
    }

    /// Directory where the configuration is to be saved, if any
    pub fn get_config_dir(&self) -> Option<&str> {
        if self.save_config {
            self.get_outdir()
        } else {
            None
        }
    }

    /// Get max number of optimizer iterations per model
    pub fn get_max_iters(&self) -> usize {
        self.max_iters
    }

    /// Get the output directory if any
    pub fn get_outdir(&self) -> Option<&str> {
        self.outdir.as_deref()
    }

    /// Validate configuration
    pub fn check(self) -> Result<Self> {
        if self.n_points == 0 {
            return Err(DemoError::InvalidConfigError(
                "At least one training location is required".to_string(),
            ));
        }
        if self.n_grid < 2 {
            return Err(DemoError::InvalidConfigError(format!(
                "Evaluation grid needs at least 2 points, got {}",
                self.n_grid
            )));
        }
        if !(self.noise_variance >= 0. && self.noise_variance.is_finite()) {
            return Err(DemoError::InvalidConfigError(format!(
                "Noise variance should be non negative, got {}",
                self.noise_variance
            )));
        }
        if !(self.grid_margin >= 0. && self.arrow_dx > 0.) {
            return Err(DemoError::InvalidConfigError(
                "Grid margin should be non negative and arrow step positive".to_string(),
            ));
        }
        Ok(self)
    }

    /// Write configuration as json in `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        std::fs::create_dir_all(dir.as_ref())?;
        let filepath = dir.as_ref().join(CONFIG_FILE);
        let json = serde_json::to_string(self)?;
        std::fs::write(filepath, json)?;
        Ok(())
    }
}
