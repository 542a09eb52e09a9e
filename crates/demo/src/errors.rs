use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// A result type for the demo
pub type Result<T> = std::result::Result<T, DemoError>;

/// An error when running the demo
#[derive(Error, Debug)]
pub enum DemoError {
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When GP training or prediction fails
    #[error("GP error")]
    GpError(#[from] dgpr_gp::GpError),
    /// When IO fails
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    /// When numpy array write fails
    #[error("IO error")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
    /// When configuration serialization fails
    #[error("Save error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// When min or max of an empty or unordered array is requested
    #[error("MinMax error")]
    MinMaxError(#[from] ndarray_stats::errors::MinMaxError),
    /// When arrays shapes are inconsistent
    #[error("Shape error")]
    ShapeError(#[from] ndarray::ShapeError),
    /// When figure drawing fails
    #[error("Plot error: {0}")]
    PlotError(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for DemoError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        DemoError::PlotError(err.to_string())
    }
}
