//! Figures of trained models against ground truth and training data.
use crate::data::DemoData;
use crate::errors::Result;
use crate::ground_truth::ground_truth_at;

use ndarray::{stack, Array1, Array2, Axis};
use ndarray_npy::write_npy;
use ndarray_stats::QuantileExt;
use plotters::prelude::*;
use std::path::Path;

/// Horizontal range of figures
pub const X_RANGE: (f64, f64) = (-0.1, 1.1);

/// Evaluation grid in the input format expected by a model
#[derive(Clone, Debug, PartialEq)]
pub enum PlotGrid {
    /// Plain locations
    Plain(Array1<f64>),
    /// Locations with their observation flags (0 for function values)
    Augmented(Array1<f64>, Array1<f64>),
}

impl PlotGrid {
    /// Model inputs: (n, 1) locations or (n, 2) augmented rows.
    ///
    /// Fails when augmented locations and flags lengths differ.
    pub fn model_inputs(&self) -> Result<Array2<f64>> {
        let inputs = match self {
            PlotGrid::Plain(locations) => locations.to_owned().insert_axis(Axis(1)),
            PlotGrid::Augmented(locations, flags) => {
                stack(Axis(1), &[locations.view(), flags.view()])?
            }
        };
        Ok(inputs)
    }

    /// Grid locations
    pub fn locations(&self) -> &Array1<f64> {
        match self {
            PlotGrid::Plain(locations) | PlotGrid::Augmented(locations, _) => locations,
        }
    }

    /// Whether derivatives observations were used, thus shown
    pub fn shows_derivatives(&self) -> bool {
        matches!(self, PlotGrid::Augmented(..))
    }
}

/// Lower and upper bounds of the `mean ± 2σ` band
pub fn prediction_band(mean: &Array1<f64>, var: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
    let two_std = var.mapv(|v| 2. * v.max(0.).sqrt());
    (mean - &two_std, mean + &two_std)
}

/// Segments `(x, f) -> (x + dx, f + f'.dx)` drawn at each training location
pub fn derivative_arrows(
    locations: &Array1<f64>,
    values: &Array1<f64>,
    derivatives: &Array1<f64>,
    dx: f64,
) -> Vec<((f64, f64), (f64, f64))> {
    locations
        .iter()
        .zip(values.iter())
        .zip(derivatives.iter())
        .map(|((x, f), df)| ((*x, *f), (x + dx, f + df * dx)))
        .collect()
}

fn value_range<'a>(series: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let values: Array1<f64> = series
        .into_iter()
        .map(|v| if v.is_finite() { *v } else { f64::NAN })
        .collect();
    let (lo, up) = (*values.min_skipnan(), *values.max_skipnan());
    if lo.is_nan() || up.is_nan() {
        return (-1., 1.);
    }
    let pad = 0.1 * (up - lo).max(1e-3);
    (lo - pad, up + pad)
}

/// Draw ground truth (green), training points (black crosses), derivative arrows
/// when the grid is augmented, predictive mean (blue) and `mean ± 2σ` band
/// as a SVG file.
pub fn plot_prediction(
    path: impl AsRef<Path>,
    data: &DemoData,
    grid: &PlotGrid,
    mean: &Array1<f64>,
    var: &Array1<f64>,
    arrow_dx: f64,
) -> Result<()> {
    let locations = grid.locations();
    let (truth, _) = ground_truth_at(locations);
    let (lower, upper) = prediction_band(mean, var);
    let arrows = if grid.shows_derivatives() {
        derivative_arrows(
            &data.locations.column(0).to_owned(),
            &data.values,
            &data.derivatives.column(0).to_owned(),
            arrow_dx,
        )
    } else {
        vec![]
    };
    let (ymin, ymax) = value_range(
        truth
            .iter()
            .chain(lower.iter())
            .chain(upper.iter())
            .chain(data.values.iter()),
    );

    let root = SVGBackend::new(path.as_ref(), (1024, 640)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(X_RANGE.0..X_RANGE.1, ymin..ymax)?;

    let band: Vec<(f64, f64)> = locations
        .iter()
        .zip(upper.iter())
        .map(|(x, y)| (*x, *y))
        .chain(
            locations
                .iter()
                .zip(lower.iter())
                .rev()
                .map(|(x, y)| (*x, *y)),
        )
        .collect();
    chart.draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.2).filled())))?;

    chart.draw_series(LineSeries::new(
        locations.iter().zip(truth.iter()).map(|(x, y)| (*x, *y)),
        GREEN.stroke_width(4),
    ))?;

    chart.draw_series(
        data.locations
            .column(0)
            .iter()
            .zip(data.values.iter())
            .map(|(x, y)| Cross::new((*x, *y), 6, BLACK.stroke_width(2))),
    )?;

    for (start, end) in arrows.iter() {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![*start, *end],
            BLACK.stroke_width(2),
        )))?;
        // arrow head drawn in pixel space
        let (sx, sy) = chart.backend_coord(start);
        let (ex, ey) = chart.backend_coord(end);
        let (dx, dy) = (f64::from(ex - sx), f64::from(ey - sy));
        let len = (dx * dx + dy * dy).sqrt();
        if len >= 1. {
            let (ux, uy) = (dx / len, dy / len);
            let (bx, by) = (f64::from(ex) - 8. * ux, f64::from(ey) - 8. * uy);
            let head = vec![
                (ex, ey),
                ((bx - 4. * uy).round() as i32, (by + 4. * ux).round() as i32),
                ((bx + 4. * uy).round() as i32, (by - 4. * ux).round() as i32),
            ];
            root.draw(&Polygon::new(head, BLACK.filled()))?;
        }
    }

    chart.draw_series(LineSeries::new(
        locations.iter().zip(mean.iter()).map(|(x, y)| (*x, *y)),
        BLUE.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

/// Save grid locations, predictive mean and variance as numpy files in `dir`
pub fn save_predictions(
    dir: impl AsRef<Path>,
    name: &str,
    grid: &PlotGrid,
    mean: &Array1<f64>,
    var: &Array1<f64>,
) -> Result<()> {
    let dir = dir.as_ref();
    write_npy(dir.join(format!("{name}_grid.npy")), &grid.model_inputs()?)?;
    write_npy(dir.join(format!("{name}_mean.npy")), mean)?;
    write_npy(dir.join(format!("{name}_var.npy")), var)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_plot_grid_inputs() {
        let locations = array![0., 0.5, 1.];
        let plain = PlotGrid::Plain(locations.to_owned());
        assert_eq!(
            plain.model_inputs().expect("inputs"),
            array![[0.], [0.5], [1.]]
        );
        assert!(!plain.shows_derivatives());

        let augmented = PlotGrid::Augmented(locations.to_owned(), Array1::zeros(3));
        assert_eq!(
            augmented.model_inputs().expect("inputs"),
            array![[0., 0.], [0.5, 0.], [1., 0.]]
        );
        assert!(augmented.shows_derivatives());
        assert_eq!(augmented.locations(), &locations);

        let mismatched = PlotGrid::Augmented(locations, Array1::zeros(2));
        assert!(matches!(
            mismatched.model_inputs(),
            Err(crate::DemoError::ShapeError(_))
        ));
    }

    #[test]
    fn test_prediction_band() {
        let mean = array![1., -1.];
        let var = array![0.25, 4.];
        let (lower, upper) = prediction_band(&mean, &var);
        assert_abs_diff_eq!(lower, array![0., -5.], epsilon = 1e-12);
        assert_abs_diff_eq!(upper, array![2., 3.], epsilon = 1e-12);
    }

    #[test]
    fn test_derivative_arrows() {
        let arrows = derivative_arrows(&array![0.2], &array![1.], &array![4.], 0.05);
        assert_eq!(arrows.len(), 1);
        let ((x0, y0), (x1, y1)) = arrows[0];
        assert_eq!((x0, y0), (0.2, 1.));
        assert_abs_diff_eq!(x1, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(y1, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_value_range() {
        let values = [0., 1., f64::NAN, f64::INFINITY];
        let (lo, up) = value_range(values.iter());
        assert_abs_diff_eq!(lo, -0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(up, 1.1, epsilon = 1e-12);
        assert_eq!(value_range(std::iter::empty()), (-1., 1.));
        assert_eq!(value_range([f64::NAN].iter()), (-1., 1.));
    }

    #[test]
    fn test_plot_files() {
        let dir = std::env::temp_dir().join("dgpr_demo_test_plot_files");
        std::fs::create_dir_all(&dir).expect("output dir");
        let data = DemoData::generate(&DemoConfig::default()).expect("data");
        let grid = PlotGrid::Augmented(data.grid.to_owned(), Array1::zeros(data.grid.len()));
        let (mean, _) = ground_truth_at(&data.grid);
        let var = Array1::from_elem(data.grid.len(), 0.01);

        let path = dir.join("plot.svg");
        plot_prediction(&path, &data, &grid, &mean, &var, 0.05).expect("plot");
        let svg = std::fs::read_to_string(&path).expect("svg");
        assert!(svg.contains("<svg"));

        save_predictions(&dir, "model", &grid, &mean, &var).expect("npy");
        assert!(dir.join("model_grid.npy").exists());
        assert!(dir.join("model_mean.npy").exists());
        assert!(dir.join("model_var.npy").exists());
    }
}
