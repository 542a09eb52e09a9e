use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{CostFunction, Error, Executor, State, KV};
use argmin::solver::neldermead::NelderMead;
use linfa::Float;
use ndarray::{arr1, Array1};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::Result;

pub(crate) struct NelderMeadParams {
    pub step: f64,
    pub sd_tolerance: f64,
    pub max_iters: usize,
}

impl Default for NelderMeadParams {
    fn default() -> Self {
        NelderMeadParams {
            step: 0.5,
            sd_tolerance: 1e-4,
            max_iters: crate::GP_OPTIM_MAX_ITERS,
        }
    }
}

/// Wall-clock instants recorded at each hyperparameters optimizer iteration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrainingTrace {
    steps: Vec<Instant>,
}

impl TrainingTrace {
    /// An empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the current instant
    pub fn record(&mut self) {
        self.steps.push(Instant::now());
    }

    /// Recorded instants in chronological order
    pub fn steps(&self) -> &[Instant] {
        &self.steps
    }

    /// Number of recorded iterations
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no iteration was recorded
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Durations between consecutive iterations (one less than the number of steps)
    pub fn intervals(&self) -> Vec<Duration> {
        self.steps
            .windows(2)
            .map(|w| w[1].duration_since(w[0]))
            .collect()
    }

    /// Intervals in seconds
    pub fn intervals_secs(&self) -> Array1<f64> {
        self.intervals().iter().map(|d| d.as_secs_f64()).collect()
    }
}

// Observer shared with the executor: argmin takes ownership of observers
// so instants are collected through a shared buffer and moved out after the run.
struct StepRecorder {
    trace: Arc<Mutex<TrainingTrace>>,
}

impl<I: State> Observe<I> for StepRecorder {
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> std::result::Result<(), Error> {
        log::info!("step");
        log::debug!(
            "iter {} best cost {}",
            state.get_iter(),
            state.get_best_cost()
        );
        match self.trace.lock() {
            Ok(mut trace) => trace.record(),
            Err(e) => return Err(Error::msg(format!("training trace lock poisoned: {e}"))),
        }
        Ok(())
    }
}

struct BoundedObjective<'a, ObjF> {
    objfn: ObjF,
    bounds: &'a [(f64, f64)],
}

impl<ObjF> CostFunction for BoundedObjective<'_, ObjF>
where
    ObjF: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<Self::Output, Error> {
        let inside = param
            .iter()
            .zip(self.bounds.iter())
            .all(|(v, (lo, up))| lo <= v && v <= up);
        if !inside {
            return Ok(f64::INFINITY);
        }
        let fval = (self.objfn)(param);
        Ok(if f64::is_nan(fval) { f64::INFINITY } else { fval })
    }
}

/// Initial simplex: starting point plus one step along each axis, stepping
/// backward when the forward vertex would leave the search space.
fn initial_simplex(param0: &[f64], bounds: &[(f64, f64)], step: f64) -> Vec<Vec<f64>> {
    let mut simplex = vec![param0.to_vec()];
    for (i, (lo, up)) in bounds.iter().enumerate() {
        let mut vertex = param0.to_vec();
        vertex[i] = if param0[i] + step <= *up {
            param0[i] + step
        } else {
            (param0[i] - step).max(*lo)
        };
        simplex.push(vertex);
    }
    simplex
}

/// Minimize `objfn` (taking log10 hyper parameters) with Nelder-Mead
/// starting from `param0` within `bounds`.
///
/// Returns the best value found, the matching parameters and the trace
/// of iterations.
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    params: NelderMeadParams,
) -> Result<(f64, Array1<f64>, TrainingTrace)>
where
    ObjF: Fn(&[f64]) -> f64,
    F: Float,
{
    let param0: Vec<f64> = param0.iter().map(|v| into_f64(*v)).collect();
    let bounds: Vec<(f64, f64)> = bounds
        .iter()
        .map(|(lo, up)| (into_f64(*lo), into_f64(*up)))
        .collect();
    // clip starting point so that the first vertex gets a finite cost
    let param0: Vec<f64> = param0
        .iter()
        .zip(bounds.iter())
        .map(|(v, (lo, up))| v.max(*lo).min(*up))
        .collect();

    if params.max_iters == 0 {
        let fval = BoundedObjective {
            objfn,
            bounds: &bounds,
        }
        .cost(&param0)?;
        return Ok((fval, arr1(&param0), TrainingTrace::new()));
    }

    let trace = Arc::new(Mutex::new(TrainingTrace::new()));
    let problem = BoundedObjective {
        objfn,
        bounds: &bounds,
    };
    let solver = NelderMead::new(initial_simplex(&param0, &bounds, params.step))
        .with_sd_tolerance(params.sd_tolerance)?;
    let observer = StepRecorder {
        trace: Arc::clone(&trace),
    };
    let res = Executor::new(problem, solver)
        .configure(|state| state.max_iters(params.max_iters as u64))
        .add_observer(observer, ObserverMode::Always)
        .run()?;
    log::debug!("{}", res);

    let state = res.state();
    let fval = state.get_best_cost();
    let param_opt = match state.get_best_param() {
        Some(best) => arr1(best),
        None => {
            log::warn!("Nelder-Mead optimizer gave no best parameters, keeping initial ones");
            arr1(&param0)
        }
    };
    let trace = match trace.lock() {
        Ok(mut trace) => std::mem::take(&mut *trace),
        Err(e) => std::mem::take(&mut *e.into_inner()),
    };
    Ok((fval, param_opt, trace))
}

#[inline(always)]
fn into_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_optimize_quadratic() {
        let objfn = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[1] + 0.2).powi(2);
        let (fval, xopt, trace) = optimize_params(
            objfn,
            &array![1., 1.],
            &[(-2., 2.), (-2., 2.)],
            NelderMeadParams {
                max_iters: 200,
                sd_tolerance: 1e-12,
                ..NelderMeadParams::default()
            },
        )
        .expect("optimization");
        assert_abs_diff_eq!(fval, 0., epsilon = 1e-6);
        assert_abs_diff_eq!(xopt, array![0.3, -0.2], epsilon = 1e-3);
        assert!(!trace.is_empty());
        assert!(trace.len() <= 200);
    }

    #[test]
    fn test_trace_length_bounded_by_max_iters() {
        for max_iters in [1, 3, 10] {
            let (_, _, trace) = optimize_params(
                |x: &[f64]| x[0].sin() + x[1].cos(),
                &array![0.5, 0.5],
                &[(-3., 3.), (-3., 3.)],
                NelderMeadParams {
                    max_iters,
                    sd_tolerance: 0.,
                    ..NelderMeadParams::default()
                },
            )
            .expect("optimization");
            assert_eq!(trace.len(), max_iters);
            assert_eq!(trace.intervals().len(), max_iters - 1);
            assert!(trace.steps().windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_no_iteration() {
        let (fval, xopt, trace) = optimize_params(
            |x: &[f64]| x[0] * x[0],
            &array![2.],
            &[(-1., 1.)],
            NelderMeadParams {
                max_iters: 0,
                ..NelderMeadParams::default()
            },
        )
        .expect("evaluation");
        assert_eq!(xopt, array![1.]);
        assert_eq!(fval, 1.);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_out_of_bounds_and_nan_are_infinite() {
        let bounds = [(0., 1.)];
        let objective = BoundedObjective {
            objfn: |x: &[f64]| if x[0] > 0.5 { f64::NAN } else { x[0] },
            bounds: &bounds,
        };
        assert_eq!(objective.cost(&vec![0.2]).unwrap(), 0.2);
        assert_eq!(objective.cost(&vec![0.8]).unwrap(), f64::INFINITY);
        assert_eq!(objective.cost(&vec![1.5]).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_initial_simplex() {
        let simplex = initial_simplex(&[0., 0.8], &[(-1., 1.), (-1., 1.)], 0.5);
        let expected = [[0., 0.8], [0.5, 0.8], [0., 0.3]];
        assert_eq!(simplex.len(), expected.len());
        for (vertex, expected) in simplex.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(vertex.as_slice(), &expected[..], epsilon = 1e-12);
        }
        // stepping backward is clipped to the lower bound
        let simplex = initial_simplex(&[0.9], &[(0.7, 1.)], 0.5);
        assert_abs_diff_eq!(simplex[1][0], 0.7, epsilon = 1e-12);
    }
}
