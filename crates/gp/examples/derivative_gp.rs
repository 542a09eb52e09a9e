use dgpr_gp::{DerivativeDataset, GaussianProcess, RbfDerivativeKernel, SquaredExponentialKernel};
use linfa::prelude::*;
use ndarray::{arr2, Array, Axis};

fn main() {
    let xtrain = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0]]);
    let ytrain = xtrain.column(0).mapv(f64::sin);
    let dytrain = xtrain.mapv(f64::cos);
    let ds = DerivativeDataset::new(&xtrain, &ytrain, &dytrain).expect("valid data");

    let gp = GaussianProcess::params(SquaredExponentialKernel::new(1))
        .fixed_noise_variance(1e-6)
        .fit(&Dataset::new(xtrain.to_owned(), ytrain.to_owned()))
        .expect("GP fitting");
    let (gpd, trace) = GaussianProcess::params(RbfDerivativeKernel::new(1))
        .fixed_noise_variance(1e-6)
        .fit_with_trace(&ds.to_dataset())
        .expect("GP with derivatives fitting");
    println!("{gp}");
    println!("{gpd}");
    println!("{} iterations", trace.len());

    let xtest = Array::linspace(0., 4., 9).insert_axis(Axis(1));
    let ytest = xtest.column(0).mapv(f64::sin);
    let ypred = gp.predict(&xtest).expect("GP prediction");
    let (ypred_d, _) = gpd.predict_values(&xtest).expect("GP prediction");
    println!("error without derivatives: {}", (&ypred - &ytest).mapv(f64::abs).sum());
    println!("error with derivatives: {}", (&ypred_d - &ytest).mapv(f64::abs).sum());
}
