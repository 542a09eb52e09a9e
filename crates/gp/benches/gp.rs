use criterion::{criterion_group, criterion_main, Criterion};
use dgpr_gp::{
    DerivativeDataset, DerivativeKernel, GaussianProcess, RbfDerivativeKernel,
    SquaredExponentialKernel,
};
use linfa::prelude::Fit;
use ndarray::Array2;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn dataset(nt: usize) -> DerivativeDataset<f64> {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let x = Array2::random_using((nt, 1), Uniform::new(0., 1.), &mut rng);
    let values = x.column(0).mapv(|v: f64| (12. * v).sin() + 0.66 * (25. * v).cos());
    let derivs = x.mapv(|v: f64| 12. * (12. * v).cos() - 16.5 * (25. * v).sin());
    DerivativeDataset::new(&x, &values, &derivs).expect("valid data")
}

fn criterion_gp(c: &mut Criterion) {
    let nts = [10, 50, 100];

    let mut group = c.benchmark_group("gp");
    group.sample_size(20);
    for nt in nts {
        let ds = dataset(nt).to_dataset();

        group.bench_function(format!("rbf derivative {nt}"), |b| {
            b.iter(|| {
                std::hint::black_box(
                    GaussianProcess::params(RbfDerivativeKernel::new(1))
                        .fixed_noise_variance(1e-3)
                        .max_iters(10)
                        .fit(&ds)
                        .expect("GP fit error"),
                )
            });
        });

        group.bench_function(format!("derivative squared exponential {nt}"), |b| {
            b.iter(|| {
                std::hint::black_box(
                    GaussianProcess::params(DerivativeKernel::new(
                        SquaredExponentialKernel::new(1),
                    ))
                    .fixed_noise_variance(1e-3)
                    .max_iters(10)
                    .fit(&ds)
                    .expect("GP fit error"),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_gp);
criterion_main!(benches);
