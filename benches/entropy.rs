use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use sampen::test_utils::uniform_noise;
use sampen::{
    sample_entropy_sampled, sample_entropy_with, signal_std, ExactEngine, OutputLevel,
    SamplingParams, SamplingScheme,
};

fn bench_exact_engines(c: &mut Criterion) {
    let data = uniform_noise(4096, 99);
    let r = 0.2 * signal_std(&data);

    let mut group = c.benchmark_group("exact m=2 n=4096");
    for (name, engine) in [
        ("sliding-kd", ExactEngine::SlidingKd),
        ("range-kd", ExactEngine::RangeKd),
        ("simple-kd", ExactEngine::SimpleKd),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                sample_entropy_with(black_box(&data), 2, r, engine, OutputLevel::Silent).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let data = uniform_noise(16384, 7);
    let r = 0.2 * signal_std(&data);

    let mut group = c.benchmark_group("sampled m=2 n=16384 n0=1024 n1=10");
    for (name, scheme) in [
        ("swr-uniform", SamplingScheme::SwrUniform),
        ("sobol", SamplingScheme::Sobol),
    ] {
        let params = SamplingParams::new(1024, 10).scheme(scheme);
        group.bench_function(name, |b| {
            b.iter(|| {
                sample_entropy_sampled(black_box(&data), 2, r, &params, None, OutputLevel::Silent)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exact_engines, bench_sampling);
criterion_main!(benches);
