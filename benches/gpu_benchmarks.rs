// benches/gpu_benchmarks.rs — GPU session benchmarks.
//
// Mirrors benchmarks.rs so each CPU case has a GPU counterpart for
// direct comparison:
//   cargo bench --bench gpu_benchmarks
//
// Requires a compute device; session construction panics otherwise.
//
// Criterion measures wall time including host overhead (params write,
// input buffer creation, submit, blocking readback) — the right metric
// here, since `resample` blocks its caller until the means are back.
// The explicit warm-up absorbs lazy pipeline JIT on some drivers.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use bootsample::{BootstrapSession, CpuBootstrap};

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    group.warm_up_time(Duration::from_secs(2));

    for (n, input_len) in [(1000u32, 100usize), (1000, 1000), (100_000, 100)] {
        let input: Vec<f32> = (0..input_len).map(|i| i as f32 * 0.5).collect();

        group.bench_function(
            BenchmarkId::new("cpu", format!("n{n}_len{input_len}")),
            |b| {
                let mut boot = CpuBootstrap::new(n as usize, 42);
                b.iter(|| boot.resample(&input));
            },
        );

        group.bench_function(
            BenchmarkId::new("gpu", format!("n{n}_len{input_len}")),
            |b| {
                let mut session =
                    BootstrapSession::new(n, 42).expect("no compute device");
                b.iter(|| session.resample(&input).expect("resample failed"));
            },
        );
    }

    group.finish();
}

fn bench_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");
    group.warm_up_time(Duration::from_secs(2));
    group.sample_size(10); // device selection + program build is slow

    group.bench_function("session_new_n1000", |b| {
        b.iter(|| BootstrapSession::new(1000, 42).expect("no compute device"));
    });

    group.bench_function("set_parameters_n1000", |b| {
        let mut session = BootstrapSession::new(1000, 42).expect("no compute device");
        let mut seed = 0u32;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            session.set_parameters(1000, seed).expect("reconfigure failed");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resample, bench_configuration);
criterion_main!(benches);
