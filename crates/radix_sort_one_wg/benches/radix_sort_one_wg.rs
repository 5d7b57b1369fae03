use std::hint::black_box;
use std::time::{Duration, Instant};

use bench::{apply_runtime_for_size, nearly_sorted, random_below_bits, seeded_rng};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use radix_sort_one_wg::{
    Device, SortConfig, sort_one_group_by_key_with_config, sort_one_group_with_config,
};

const BENCH_SIZES: [usize; 4] = [256, 1024, 4096, 65535];
const BOUNDED_BITS: u32 = 20;

#[derive(Clone, Copy)]
enum Distribution {
    RandomU32,
    BoundedU20,
    NearlySorted1pctSwaps,
}

impl Distribution {
    fn label(self) -> &'static str {
        match self {
            Self::RandomU32 => "random_u32",
            Self::BoundedU20 => "bounded_u20",
            Self::NearlySorted1pctSwaps => "nearly_sorted_1pct_swaps",
        }
    }
}

const DISTRIBUTIONS: [Distribution; 3] = [
    Distribution::RandomU32,
    Distribution::BoundedU20,
    Distribution::NearlySorted1pctSwaps,
];

fn generate_dataset(dist: Distribution, size: usize) -> Vec<u32> {
    let mut rng = seeded_rng(size as u64 ^ ((dist as u64) << 48));
    match dist {
        Distribution::RandomU32 => (0..size).map(|_| random_below_bits(&mut rng, 32) as u32).collect(),
        Distribution::BoundedU20 => (0..size)
            .map(|_| random_below_bits(&mut rng, BOUNDED_BITS) as u32)
            .collect(),
        Distribution::NearlySorted1pctSwaps => nearly_sorted(&mut rng, size)
            .into_iter()
            .map(|x| x as u32)
            .collect(),
    }
}

fn bench_keys(c: &mut Criterion) {
    let device = Device::default();

    for &dist in &DISTRIBUTIONS {
        let mut group = c.benchmark_group(format!("one_wg/{}", dist.label()));

        for &size in &BENCH_SIZES {
            apply_runtime_for_size(&mut group, size);
            let base = generate_dataset(dist, size);
            let config = SortConfig::for_len(size);

            group.bench_function(BenchmarkId::new("radix_sort_one_wg", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let mut data = base.clone();
                        let start = Instant::now();
                        sort_one_group_with_config(&device, &mut data, true, &config)
                            .expect("bench input fits one group");
                        total += start.elapsed();
                        black_box(&data);
                    }
                    total
                });
            });

            group.bench_function(BenchmarkId::new("std_stable", size), |bencher| {
                bencher.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for _ in 0..iters {
                        let mut data = base.clone();
                        let start = Instant::now();
                        data.sort();
                        total += start.elapsed();
                        black_box(&data);
                    }
                    total
                });
            });
        }

        group.finish();
    }
}

fn bench_pairs(c: &mut Criterion) {
    let device = Device::default();
    let mut group = c.benchmark_group("one_wg/pairs_f32");

    for &size in &BENCH_SIZES {
        apply_runtime_for_size(&mut group, size);
        let mut rng = seeded_rng(0xBA5E_0001 ^ size as u64);
        let base: Vec<(f32, u32)> = (0..size as u32)
            .map(|i| (random_below_bits(&mut rng, 24) as f32 - 8.0e6, i))
            .collect();
        let config = SortConfig::for_len(size);

        group.bench_function(BenchmarkId::new("radix_sort_one_wg", size), |bencher| {
            bencher.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let mut data = base.clone();
                    let start = Instant::now();
                    sort_one_group_by_key_with_config(&device, &mut data, |p: &(f32, u32)| p.0, true, &config)
                        .expect("bench input fits one group");
                    total += start.elapsed();
                    black_box(&data);
                }
                total
            });
        });

        group.bench_function(BenchmarkId::new("std_stable_total_cmp", size), |bencher| {
            bencher.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for _ in 0..iters {
                    let mut data = base.clone();
                    let start = Instant::now();
                    data.sort_by(|a, b| a.0.total_cmp(&b.0));
                    total += start.elapsed();
                    black_box(&data);
                }
                total
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_keys, bench_pairs);
criterion_main!(benches);
