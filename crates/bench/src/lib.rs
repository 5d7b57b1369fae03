use std::time::Duration;

use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, SamplingMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SMALL_RUNTIME_SAMPLE_SIZE: usize = 15;
const SMALL_RUNTIME_WARM_UP_MS: u64 = 100;
const SMALL_RUNTIME_MEASURE_MS: u64 = 200;
const LARGE_RUNTIME_SAMPLE_SIZE: usize = 10;
const LARGE_RUNTIME_WARM_UP_MS: u64 = 300;
const LARGE_RUNTIME_MEASURE_MS: u64 = 800;
const LARGE_INPUT_THRESHOLD: usize = 8192;
const RNG_SEED: u64 = 0x5EED_2026;

pub fn apply_small_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(SMALL_RUNTIME_SAMPLE_SIZE);
    group.sampling_mode(SamplingMode::Auto);
    group.warm_up_time(Duration::from_millis(SMALL_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(SMALL_RUNTIME_MEASURE_MS));
}

pub fn apply_large_runtime_config<M: Measurement>(group: &mut BenchmarkGroup<'_, M>) {
    group.sample_size(LARGE_RUNTIME_SAMPLE_SIZE);
    group.sampling_mode(SamplingMode::Flat);
    group.warm_up_time(Duration::from_millis(LARGE_RUNTIME_WARM_UP_MS));
    group.measurement_time(Duration::from_millis(LARGE_RUNTIME_MEASURE_MS));
}

/// Picks the runtime preset for an input of `size` elements.
pub fn apply_runtime_for_size<M: Measurement>(group: &mut BenchmarkGroup<'_, M>, size: usize) {
    if size <= LARGE_INPUT_THRESHOLD {
        apply_small_runtime_config(group);
    } else {
        apply_large_runtime_config(group);
    }
}

pub fn default_rng() -> StdRng {
    StdRng::seed_from_u64(RNG_SEED)
}

pub fn seeded_rng(salt: u64) -> StdRng {
    StdRng::seed_from_u64(mix_seed(RNG_SEED ^ salt))
}

/// Uniform value in `[0, 2^bits)`.
pub fn random_below_bits<R: Rng + ?Sized>(rng: &mut R, bits: u32) -> u64 {
    if bits == 0 {
        0
    } else if bits >= 64 {
        rng.random::<u64>()
    } else {
        rng.random_range(0..(1_u64 << bits))
    }
}

/// `0..size` with 1% of positions swapped at random.
pub fn nearly_sorted<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<u64> {
    let mut data: Vec<u64> = (0..size as u64).collect();
    if size == 0 {
        return data;
    }
    let swaps = (size / 100).max(1);
    for _ in 0..swaps {
        let a = rng.random_range(0..size);
        let b = rng.random_range(0..size);
        data.swap(a, b);
    }
    data
}

#[inline]
fn mix_seed(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_values_stay_in_range() {
        let mut rng = default_rng();
        for bits in [0_u32, 1, 7, 20, 63, 64] {
            for _ in 0..100 {
                let x = random_below_bits(&mut rng, bits);
                if bits < 64 {
                    assert!(x < (1_u64 << bits));
                }
            }
        }
    }

    #[test]
    fn nearly_sorted_is_a_permutation() {
        let mut rng = seeded_rng(7);
        let mut data = nearly_sorted(&mut rng, 1000);
        data.sort_unstable();
        assert!(data.iter().enumerate().all(|(i, &x)| x == i as u64));
        assert!(nearly_sorted(&mut rng, 0).is_empty());
    }
}
