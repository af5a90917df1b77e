//! Shared helpers for the integration tests: synthetic datasets with exact
//! order statistics, and the accuracy assertions run against them.

#![allow(dead_code)]

use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, LogNormal, Normal};

use quantile_sketch::{DDSketch, KeyMapping, Store};

pub const TEST_RELATIVE_ACCURACY: f64 = 0.05;
pub const TEST_BIN_LIMIT: i64 = 1024;
pub const TEST_QUANTILES: &[f64] = &[0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 0.999, 1.0];

pub fn rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// A materialized dataset with exact order statistics for reference.
pub struct Dataset {
    values: Vec<f64>,
    sorted: Vec<f64>,
}

impl Dataset {
    pub fn new(values: Vec<f64>) -> Self {
        let mut sorted = values.clone();
        sorted.sort_by_key(|&value| OrderedFloat(value));
        Self { values, sorted }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn add(&mut self, value: f64) {
        self.values.push(value);
        let pos = self.sorted.partition_point(|&sorted| sorted < value);
        self.sorted.insert(pos, value);
    }

    pub fn add_all(&mut self, values: &[f64]) {
        for &value in values {
            self.add(value);
        }
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn avg(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    /// The exact quantile: the value at rank `trunc(q * (len - 1))`.
    pub fn quantile(&self, quantile: f64) -> f64 {
        let rank = (quantile * (self.len() - 1) as f64) as usize;
        self.sorted[rank]
    }
}

// Deterministic datasets.

pub fn uniform_forward(size: usize) -> Dataset {
    Dataset::new((0..size).map(|n| n as f64).collect())
}

pub fn uniform_backward(size: usize) -> Dataset {
    Dataset::new((1..=size).rev().map(|n| n as f64).collect())
}

pub fn negative_uniform_forward(size: usize) -> Dataset {
    Dataset::new((1..=size).rev().map(|n| -(n as f64)).collect())
}

pub fn negative_uniform_backward(size: usize) -> Dataset {
    Dataset::new((0..size).map(|n| -(n as f64)).collect())
}

pub fn number_line_forward(size: usize) -> Dataset {
    let half = (size / 2) as i64;
    Dataset::new((half - size as i64..=half - 1).rev().map(|n| n as f64).collect())
}

pub fn number_line_backward(size: usize) -> Dataset {
    let half = (size / 2) as i64;
    Dataset::new((half - size as i64 + 1..=half).rev().map(|n| n as f64).collect())
}

/// Alternates between the two ends of the range, closing toward the middle.
pub fn uniform_zoom_in(size: usize) -> Dataset {
    let mut values = Vec::with_capacity(size);
    for item in 0..size / 2 {
        values.push(item as f64);
        values.push((size - item - 1) as f64);
    }
    if size % 2 == 1 {
        values.push((size / 2) as f64);
    }
    Dataset::new(values)
}

/// Starts at the middle of the range and spirals outward. Ties at the exact
/// middle round half away from zero.
pub fn uniform_zoom_out(size: usize) -> Dataset {
    let mut values = Vec::with_capacity(size);
    let half = size as i64 / 2;

    if size % 2 == 1 {
        values.push(half as f64);
        for item in 1..=half {
            values.push((half + item) as f64);
            values.push((half - item) as f64);
        }
    } else {
        for item in 0..half {
            values.push((half + item) as f64);
            values.push((half - item - 1) as f64);
        }
    }
    Dataset::new(values)
}

/// Sweeps the range repeatedly with quadratically growing skips.
pub fn uniform_sqrt(size: usize) -> Dataset {
    let mut values = Vec::with_capacity(size);
    let t = ((2 * size) as f64).sqrt() as i64;
    let mut initial_item = 0i64;
    let mut initial_skip = 1i64;
    let mut emitted = 0usize;
    let mut i = 0i64;

    while emitted < size {
        let mut item = initial_item;
        let mut skip = initial_skip;

        for _ in 0..(t - i).max(0) {
            if (item as usize) < size {
                values.push(item as f64);
                emitted += 1;
            }
            item += skip;
            skip += 1;
        }

        if t - i > 1 {
            initial_skip += 1;
            initial_item += initial_skip;
            i += 1;
        } else {
            initial_item += 1;
        }
    }

    Dataset::new(values)
}

pub fn constant(size: usize) -> Dataset {
    Dataset::new(vec![42.0; size])
}

// Randomized datasets; deterministic given the caller's seeded generator.

pub fn exponential(rng: &mut SmallRng, size: usize) -> Dataset {
    let distribution = Exp::new(100.0).expect("valid exponential rate");
    Dataset::new(distribution.sample_iter(rng).take(size).collect())
}

pub fn lognormal(rng: &mut SmallRng, size: usize) -> Dataset {
    let distribution = LogNormal::new(0.0, 1.0).expect("valid lognormal parameters");
    Dataset::new(distribution.sample_iter(rng).map(|value| value / 100.0).take(size).collect())
}

pub fn normal(rng: &mut SmallRng, size: usize, loc: f64, scale: f64) -> Dataset {
    let distribution = Normal::new(loc, scale).expect("valid normal parameters");
    Dataset::new(distribution.sample_iter(rng).take(size).collect())
}

fn laplace_sample(rng: &mut SmallRng, loc: f64, scale: f64) -> f64 {
    let magnitude = -(1.0 - rng.gen::<f64>()).ln() * scale;
    let signed = if rng.gen::<f64>() < 0.5 { -magnitude } else { magnitude };
    signed + loc
}

pub fn laplace(rng: &mut SmallRng, size: usize) -> Dataset {
    Dataset::new((0..size).map(|_| laplace_sample(rng, 11278.0, 100.0)).collect())
}

/// A Laplace mode at 17.3 mixed evenly with a wide normal mode at -2.
pub fn bimodal(rng: &mut SmallRng, size: usize) -> Dataset {
    let left = Normal::new(-2.0, 3.0).expect("valid normal parameters");
    let values = (0..size)
        .map(|_| {
            if rng.gen::<f64>() > 0.5 {
                laplace_sample(rng, 17.3, 1.0)
            } else {
                left.sample(rng)
            }
        })
        .collect();
    Dataset::new(values)
}

/// Laplace, normal, and exponential modes in equal proportion.
pub fn trimodal(rng: &mut SmallRng, size: usize) -> Dataset {
    let normal = Normal::new(5.0, 1.0).expect("valid normal parameters");
    let exponential = Exp::new(0.01).expect("valid exponential rate");
    let values = (0..size)
        .map(|_| {
            let selector = rng.gen::<f64>();
            if selector > 2.0 / 3.0 {
                laplace_sample(rng, 17.3, 1.0)
            } else if selector > 1.0 / 3.0 {
                normal.sample(rng)
            } else {
                exponential.sample(rng)
            }
        })
        .collect();
    Dataset::new(values)
}

/// A narrow lognormal bulk with a distant normal mode for the tail.
pub fn mixed(rng: &mut SmallRng, size: usize) -> Dataset {
    let bulk = LogNormal::new(0.0, 0.25).expect("valid lognormal parameters");
    let tail = Normal::new(10.0, 0.5).expect("valid normal parameters");
    let values = (0..size)
        .map(|_| {
            if rng.gen::<f64>() < 0.9 {
                0.1 * bulk.sample(rng)
            } else {
                tail.sample(rng)
            }
        })
        .collect();
    Dataset::new(values)
}

/// Integer-truncated normal samples; includes negatives and zeros.
pub fn integers(rng: &mut SmallRng, size: usize) -> Dataset {
    let distribution = Normal::new(4.3, 5.0).expect("valid normal parameters");
    Dataset::new(
        distribution
            .sample_iter(rng)
            .map(|value| (value as i64) as f64)
            .take(size)
            .collect(),
    )
}

/// Every dataset shape used by the end-to-end accuracy tests.
pub fn dataset_catalog(rng: &mut SmallRng, size: usize) -> Vec<(&'static str, Dataset)> {
    vec![
        ("uniform_forward", uniform_forward(size)),
        ("uniform_backward", uniform_backward(size)),
        ("uniform_zoom_in", uniform_zoom_in(size)),
        ("uniform_zoom_out", uniform_zoom_out(size)),
        ("uniform_sqrt", uniform_sqrt(size)),
        ("constant", constant(size)),
        ("negative_uniform_forward", negative_uniform_forward(size)),
        ("negative_uniform_backward", negative_uniform_backward(size)),
        ("number_line_forward", number_line_forward(size)),
        ("number_line_backward", number_line_backward(size)),
        ("exponential", exponential(rng, size)),
        ("lognormal", lognormal(rng, size)),
        ("normal", normal(rng, size, 37.4, 1.0)),
        ("laplace", laplace(rng, size)),
        ("bimodal", bimodal(rng, size)),
        ("trimodal", trimodal(rng, size)),
        ("mixed", mixed(rng, size)),
        ("integers", integers(rng, size)),
    ]
}

/// Builds a sketch over the dataset with the given constructor.
pub fn sketch_from<M, S, F>(create: F, dataset: &Dataset) -> DDSketch<M, S>
where
    M: KeyMapping,
    S: Store,
    F: Fn() -> DDSketch<M, S>,
{
    let mut sketch = create();
    for &value in dataset.values() {
        sketch.add(value);
    }
    sketch
}

pub fn assert_near(actual: f64, expected: f64, context: &str) {
    let tolerance = 1e-6 + 1e-9 * expected.abs();
    assert!(
        (actual - expected).abs() <= tolerance,
        "{context}: expected {expected}, got {actual}"
    );
}

/// Checks every test quantile against the exact dataset quantile, plus the
/// summary statistics.
pub fn evaluate_sketch_accuracy<M, S>(
    sketch: &DDSketch<M, S>,
    dataset: &Dataset,
    eps: f64,
    name: &str,
) where
    M: KeyMapping,
    S: Store,
{
    for &quantile in TEST_QUANTILES {
        let sketch_q = sketch.quantile(quantile);
        let data_q = dataset.quantile(quantile);
        let err = (sketch_q - data_q).abs();

        assert!(
            err - eps * data_q.abs() <= 1.0e-15,
            "{name}: quantile {quantile}: sketch {sketch_q}, exact {data_q}"
        );
    }

    assert_eq!(sketch.num_values(), dataset.len() as f64, "{name}: count");
    assert_near(sketch.sum(), dataset.sum(), name);
    assert_near(sketch.avg(), dataset.avg(), name);
}

/// The quantile summary used to detect mutation of a merge argument.
pub fn quantile_summary<M, S>(sketch: &DDSketch<M, S>) -> Vec<f64>
where
    M: KeyMapping,
    S: Store,
{
    let mut summary: Vec<f64> = TEST_QUANTILES.iter().map(|&q| sketch.quantile(q)).collect();
    summary.push(sketch.sum());
    summary.push(sketch.avg());
    summary.push(sketch.num_values());
    summary
}
