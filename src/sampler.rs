// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seed samplers.  Each worker owns one sampler outright, including
//! its random number generator, so workers never share mutable state.

use std::iter::StepBy;
use std::ops::Range;

use itertools::{iproduct, Product};
use num::Complex;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{RenderConfig, SampleRegion, SamplingMode};
use crate::evaluate::ComplexPoint;

/// Draws a fixed number of seeds uniformly at random from a region,
/// each axis independently.
#[derive(Clone, Debug)]
pub struct RandomSampler {
    re: Uniform<f64>,
    im: Uniform<f64>,
    rng: StdRng,
    remaining: u64,
}

impl RandomSampler {
    /// A sampler that yields `count` seeds from `region` using `rng`.
    pub fn new(region: &SampleRegion, rng: StdRng, count: u64) -> Self {
        RandomSampler {
            re: Uniform::new(region.min.re, region.max.re),
            im: Uniform::new(region.min.im, region.max.im),
            rng,
            remaining: count,
        }
    }

    /// Draw one point, regardless of the remaining budget.
    pub fn sample(&mut self) -> ComplexPoint {
        Complex::new(self.re.sample(&mut self.rng), self.im.sample(&mut self.rng))
    }
}

impl Iterator for RandomSampler {
    type Item = ComplexPoint;

    fn next(&mut self) -> Option<ComplexPoint> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.sample())
    }
}

/// Scans a `side` x `side` lattice over a region.  A sampler handles
/// every `stride`th row of the lattice starting at `first`, so that a
/// group of samplers covers the lattice exactly once between them.
#[derive(Clone, Debug)]
pub struct GridSampler {
    cells: Product<StepBy<Range<u64>>, Range<u64>>,
    origin: ComplexPoint,
    step: (f64, f64),
}

impl GridSampler {
    /// Rows `first`, `first + stride`, ... of a `side`-square lattice.
    pub fn new(region: &SampleRegion, side: u64, first: u64, stride: usize) -> Self {
        let side = side.max(1);
        GridSampler {
            cells: iproduct!((first..side).step_by(stride.max(1)), 0..side),
            origin: region.min,
            step: (region.width() / (side as f64), region.height() / (side as f64)),
        }
    }

    /// The lattice side that spends at most `samples` seeds.
    pub fn side_for(samples: u64) -> u64 {
        let mut side = (samples as f64).sqrt() as u64;
        while side > 0 && side.saturating_mul(side) > samples {
            side -= 1;
        }
        while (side + 1).saturating_mul(side + 1) <= samples {
            side += 1;
        }
        side.max(1)
    }
}

impl Iterator for GridSampler {
    type Item = ComplexPoint;

    fn next(&mut self) -> Option<ComplexPoint> {
        self.cells.next().map(|(row, column)| {
            Complex::new(
                self.origin.re + (column as f64) * self.step.0,
                self.origin.im + (row as f64) * self.step.1,
            )
        })
    }
}

/// One worker's supply of seeds.
#[derive(Clone, Debug)]
pub enum SeedSource {
    /// Random seeds.
    Random(RandomSampler),
    /// Lattice seeds.
    Grid(GridSampler),
}

impl Iterator for SeedSource {
    type Item = ComplexPoint;

    fn next(&mut self) -> Option<ComplexPoint> {
        match self {
            SeedSource::Random(sampler) => sampler.next(),
            SeedSource::Grid(sampler) => sampler.next(),
        }
    }
}

/// Worker `worker`'s share of `total`, spreading the remainder over
/// the first workers.
pub fn share(total: u64, workers: usize, worker: usize) -> u64 {
    let workers = workers as u64;
    let worker = worker as u64;
    total / workers + if worker < total % workers { 1 } else { 0 }
}

/// One seed source per configured worker.  Random generators are
/// seeded from `config.seed + worker` when a seed is configured, and
/// from the operating system otherwise.
pub fn seed_sources(config: &RenderConfig) -> Vec<SeedSource> {
    let side = GridSampler::side_for(config.samples);
    (0..config.workers)
        .map(|worker| match config.sampling {
            SamplingMode::Random => {
                let rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
                    None => StdRng::from_entropy(),
                };
                SeedSource::Random(RandomSampler::new(
                    &config.region,
                    rng,
                    share(config.samples, config.workers, worker),
                ))
            }
            SamplingMode::Grid => {
                SeedSource::Grid(GridSampler::new(&config.region, side, worker as u64, config.workers))
            }
        })
        .collect()
}
